//! Installation of factories and plain values into an environment.
//!
//! # Role
//!
//! The write side of the namespace. Installation resolves name conflicts
//! (merge, override, skip, or fail), defers factory instantiation behind
//! lazy bindings, maintains the restricted surface, and notifies
//! subscribers after each name lands.
//!
//! # Invariants
//!
//! - A batch is serialized against other batches on the same environment.
//! - Two dispatch tables under one name merge into one table; any other
//!   conflict requires `override` or `silent`.
//! - Lazy bindings hold only a weak environment handle, so an environment
//!   is never kept alive by its own namespace.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::env::{Env, TrackedFactory};
use crate::error::KernelError;
use crate::events::Event;
use crate::factory::{Factory, full_name};
use crate::lazy::LazyCell;
use crate::namespace::Namespace;
use crate::value::{NativeFn, Value};

/// One item of an installation batch.
///
/// Batches nest: a mapping names its entries, a sequence concatenates
/// them, and both recurse. A [`Import::Bare`] value is only installable
/// through a mapping, which supplies its name.
#[derive(Clone)]
pub enum Import {
	/// A factory, instantiated on first access (or eagerly when marked so).
	Factory(Arc<Factory>),
	/// A ready value bound under a name.
	Value { name: Box<str>, value: Value },
	/// A value without a name; legal only inside a mapping.
	Bare(Value),
	/// A named mapping. The key is the installed name for values and
	/// factories alike; nested collections keep their own keys.
	Map(IndexMap<Box<str>, Import>),
	/// A sequence of any of the above.
	Seq(Vec<Import>),
}

impl Import {
	pub fn factory(factory: Factory) -> Self {
		Self::Factory(Arc::new(factory))
	}

	pub fn value(name: impl Into<Box<str>>, value: impl Into<Value>) -> Self {
		Self::Value {
			name: name.into(),
			value: value.into(),
		}
	}
}

impl From<Factory> for Import {
	fn from(factory: Factory) -> Self {
		Self::factory(factory)
	}
}

impl From<Value> for Import {
	fn from(value: Value) -> Self {
		Self::Bare(value)
	}
}

/// Conflict and coercion behavior for one installation batch.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImportOptions {
	/// Replace existing bindings instead of failing on conflict. Also
	/// permits duplicate signatures when merging dispatch tables.
	pub override_existing: bool,
	/// Skip conflicting items instead of failing. `override` wins when
	/// both are set.
	pub silent: bool,
	/// Wrap plain functions so their arguments are reduced to primitive
	/// values first.
	pub wrap: bool,
}

impl ImportOptions {
	pub fn overriding() -> Self {
		Self {
			override_existing: true,
			..Self::default()
		}
	}

	pub fn silent() -> Self {
		Self {
			silent: true,
			..Self::default()
		}
	}
}

impl Env {
	/// Installs a batch of factories and values.
	///
	/// Items are processed in order; the first hard conflict aborts the
	/// batch, leaving earlier items installed.
	pub fn install<I>(&self, imports: I, options: ImportOptions) -> Result<(), KernelError>
	where
		I: IntoIterator<Item = Import>,
	{
		let _guard = self.inner().install_guard.lock();
		for import in imports {
			self.install_item(import, options)?;
		}
		Ok(())
	}

	/// Installs one factory with default options.
	pub fn install_factory(&self, factory: Factory) -> Result<(), KernelError> {
		self.install([Import::factory(factory)], ImportOptions::default())
	}

	/// Binds one ready value with default options.
	pub fn install_value(
		&self,
		name: impl Into<Box<str>>,
		value: impl Into<Value>,
	) -> Result<(), KernelError> {
		self.install([Import::value(name, value)], ImportOptions::default())
	}

	fn install_item(&self, import: Import, options: ImportOptions) -> Result<(), KernelError> {
		match import {
			Import::Factory(factory) => self.install_factory_item(factory, options),
			Import::Value { name, value } => {
				let value = if options.wrap {
					wrap_function(self, value)
				} else {
					value
				};
				self.install_value_item(&name, value, options)
			}
			Import::Bare(_) => Err(KernelError::invalid_unit(
				"a value without a name cannot be installed; wrap it in a mapping",
			)),
			Import::Map(entries) => {
				for (key, entry) in entries {
					let named = match entry {
						Import::Bare(value) => Import::Value { name: key, value },
						Import::Value { value, .. } => Import::Value { name: key, value },
						Import::Factory(factory) => Import::Factory(Arc::new(
							factory.as_ref().clone().with_name(key),
						)),
						other => other,
					};
					self.install_item(named, options)?;
				}
				Ok(())
			}
			Import::Seq(items) => {
				for item in items {
					self.install_item(item, options)?;
				}
				Ok(())
			}
		}
	}

	fn install_factory_item(
		&self,
		factory: Arc<Factory>,
		options: ImportOptions,
	) -> Result<(), KernelError> {
		let name = full_name(factory.path(), factory.name());

		if self.namespace().contains(&name) && !options.override_existing {
			// A later-loaded factory extends an existing operation: when the
			// existing value and the factory's product are both dispatch
			// tables, they merge instead of conflicting. Deciding this needs
			// the product, so the factory is instantiated here.
			if let Some(Value::Dispatch(existing)) = self.namespace().get(&name)? {
				let produced = self.load_factory(&factory)?;
				if let Value::Dispatch(incoming) = &produced {
					let merged = existing.merge(incoming, options.override_existing)?;
					self.namespace()
						.set_ready(name.clone(), Value::Dispatch(Arc::new(merged)));
					self.inner().factories.lock().insert(
						name.clone(),
						TrackedFactory {
							factory: factory.clone(),
						},
					);
					self.finish_install(&name, factory.path(), factory.transform().cloned());
					return Ok(());
				}
			}
			if options.silent {
				tracing::debug!(name = %name, "skipping conflicting factory");
				return Ok(());
			}
			return Err(KernelError::NameConflict { name });
		}

		// An overridden factory must not keep its stale instance around.
		if let Some(previous) = self
			.inner()
			.factories
			.lock()
			.shift_remove(name.as_ref())
		{
			let key = Arc::as_ptr(&previous.factory) as *const () as usize;
			self.inner().instances.lock().remove(&key);
		}

		if factory.is_lazy() {
			let weak = self.downgrade();
			let thunk_factory = factory.clone();
			let cell = LazyCell::new(move || {
				let inner = weak.upgrade().ok_or(KernelError::EnvironmentDropped)?;
				Env::from_inner(inner).load_factory(&thunk_factory)
			});
			self.namespace().set_lazy(name.clone(), Arc::new(cell));
		} else {
			let value = self.load_factory(&factory)?;
			self.namespace().set_ready(name.clone(), value);
		}

		self.inner().factories.lock().insert(
			name.clone(),
			TrackedFactory {
				factory: factory.clone(),
			},
		);

		self.finish_install(&name, factory.path(), factory.transform().cloned());
		Ok(())
	}

	fn install_value_item(
		&self,
		name: &str,
		value: Value,
		options: ImportOptions,
	) -> Result<(), KernelError> {
		if self.namespace().contains(name) {
			// Two dispatch tables under one name merge rather than conflict;
			// duplicate signatures still need override. The existing binding
			// is forced only when the incoming value could merge with it.
			if let Value::Dispatch(incoming) = &value {
				if let Some(Value::Dispatch(existing)) = self.namespace().get(name)? {
					let merged = existing.merge(incoming, options.override_existing)?;
					self.namespace()
						.set_ready(name, Value::Dispatch(Arc::new(merged)));
					self.finish_install(name, None, None);
					return Ok(());
				}
			}
			if !options.override_existing {
				if options.silent {
					tracing::debug!(name, "skipping conflicting value");
					return Ok(());
				}
				return Err(KernelError::NameConflict { name: name.into() });
			}
		}

		self.namespace().set_ready(name, value);
		self.finish_install(name, None, None);
		Ok(())
	}

	/// Restricted-surface maintenance and notification, shared by every
	/// installation path.
	fn finish_install(&self, name: &str, path: Option<&str>, transform: Option<NativeFn>) {
		if path.is_none() && Namespace::surface_allowed(name) {
			self.namespace().expose(name);
			match transform {
				Some(transform) => {
					self.namespace()
						.set_transform(name, Value::Function(transform));
				}
				None => self.namespace().remove_transform(name),
			}
		}
		self.inner().channel.emit(&Event::Import {
			name: name.into(),
			path: path.map(Into::into),
		});
	}

	/// Reinstalls every factory that declared itself sensitive to
	/// configuration, evicting its cached instance first.
	pub(crate) fn rebuild_config_sensitive(&self) -> Result<(), KernelError> {
		let sensitive: Vec<Arc<Factory>> = {
			let factories = self.inner().factories.lock();
			factories
				.values()
				.filter(|tracked| tracked.factory.is_config_sensitive())
				.map(|tracked| tracked.factory.clone())
				.collect()
		};
		for factory in sensitive {
			{
				let key = Arc::as_ptr(&factory) as *const () as usize;
				self.inner().instances.lock().remove(&key);
			}
			self.install([Import::Factory(factory)], ImportOptions::overriding())?;
		}
		Ok(())
	}
}

/// Wraps a plain function so each argument is reduced to its primitive
/// form before the call. Dispatch tables and non-callables pass through
/// untouched.
fn wrap_function(env: &Env, value: Value) -> Value {
	let Value::Function(inner) = value else {
		return value;
	};
	let registry = env.types().clone();
	let wrapped: NativeFn = Arc::new(move |args: &[Value]| {
		let primitive: Vec<Value> = args.iter().map(|arg| registry.to_primitive(arg)).collect();
		inner(&primitive)
	});
	Value::Function(wrapped)
}
