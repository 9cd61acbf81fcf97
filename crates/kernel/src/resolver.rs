//! Factory resolution: dependency lookup, instance caching, and cycle
//! detection.
//!
//! # Role
//!
//! Turns a [`Factory`] into a value exactly once per environment. The
//! instance cache is keyed by factory identity, so two factories that
//! merely share a name are distinct cache entries, while the same factory
//! reached through two dependency chains yields one shared instance.
//!
//! # Invariants
//!
//! - A factory's `create` runs at most once per environment unless its
//!   instance was evicted (configuration rebuild, failed chain).
//! - A dependency cycle fails with the full chain and leaves none of the
//!   participating names installed.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::KernelError;
use crate::factory::{CONFIG_DEPENDENCY, Factory, NAMESPACE_DEPENDENCY, Resolved, full_name};
use crate::value::Value;

use crate::env::Env;

impl Env {
	/// Produces the value for `factory`, resolving its dependencies first.
	///
	/// Cached per factory identity: repeated loads of the same factory
	/// return clones of one instance.
	pub(crate) fn load_factory(&self, factory: &Arc<Factory>) -> Result<Value, KernelError> {
		let key = Arc::as_ptr(factory) as *const () as usize;
		if let Some(existing) = self.inner().instances.lock().get(&key) {
			return Ok(existing.clone());
		}

		// Resolution is tracked by the full installation key, so a pathed
		// factory's binding is evicted under the name it was installed as,
		// and factories sharing a base name under different paths are
		// distinct resolution frames.
		let frame = full_name(factory.path(), factory.name());
		{
			let mut resolving = self.inner().resolving.lock();
			if let Some(first) = resolving.iter().position(|n| *n == frame) {
				let mut chain: Vec<String> =
					resolving[first..].iter().map(|n| n.to_string()).collect();
				chain.push(frame.to_string());
				drop(resolving);
				self.evict_chain(&chain);
				return Err(KernelError::CyclicDependency { chain });
			}
			resolving.push(frame);
		}

		let produced = self.instantiate(factory);
		self.inner().resolving.lock().pop();

		let value = produced?;
		self.inner().instances.lock().insert(key, value.clone());
		Ok(value)
	}

	fn instantiate(&self, factory: &Arc<Factory>) -> Result<Value, KernelError> {
		tracing::trace!(name = factory.name(), "instantiating factory");
		let mut deps = IndexMap::new();
		let mut namespace = None;
		for dependency in factory.dependencies() {
			match dependency.as_ref() {
				NAMESPACE_DEPENDENCY => {
					namespace = Some(self.namespace_arc());
				}
				// Satisfied intrinsically: every factory sees the live
				// configuration through its resolution context.
				CONFIG_DEPENDENCY => {}
				name => {
					let value = self.namespace().get(name)?.ok_or_else(|| {
						KernelError::MissingDependency {
							name: name.into(),
							requested_by: factory.name().into(),
						}
					})?;
					deps.insert(dependency.clone(), value);
				}
			}
		}
		let resolved = Resolved::new(
			deps,
			namespace,
			self.config(),
			factory.name(),
			self.inner().registry.clone(),
			self.inner().graph.clone(),
		);
		factory.instantiate(&resolved)
	}

	fn namespace_arc(&self) -> Arc<crate::namespace::Namespace> {
		self.inner().namespace.clone()
	}

	/// Removes every trace of the named factories after a failed chain, so
	/// a later install can retry cleanly.
	fn evict_chain(&self, chain: &[String]) {
		let mut factories = self.inner().factories.lock();
		let mut instances = self.inner().instances.lock();
		for name in chain {
			self.namespace().remove(name);
			if let Some(tracked) = factories.shift_remove(name.as_str()) {
				let key = Arc::as_ptr(&tracked.factory) as *const () as usize;
				instances.remove(&key);
			}
		}
	}
}
