//! The environment instance: one namespace, one configuration, one event
//! channel, one instance cache.
//!
//! # Role
//!
//! [`Env`] wires the pieces together the way an embedder sees them:
//! build an environment (seeding the default type universe and coercions,
//! plus whatever domain types the embedder registers), install factories
//! and values, call what lands in the namespace, reconfigure and let
//! configuration-sensitive operations rebuild themselves.
//!
//! # Invariants
//!
//! - The namespace and instance cache are exclusively owned by one
//!   environment instance; instances never share mutable state.
//! - Installation calls are serialized per environment; later-declared
//!   signatures are deterministically "later" for override purposes.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use rustc_hash::FxHashMap;

use numen_typed::{
	ConversionEdge, ConversionGraph, DispatchTable, Implementation, TypeDescriptor, TypeRegistry,
};

use crate::config::{Config, ConfigUpdate};
use crate::error::KernelError;
use crate::events::{Channel, Event, Subscription};
use crate::factory::Factory;
use crate::namespace::Namespace;
use crate::value::Value;

/// A factory tracked for configuration-driven reinstallation, keyed by
/// the full name it was installed under.
pub(crate) struct TrackedFactory {
	pub(crate) factory: Arc<Factory>,
}

pub(crate) struct EnvInner {
	pub(crate) namespace: Arc<Namespace>,
	pub(crate) channel: Channel,
	pub(crate) config: RwLock<Config>,
	pub(crate) registry: Arc<TypeRegistry<Value>>,
	pub(crate) graph: Arc<ConversionGraph<Value>>,
	/// Instance cache: factory identity -> produced value.
	pub(crate) instances: Mutex<FxHashMap<usize, Value>>,
	/// Names currently being resolved, innermost last.
	pub(crate) resolving: Mutex<Vec<Box<str>>>,
	/// Installed factories, by full installation key.
	pub(crate) factories: Mutex<IndexMap<Box<str>, TrackedFactory>>,
	/// Serializes installation batches. Reentrant: an event listener may
	/// install from inside an installation-triggered notification.
	pub(crate) install_guard: ReentrantMutex<()>,
}

/// One environment instance.
#[derive(Clone)]
pub struct Env {
	inner: Arc<EnvInner>,
}

impl Env {
	/// An environment with the default configuration, type universe, and
	/// coercions.
	pub fn new() -> Self {
		EnvBuilder::new()
			.build()
			.unwrap_or_else(|_| unreachable!("default environment is well-formed"))
	}

	pub fn builder() -> EnvBuilder {
		EnvBuilder::new()
	}

	pub(crate) fn from_inner(inner: Arc<EnvInner>) -> Self {
		Self { inner }
	}

	pub(crate) fn inner(&self) -> &EnvInner {
		&self.inner
	}

	pub(crate) fn downgrade(&self) -> std::sync::Weak<EnvInner> {
		Arc::downgrade(&self.inner)
	}

	pub fn namespace(&self) -> &Namespace {
		&self.inner.namespace
	}

	/// Looks up a name in the namespace, forcing a deferred installation.
	pub fn get(&self, name: &str) -> Result<Option<Value>, KernelError> {
		self.inner.namespace.get(name)
	}

	/// The Resolution API: resolves each name in order, failing on the
	/// first one that is not available.
	pub fn resolve(&self, names: &[&str]) -> Result<Vec<Value>, KernelError> {
		names
			.iter()
			.map(|name| {
				self.get(name)?.ok_or_else(|| KernelError::MissingDependency {
					name: (*name).into(),
					requested_by: "resolve".into(),
				})
			})
			.collect()
	}

	pub fn config(&self) -> Config {
		self.inner.config.read().clone()
	}

	/// Applies a partial configuration update.
	///
	/// Returns the previous configuration. When the update changes
	/// nothing, no event fires and nothing is rebuilt; otherwise
	/// `Event::Config` is emitted and every configuration-sensitive
	/// factory is reinstalled with `override: true`.
	pub fn configure(&self, update: &ConfigUpdate) -> Result<Config, KernelError> {
		let previous = {
			let mut config = self.inner.config.write();
			let next = config.apply(update);
			if next == *config {
				return Ok(config.clone());
			}
			let previous = config.clone();
			*config = next;
			previous
		};

		tracing::debug!("configuration changed; rebuilding sensitive factories");
		self.inner.channel.emit(&Event::Config {
			config: self.config(),
		});
		self.rebuild_config_sensitive()?;
		Ok(previous)
	}

	pub fn subscribe(&self, listener: impl Fn(&Event) + Send + Sync + 'static) -> Subscription {
		self.inner.channel.subscribe(listener)
	}

	pub fn unsubscribe(&self, subscription: Subscription) -> bool {
		self.inner.channel.unsubscribe(subscription)
	}

	pub fn types(&self) -> &Arc<TypeRegistry<Value>> {
		&self.inner.registry
	}

	pub fn conversions(&self) -> &Arc<ConversionGraph<Value>> {
		&self.inner.graph
	}

	/// The dispatch-construction API: compiles a signature map against
	/// this environment's type registry and conversion graph.
	pub fn typed<S, I>(&self, name: impl Into<Box<str>>, signatures: I) -> Result<Value, KernelError>
	where
		S: AsRef<str>,
		I: IntoIterator<Item = (S, Implementation<Value>)>,
	{
		let table = DispatchTable::compile(
			name,
			signatures,
			self.inner.registry.clone(),
			self.inner.graph.clone(),
		)?;
		Ok(Value::Dispatch(Arc::new(table)))
	}

	/// The read-only projection safe for a sandboxed evaluator.
	pub fn restricted(&self) -> RestrictedSurface<'_> {
		RestrictedSurface { env: self }
	}
}

impl Default for Env {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Env {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Env")
			.field("namespace", &self.inner.namespace)
			.field("config", &*self.inner.config.read())
			.finish_non_exhaustive()
	}
}

/// Read-only view of the namespace subset reachable from a sandboxed
/// evaluator, with its parallel transform overrides applied.
pub struct RestrictedSurface<'e> {
	env: &'e Env,
}

impl RestrictedSurface<'_> {
	pub fn get(&self, name: &str) -> Result<Option<Value>, KernelError> {
		self.env.inner.namespace.restricted_get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.env.inner.namespace.is_exposed(name)
	}

	pub fn names(&self) -> Vec<Box<str>> {
		self.env.inner.namespace.exposed_names()
	}
}

/// Builder for an environment instance.
///
/// Embedder-registered types slot between the default primitives and the
/// trailing catch-all, so a narrow domain type can never be shadowed by
/// `object`.
pub struct EnvBuilder {
	config: Config,
	types: Vec<TypeDescriptor<Value>>,
	conversions: Vec<ConversionEdge<Value>>,
	defaults: bool,
}

impl EnvBuilder {
	fn new() -> Self {
		Self {
			config: Config::default(),
			types: Vec::new(),
			conversions: Vec::new(),
			defaults: true,
		}
	}

	/// Skips the default type universe and coercions entirely.
	pub fn without_defaults(mut self) -> Self {
		self.defaults = false;
		self
	}

	pub fn config(mut self, config: Config) -> Self {
		self.config = config;
		self
	}

	/// Registers a domain type descriptor.
	pub fn type_descriptor(mut self, descriptor: TypeDescriptor<Value>) -> Self {
		self.types.push(descriptor);
		self
	}

	/// Registers a domain conversion edge.
	pub fn conversion(mut self, edge: ConversionEdge<Value>) -> Self {
		self.conversions.push(edge);
		self
	}

	pub fn build(self) -> Result<Env, KernelError> {
		let mut registry = TypeRegistry::new();
		if self.defaults {
			for descriptor in default_types() {
				registry.register(descriptor)?;
			}
		}
		for descriptor in self.types {
			registry.register(descriptor)?;
		}
		if self.defaults {
			// Catch-all last so it cannot shadow anything.
			registry.register(TypeDescriptor::new("object", |_: &Value| true))?;
		}

		let mut graph = ConversionGraph::new();
		if self.defaults {
			for edge in default_conversions() {
				graph.register(edge);
			}
		}
		for edge in self.conversions {
			graph.register(edge);
		}

		Ok(Env {
			inner: Arc::new(EnvInner {
				namespace: Arc::new(Namespace::new()),
				channel: Channel::new(),
				config: RwLock::new(self.config),
				registry: Arc::new(registry),
				graph: Arc::new(graph),
				instances: Mutex::new(FxHashMap::default()),
				resolving: Mutex::new(Vec::new()),
				factories: Mutex::new(IndexMap::new()),
				install_guard: ReentrantMutex::new(()),
			})
		})
	}
}

/// The kernel's own value types, commonest first. Domain types are opaque
/// payloads registered by embedders.
fn default_types() -> Vec<TypeDescriptor<Value>> {
	vec![
		TypeDescriptor::new("number", |v: &Value| matches!(v, Value::Number(_))),
		TypeDescriptor::new("boolean", |v: &Value| matches!(v, Value::Bool(_))),
		TypeDescriptor::new("string", |v: &Value| matches!(v, Value::Str(_))),
		TypeDescriptor::new("list", |v: &Value| matches!(v, Value::List(_))),
		TypeDescriptor::new("function", |v: &Value| {
			matches!(v, Value::Function(_) | Value::Dispatch(_))
		}),
		TypeDescriptor::new("null", |v: &Value| matches!(v, Value::Null)),
	]
}

/// Default safe coercions between the kernel's own types.
fn default_conversions() -> Vec<ConversionEdge<Value>> {
	vec![
		ConversionEdge::new("boolean", "number", |v: &Value| match v {
			Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
			_ => Err("not a boolean".into()),
		}),
		ConversionEdge::new("boolean", "string", |v: &Value| match v {
			Value::Bool(b) => Ok(Value::str(b.to_string())),
			_ => Err("not a boolean".into()),
		}),
		ConversionEdge::new("number", "string", |v: &Value| match v {
			Value::Number(n) => Ok(Value::str(format_number(*n))),
			_ => Err("not a number".into()),
		}),
		ConversionEdge::new("string", "number", |v: &Value| match v {
			Value::Str(s) => s
				.parse::<f64>()
				.map(Value::Number)
				.map_err(|_| format!("cannot convert \"{s}\" to a number")),
			_ => Err("not a string".into()),
		})
		.fallible(),
	]
}

/// Formats a float the way users wrote it: integral values lose the
/// trailing `.0`.
fn format_number(n: f64) -> String {
	if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
		format!("{}", n as i64)
	} else {
		format!("{n}")
	}
}
