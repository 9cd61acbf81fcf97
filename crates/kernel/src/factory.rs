//! Factories: named creation recipes with declared dependencies.
//!
//! A factory is the unit of installation. It declares a name, an optional
//! dotted placement path, the names it depends on, and a creation body
//! invoked at most once per environment with the resolved dependencies.
//! Two escape hatches exist and must be requested explicitly: the
//! dependency name [`NAMESPACE_DEPENDENCY`] grants the body read access to
//! the whole namespace, and [`CONFIG_DEPENDENCY`] is always satisfiable
//! because the current configuration travels with every resolution.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use numen_typed::{ConversionGraph, DispatchTable, Implementation, TypeRegistry};

use crate::config::Config;
use crate::error::KernelError;
use crate::namespace::Namespace;
use crate::value::{NativeFn, Value};

/// Dependency name granting read access to the full namespace. The only
/// escape from declared-dependency discipline; for units that must
/// cross-reference sibling operations.
pub const NAMESPACE_DEPENDENCY: &str = "math";

/// Dependency name for the environment configuration, satisfied
/// intrinsically rather than by namespace lookup.
pub const CONFIG_DEPENDENCY: &str = "config";

/// The dependencies handed to a creation body.
pub struct Resolved {
	deps: IndexMap<Box<str>, Value>,
	namespace: Option<Arc<Namespace>>,
	config: Config,
	requested_by: Box<str>,
	registry: Arc<TypeRegistry<Value>>,
	graph: Arc<ConversionGraph<Value>>,
}

impl Resolved {
	pub(crate) fn new(
		deps: IndexMap<Box<str>, Value>,
		namespace: Option<Arc<Namespace>>,
		config: Config,
		requested_by: impl Into<Box<str>>,
		registry: Arc<TypeRegistry<Value>>,
		graph: Arc<ConversionGraph<Value>>,
	) -> Self {
		Self {
			deps,
			namespace,
			config,
			requested_by: requested_by.into(),
			registry,
			graph,
		}
	}

	/// A declared dependency by name.
	pub fn dep(&self, name: &str) -> Result<&Value, KernelError> {
		self.deps.get(name).ok_or_else(|| KernelError::MissingDependency {
			name: name.into(),
			requested_by: self.requested_by.clone(),
		})
	}

	/// The whole namespace; present only when [`NAMESPACE_DEPENDENCY`] was
	/// declared.
	pub fn namespace(&self) -> Option<&Arc<Namespace>> {
		self.namespace.as_ref()
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Compiles a dispatch table against the mounting environment's type
	/// registry and conversion graph, so a creation body can produce a
	/// dispatch-table value without capturing any particular environment.
	pub fn typed<S, I>(
		&self,
		name: impl Into<Box<str>>,
		signatures: I,
	) -> Result<Value, KernelError>
	where
		S: AsRef<str>,
		I: IntoIterator<Item = (S, Implementation<Value>)>,
	{
		let table = DispatchTable::compile(
			name,
			signatures,
			self.registry.clone(),
			self.graph.clone(),
		)?;
		Ok(Value::Dispatch(Arc::new(table)))
	}
}

impl fmt::Debug for Resolved {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resolved")
			.field("deps", &self.deps.keys().collect::<Vec<_>>())
			.field("namespace", &self.namespace.is_some())
			.field("requested_by", &self.requested_by)
			.finish_non_exhaustive()
	}
}

/// A creation body.
pub type CreateFn = Arc<dyn Fn(&Resolved) -> Result<Value, KernelError> + Send + Sync>;

/// A named, immutable creation recipe awaiting installation.
#[derive(Clone)]
pub struct Factory {
	name: Box<str>,
	path: Option<Box<str>>,
	dependencies: Vec<Box<str>>,
	create: CreateFn,
	lazy: bool,
	recreate_on_config_change: bool,
	transform: Option<NativeFn>,
}

impl Factory {
	pub fn new<D, N>(
		name: impl Into<Box<str>>,
		dependencies: D,
		create: impl Fn(&Resolved) -> Result<Value, KernelError> + Send + Sync + 'static,
	) -> Self
	where
		D: IntoIterator<Item = N>,
		N: Into<Box<str>>,
	{
		Self {
			name: name.into(),
			path: None,
			dependencies: dependencies.into_iter().map(Into::into).collect(),
			create: Arc::new(create),
			lazy: true,
			recreate_on_config_change: false,
			transform: None,
		}
	}

	/// Rebinds the factory under a different name, keeping everything else.
	pub fn with_name(mut self, name: impl Into<Box<str>>) -> Self {
		self.name = name.into();
		self
	}

	/// Places the produced value under a dotted namespace path.
	pub fn with_path(mut self, path: impl Into<Box<str>>) -> Self {
		self.path = Some(path.into());
		self
	}

	/// Computes the value at installation time instead of on first access.
	pub fn eager(mut self) -> Self {
		self.lazy = false;
		self
	}

	/// Marks the factory for automatic reinstallation when the
	/// configuration changes.
	pub fn recreate_on_config_change(mut self) -> Self {
		self.recreate_on_config_change = true;
		self
	}

	/// Declares an alternate body exposed to the restricted surface in
	/// place of the full implementation.
	pub fn with_transform(
		mut self,
		f: impl Fn(&[Value]) -> Result<Value, crate::BoxError> + Send + Sync + 'static,
	) -> Self {
		self.transform = Some(Arc::new(f));
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn path(&self) -> Option<&str> {
		self.path.as_deref()
	}

	pub fn dependencies(&self) -> &[Box<str>] {
		&self.dependencies
	}

	pub fn is_lazy(&self) -> bool {
		self.lazy
	}

	pub fn is_config_sensitive(&self) -> bool {
		self.recreate_on_config_change
	}

	pub fn transform(&self) -> Option<&NativeFn> {
		self.transform.as_ref()
	}

	pub(crate) fn instantiate(&self, resolved: &Resolved) -> Result<Value, KernelError> {
		(self.create)(resolved)
	}
}

impl fmt::Debug for Factory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Factory")
			.field("name", &self.name)
			.field("path", &self.path)
			.field("dependencies", &self.dependencies)
			.field("lazy", &self.lazy)
			.field("recreate_on_config_change", &self.recreate_on_config_change)
			.finish_non_exhaustive()
	}
}

/// The full installation key: `path.name` when a path is declared.
pub(crate) fn full_name(path: Option<&str>, name: &str) -> Box<str> {
	match path {
		Some(path) => format!("{path}.{name}").into(),
		None => name.into(),
	}
}
