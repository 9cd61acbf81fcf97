//! The mutable name-to-value mapping all consumers read and write.
//!
//! # Role
//!
//! One namespace per environment instance, exclusively owned by it. Besides
//! the main mapping the namespace owns the two reserved sub-mappings of the
//! restricted surface: the set of names a sandboxed evaluator may reach,
//! and the per-name transform overrides that shadow full implementations
//! there.
//!
//! The restricted surface is a read-time projection, not a copy: a mirrored
//! name resolves through the main mapping on every access, so a dispatch
//! table merged after exposure is observed by every holder of the surface.

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use crate::error::KernelError;
use crate::lazy::LazyCell;
use crate::value::Value;

use std::sync::Arc;

/// Top-level names reserved for internal subsystems, never mirrored to the
/// restricted surface.
pub const RESTRICTED_DENYLIST: &[&str] = &["expression", "typed", "docs", "error", "json", "chain"];

/// One namespace entry: either a ready value or a deferred installation.
#[derive(Clone, Debug)]
pub enum Binding {
	Ready(Value),
	Lazy(Arc<LazyCell>),
}

#[derive(Default)]
pub struct Namespace {
	entries: RwLock<IndexMap<Box<str>, Binding>>,
	exposed: RwLock<IndexSet<Box<str>>>,
	transforms: RwLock<IndexMap<Box<str>, Value>>,
}

impl Namespace {
	pub fn new() -> Self {
		Self::default()
	}

	/// Looks up a name, forcing a deferred installation on first access.
	pub fn get(&self, name: &str) -> Result<Option<Value>, KernelError> {
		// Clone the binding out so the entries lock is not held while a
		// lazy cell resolves (resolution may recurse into this namespace).
		let binding = self.entries.read().get(name).cloned();
		match binding {
			None => Ok(None),
			Some(Binding::Ready(value)) => Ok(Some(value)),
			Some(Binding::Lazy(cell)) => cell.force().map(Some),
		}
	}

	/// The raw binding, without forcing.
	pub fn binding(&self, name: &str) -> Option<Binding> {
		self.entries.read().get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.read().contains_key(name)
	}

	pub fn set_ready(&self, name: impl Into<Box<str>>, value: Value) {
		self.entries.write().insert(name.into(), Binding::Ready(value));
	}

	pub fn set_lazy(&self, name: impl Into<Box<str>>, cell: Arc<LazyCell>) {
		self.entries.write().insert(name.into(), Binding::Lazy(cell));
	}

	/// Removes a name everywhere: main mapping, restricted exposure, and
	/// transform override.
	pub fn remove(&self, name: &str) -> bool {
		self.exposed.write().shift_remove(name);
		self.transforms.write().shift_remove(name);
		self.entries.write().shift_remove(name).is_some()
	}

	pub fn names(&self) -> Vec<Box<str>> {
		self.entries.read().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Whether a name may appear on the restricted surface: top-level
	/// (no placement path) and not reserved for internal subsystems.
	pub fn surface_allowed(name: &str) -> bool {
		!name.contains('.') && !RESTRICTED_DENYLIST.contains(&name)
	}

	pub fn expose(&self, name: impl Into<Box<str>>) {
		self.exposed.write().insert(name.into());
	}

	pub fn hide(&self, name: &str) {
		self.exposed.write().shift_remove(name);
	}

	pub fn is_exposed(&self, name: &str) -> bool {
		self.exposed.read().contains(name)
	}

	pub fn exposed_names(&self) -> Vec<Box<str>> {
		self.exposed.read().iter().cloned().collect()
	}

	pub fn set_transform(&self, name: impl Into<Box<str>>, value: Value) {
		self.transforms.write().insert(name.into(), value);
	}

	pub fn remove_transform(&self, name: &str) {
		self.transforms.write().shift_remove(name);
	}

	pub fn transform(&self, name: &str) -> Option<Value> {
		self.transforms.read().get(name).cloned()
	}

	/// Resolves a name as the restricted surface sees it: unreachable
	/// unless exposed, transform override first, then the live namespace
	/// entry.
	pub fn restricted_get(&self, name: &str) -> Result<Option<Value>, KernelError> {
		if !self.is_exposed(name) {
			return Ok(None);
		}
		if let Some(transform) = self.transform(name) {
			return Ok(Some(transform));
		}
		self.get(name)
	}
}

impl std::fmt::Debug for Namespace {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Namespace")
			.field("names", &self.names())
			.field("exposed", &self.exposed_names())
			.finish_non_exhaustive()
	}
}
