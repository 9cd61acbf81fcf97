//! Ordered catalogue of named runtime-type predicates.
//!
//! # Role
//!
//! Classification is data, not scattered conditionals: every type the
//! engine can name is a [`TypeDescriptor`] with a predicate, and the
//! registry answers "what is this value" by probing descriptors in
//! registration order. Placing a narrow type after a broader one makes the
//! narrow type unreachable, so order is part of the public contract.

use std::fmt;
use std::sync::Arc;

use crate::error::TypedError;

/// Predicate deciding whether a value belongs to a named type.
pub type TypeTest<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Reduction of a structured value to its primitive representation.
pub type PrimitiveFn<V> = Arc<dyn Fn(&V) -> V + Send + Sync>;

/// A named runtime type.
#[derive(Clone)]
pub struct TypeDescriptor<V> {
	name: Box<str>,
	test: TypeTest<V>,
	/// Optional reduction to a primitive form (e.g. matrix to nested list),
	/// used when calling implementations unaware of structured values.
	to_primitive: Option<PrimitiveFn<V>>,
}

impl<V> TypeDescriptor<V> {
	pub fn new(
		name: impl Into<Box<str>>,
		test: impl Fn(&V) -> bool + Send + Sync + 'static,
	) -> Self {
		Self {
			name: name.into(),
			test: Arc::new(test),
			to_primitive: None,
		}
	}

	/// Declares how values of this type reduce to a primitive form.
	pub fn with_primitive(mut self, f: impl Fn(&V) -> V + Send + Sync + 'static) -> Self {
		self.to_primitive = Some(Arc::new(f));
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn matches(&self, value: &V) -> bool {
		(self.test)(value)
	}
}

impl<V> fmt::Debug for TypeDescriptor<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TypeDescriptor")
			.field("name", &self.name)
			.field("to_primitive", &self.to_primitive.is_some())
			.finish_non_exhaustive()
	}
}

/// Ordered registry of type descriptors.
///
/// Cheaply tested and common types should be registered first; callers who
/// never want [`TypedError::UnclassifiedValue`] register a catch-all
/// descriptor last.
#[derive(Default)]
pub struct TypeRegistry<V> {
	types: Vec<TypeDescriptor<V>>,
}

impl<V> TypeRegistry<V> {
	pub fn new() -> Self {
		Self { types: Vec::new() }
	}

	/// Appends a descriptor, rejecting duplicate names.
	pub fn register(&mut self, descriptor: TypeDescriptor<V>) -> Result<(), TypedError> {
		if self.contains(descriptor.name()) {
			return Err(TypedError::DuplicateType(descriptor.name().into()));
		}
		self.types.push(descriptor);
		Ok(())
	}

	/// Returns the name of the first descriptor whose predicate matches.
	pub fn classify(&self, value: &V) -> Result<&str, TypedError> {
		self.types
			.iter()
			.find(|d| d.matches(value))
			.map(|d| d.name())
			.ok_or(TypedError::UnclassifiedValue {
				count: self.types.len(),
			})
	}

	pub fn contains(&self, name: &str) -> bool {
		self.types.iter().any(|d| &*d.name == name)
	}

	pub fn len(&self) -> usize {
		self.types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor<V>> {
		self.types.iter()
	}

	/// Reduces a value to its primitive representation.
	///
	/// The value is classified and, when its descriptor declares a
	/// reduction, that reduction is applied; otherwise the value passes
	/// through unchanged. Unclassifiable values also pass through, since
	/// reduction is a best-effort interop aid.
	pub fn to_primitive(&self, value: &V) -> V
	where
		V: Clone,
	{
		match self.types.iter().find(|d| d.matches(value)) {
			Some(d) => match &d.to_primitive {
				Some(f) => f(value),
				None => value.clone(),
			},
			None => value.clone(),
		}
	}
}

impl<V> fmt::Debug for TypeRegistry<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list()
			.entries(self.types.iter().map(|d| &d.name))
			.finish()
	}
}
