//! Directed, declaration-ordered type conversions.
//!
//! # Role
//!
//! The conversion graph is the second half of the matching data model:
//! when no signature accepts an argument's classified type directly, the
//! dispatcher looks for a declared edge from that type to one the
//! signature does accept. Lookup is single-hop — each declared edge is
//! used as-is and never chained — so a bidirectional pair of edges (list
//! to matrix and back) can never oscillate.
//!
//! Declaration order is retained and drives tie-breaking in dispatch:
//! earlier edges are preferred. Re-declaring an existing `(from, to)` pair
//! overwrites the former edge, matching the declaration-order override
//! semantics used throughout the kernel.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;

use crate::error::TypedError;

/// A pure conversion body. Failures report the cause only; the graph
/// attaches the `from`/`to` pair when surfacing them.
pub type ConvertFn<V> = Arc<dyn Fn(&V) -> Result<V, String> + Send + Sync>;

/// A declared coercion between two named types.
#[derive(Clone)]
pub struct ConversionEdge<V> {
	from: Box<str>,
	to: Box<str>,
	convert: ConvertFn<V>,
	may_fail: bool,
	/// Declaration ordinal; later declarations get larger ordinals even
	/// when they overwrite an existing pair.
	order: usize,
}

impl<V> ConversionEdge<V> {
	pub fn new(
		from: impl Into<Box<str>>,
		to: impl Into<Box<str>>,
		convert: impl Fn(&V) -> Result<V, String> + Send + Sync + 'static,
	) -> Self {
		Self {
			from: from.into(),
			to: to.into(),
			convert: Arc::new(convert),
			may_fail: false,
			order: 0,
		}
	}

	/// Marks the conversion as able to reject values at runtime (loss of
	/// precision, unparsable input, …).
	pub fn fallible(mut self) -> Self {
		self.may_fail = true;
		self
	}

	pub fn from_type(&self) -> &str {
		&self.from
	}

	pub fn to_type(&self) -> &str {
		&self.to
	}

	pub fn may_fail(&self) -> bool {
		self.may_fail
	}

	pub(crate) fn order(&self) -> usize {
		self.order
	}

	/// Runs the conversion, wrapping any failure as a typed error.
	pub fn apply(&self, value: &V) -> Result<V, TypedError> {
		(self.convert)(value).map_err(|cause| TypedError::Conversion {
			from: self.from.clone(),
			to: self.to.clone(),
			cause: cause.into(),
		})
	}
}

impl<V> fmt::Debug for ConversionEdge<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} -> {}", self.from, self.to)
	}
}

/// All declared conversion edges, indexed by `(from, to)` pair.
#[derive(Default)]
pub struct ConversionGraph<V> {
	edges: Vec<ConversionEdge<V>>,
	by_pair: HashMap<(Box<str>, Box<str>), usize>,
	next_order: usize,
}

impl<V> ConversionGraph<V> {
	pub fn new() -> Self {
		Self {
			edges: Vec::new(),
			by_pair: HashMap::default(),
			next_order: 0,
		}
	}

	/// Adds a directed edge. An existing edge for the same `(from, to)`
	/// pair is overwritten; the replacement counts as a later declaration.
	pub fn register(&mut self, mut edge: ConversionEdge<V>) {
		edge.order = self.next_order;
		self.next_order += 1;

		let pair = (edge.from.clone(), edge.to.clone());
		match self.by_pair.get(&pair) {
			Some(&slot) => self.edges[slot] = edge,
			None => {
				self.by_pair.insert(pair, self.edges.len());
				self.edges.push(edge);
			}
		}
	}

	/// Finds a conversion route. Single-hop: either the direct edge
	/// exists or there is no route.
	pub fn path(&self, from: &str, to: &str) -> Option<&ConversionEdge<V>> {
		let slot = *self.by_pair.get(&(Box::from(from), Box::from(to)))?;
		Some(&self.edges[slot])
	}

	/// Runs a sequence of edges over a value, failing on the first edge
	/// that rejects it.
	pub fn apply(&self, edges: &[&ConversionEdge<V>], value: &V) -> Result<V, TypedError>
	where
		V: Clone,
	{
		let mut current = value.clone();
		for edge in edges {
			current = edge.apply(&current)?;
		}
		Ok(current)
	}

	/// Iterates edges departing from the given type, in declaration order.
	pub fn edges_from<'a>(&'a self, from: &'a str) -> impl Iterator<Item = &'a ConversionEdge<V>> {
		self.edges.iter().filter(move |e| &*e.from == from)
	}

	pub fn len(&self) -> usize {
		self.edges.len()
	}

	pub fn is_empty(&self) -> bool {
		self.edges.is_empty()
	}
}

impl<V> fmt::Debug for ConversionGraph<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.edges.iter()).finish()
	}
}
