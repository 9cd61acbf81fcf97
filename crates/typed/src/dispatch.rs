//! Dispatch table compilation, invocation, and merging.
//!
//! # Role
//!
//! A [`DispatchTable`] is the compiled form of one named operation: a map
//! from canonical signature strings to implementations, bound to the type
//! registry and conversion graph it was compiled against. Invocation is
//! pure routing — classify the arguments, pick a signature, apply the
//! planned conversions, call the implementation.
//!
//! # Matching
//!
//! Exact matches win outright. Otherwise every signature is scored by the
//! conversions it would need: candidates touching fewer arguments are
//! preferred, ties go to the candidate whose edges were declared earliest,
//! and a remaining tie goes to the signature registered first. Conversion
//! search is single-hop per argument; no edge chaining.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::convert::{ConversionEdge, ConversionGraph};
use crate::error::TypedError;
use crate::signature::Signature;
use crate::types::TypeRegistry;

pub use crate::error::BoxError;

/// An implementation body selected by dispatch.
pub type Implementation<V> = Arc<dyn Fn(&[V]) -> Result<V, BoxError> + Send + Sync>;

struct Entry<V> {
	signature: Signature,
	implementation: Implementation<V>,
}

impl<V> Clone for Entry<V> {
	fn clone(&self) -> Self {
		Self {
			signature: self.signature.clone(),
			implementation: self.implementation.clone(),
		}
	}
}

/// A compiled, named dispatch table.
pub struct DispatchTable<V> {
	name: Box<str>,
	registry: Arc<TypeRegistry<V>>,
	graph: Arc<ConversionGraph<V>>,
	entries: IndexMap<Box<str>, Entry<V>>,
}

impl<V: Clone> DispatchTable<V> {
	/// Compiles a signature map into a dispatch table.
	///
	/// Signatures are keyed by canonical form, so two spellings of the
	/// same signature collide as [`TypedError::DuplicateSignature`]. Every
	/// referenced type name must exist in the registry.
	pub fn compile<S, I>(
		name: impl Into<Box<str>>,
		signatures: I,
		registry: Arc<TypeRegistry<V>>,
		graph: Arc<ConversionGraph<V>>,
	) -> Result<Self, TypedError>
	where
		S: AsRef<str>,
		I: IntoIterator<Item = (S, Implementation<V>)>,
	{
		let name = name.into();
		let mut entries: IndexMap<Box<str>, Entry<V>> = IndexMap::new();

		for (raw, implementation) in signatures {
			let signature = Signature::parse(raw.as_ref())?;

			for type_name in signature.type_names() {
				if !registry.contains(type_name) {
					return Err(TypedError::InvalidSignature {
						signature: raw.as_ref().into(),
						reason: format!("unknown type '{type_name}'").into(),
					});
				}
			}

			let canonical: Box<str> = signature.canonical().into();
			if entries.contains_key(&canonical) {
				return Err(TypedError::DuplicateSignature {
					name,
					signature: canonical,
				});
			}
			entries.insert(
				canonical,
				Entry {
					signature,
					implementation,
				},
			);
		}

		Ok(Self {
			name,
			registry,
			graph,
			entries,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Canonical signature strings, in registration order.
	pub fn signatures(&self) -> Vec<&str> {
		self.entries.keys().map(|k| &**k).collect()
	}

	pub fn contains_signature(&self, canonical: &str) -> bool {
		self.entries.contains_key(canonical)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Classifies the arguments, selects a signature, applies conversions,
	/// and invokes the implementation.
	pub fn call(&self, args: &[V]) -> Result<V, TypedError> {
		let mut provided: Vec<Box<str>> = Vec::with_capacity(args.len());
		for arg in args {
			provided.push(self.registry.classify(arg)?.into());
		}

		// Exact match first: every argument's classified type is accepted
		// directly by the corresponding parameter.
		for entry in self.entries.values() {
			if !entry.signature.accepts_arity(args.len()) {
				continue;
			}
			let exact = provided.iter().enumerate().all(|(i, t)| {
				entry
					.signature
					.param_at(i)
					.is_some_and(|p| p.accepts(t))
			});
			if exact {
				return self.invoke(entry, args.to_vec());
			}
		}

		// Conversion-assisted match: score each candidate by how many
		// arguments it must convert, then by how early its edges were
		// declared, then by signature registration order.
		let mut best: Option<(usize, usize, Vec<Option<&ConversionEdge<V>>>, &Entry<V>)> = None;
		for entry in self.entries.values() {
			let Some((converted, order_sum, plan)) = self.plan(&entry.signature, &provided) else {
				continue;
			};
			let better = match &best {
				None => true,
				Some((best_converted, best_order, _, _)) => {
					(converted, order_sum) < (*best_converted, *best_order)
				}
			};
			if better {
				best = Some((converted, order_sum, plan, entry));
			}
		}

		if let Some((_, _, plan, entry)) = best {
			let mut converted_args = Vec::with_capacity(args.len());
			for (arg, step) in args.iter().zip(&plan) {
				match step {
					Some(edge) => converted_args.push(edge.apply(arg)?),
					None => converted_args.push(arg.clone()),
				}
			}
			return self.invoke(entry, converted_args);
		}

		Err(TypedError::NoMatchingSignature {
			name: self.name.clone(),
			provided,
			available: self.entries.keys().cloned().collect(),
		})
	}

	/// Plans the conversions needed for `signature` to accept arguments of
	/// the given types. Returns `(converted count, order sum, per-argument
	/// edge)` or `None` when the signature is unreachable.
	fn plan<'a>(
		&'a self,
		signature: &Signature,
		provided: &[Box<str>],
	) -> Option<(usize, usize, Vec<Option<&'a ConversionEdge<V>>>)> {
		if !signature.accepts_arity(provided.len()) {
			return None;
		}

		let mut plan = Vec::with_capacity(provided.len());
		let mut converted = 0usize;
		let mut order_sum = 0usize;

		for (i, arg_type) in provided.iter().enumerate() {
			let param = signature.param_at(i)?;
			if param.accepts(arg_type) {
				plan.push(None);
				continue;
			}

			// Earliest-declared edge into any accepted alternative.
			let edge = param
				.alternatives
				.iter()
				.filter_map(|alt| self.graph.path(arg_type, alt))
				.min_by_key(|e| e.order())?;
			converted += 1;
			order_sum += edge.order();
			plan.push(Some(edge));
		}

		Some((converted, order_sum, plan))
	}

	fn invoke(&self, entry: &Entry<V>, args: Vec<V>) -> Result<V, TypedError> {
		(entry.implementation)(&args).map_err(|cause| TypedError::Execution {
			name: self.name.clone(),
			cause,
		})
	}

	/// Merges two tables into one whose signature set is the union.
	///
	/// Signatures present in both tables are rejected unless `override_existing`
	/// is set, in which case `other`'s implementation wins. The result keeps
	/// this table's name and compilation context; `self`'s signatures keep
	/// their positions and `other`'s new ones append after them.
	pub fn merge(
		&self,
		other: &DispatchTable<V>,
		override_existing: bool,
	) -> Result<DispatchTable<V>, TypedError> {
		let mut entries = self.entries.clone();
		for (canonical, entry) in &other.entries {
			match entries.get_mut(canonical) {
				Some(slot) => {
					if !override_existing {
						return Err(TypedError::DuplicateSignature {
							name: self.name.clone(),
							signature: canonical.clone(),
						});
					}
					*slot = entry.clone();
				}
				None => {
					entries.insert(canonical.clone(), entry.clone());
				}
			}
		}

		Ok(DispatchTable {
			name: self.name.clone(),
			registry: self.registry.clone(),
			graph: self.graph.clone(),
			entries,
		})
	}

	/// Rebinds the table under a new name, keeping everything else.
	pub fn renamed(&self, name: impl Into<Box<str>>) -> DispatchTable<V> {
		DispatchTable {
			name: name.into(),
			registry: self.registry.clone(),
			graph: self.graph.clone(),
			entries: self.entries.clone(),
		}
	}
}

impl<V> fmt::Debug for DispatchTable<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DispatchTable")
			.field("name", &self.name)
			.field("signatures", &self.entries.keys().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}
