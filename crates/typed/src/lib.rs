//! Signature-keyed multiple dispatch with implicit type conversion.
//!
//! # Role
//!
//! This crate is the dispatch engine underneath the numen kernel. It knows
//! nothing about namespaces, factories, or configuration; it only answers
//! one question: given a set of signatures and a list of runtime arguments,
//! which implementation runs, and with which implicit conversions applied.
//!
//! The moving parts:
//!
//! - [`TypeRegistry`] — an ordered catalogue of named type predicates.
//!   First matching predicate wins, so registration order is part of the
//!   public contract.
//! - [`ConversionGraph`] — declared directed coercions between type names,
//!   used to bridge near-miss signatures. Lookup is single-hop by design;
//!   edges are never chained.
//! - [`DispatchTable`] — a compiled mapping from signature strings to
//!   implementations, with exact-first, conversion-assisted matching and
//!   support for merging two tables under one name.
//!
//! The engine is value-generic: `V` is whatever dynamic value type the
//! embedder dispatches over.

pub mod convert;
pub mod dispatch;
pub mod error;
pub mod signature;
pub mod types;

#[cfg(test)]
mod tests;

pub use convert::{ConversionEdge, ConversionGraph, ConvertFn};
pub use dispatch::{BoxError, DispatchTable, Implementation};
pub use error::TypedError;
pub use signature::{Param, Signature};
pub use types::{TypeDescriptor, TypeRegistry, TypeTest};
