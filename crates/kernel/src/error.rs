//! Kernel error taxonomy.
//!
//! Everything surfaces to the immediate caller of `install` or of a
//! dispatch invocation; nothing is swallowed except a name conflict under
//! `silent: true`, which the import merger downgrades to a skipped
//! installation.

use numen_typed::{BoxError, TypedError};

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
	/// Classification, conversion, or dispatch failure from the engine.
	#[error(transparent)]
	Typed(#[from] TypedError),

	/// The name is already bound and the import requested neither
	/// override nor silence.
	#[error("cannot import '{name}': already exists")]
	NameConflict { name: Box<str> },

	/// Dependency resolution re-entered a factory already being resolved.
	#[error("cyclic dependency: {}", .chain.join(" -> "))]
	CyclicDependency { chain: Vec<String> },

	/// A declared dependency is neither installed nor installable.
	#[error("dependency '{name}' of '{requested_by}' is not available")]
	MissingDependency {
		name: Box<str>,
		requested_by: Box<str>,
	},

	/// A malformed unit: missing name, bare unnamed value, and the like.
	#[error("invalid unit: {reason}")]
	InvalidUnitShape { reason: Box<str> },

	/// A value that is neither a function nor a dispatch table was called.
	#[error("'{name}' of type {type_name} is not callable")]
	NotCallable {
		name: Box<str>,
		type_name: &'static str,
	},

	/// A function value raised during invocation.
	#[error("error invoking '{name}'")]
	Execution {
		name: Box<str>,
		#[source]
		cause: BoxError,
	},

	/// A lazily installed binding outlived its environment instance.
	#[error("environment instance was dropped")]
	EnvironmentDropped,
}

impl KernelError {
	pub(crate) fn invalid_unit(reason: impl Into<Box<str>>) -> Self {
		Self::InvalidUnitShape {
			reason: reason.into(),
		}
	}
}
