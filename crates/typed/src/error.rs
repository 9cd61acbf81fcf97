//! Error taxonomy for the dispatch engine.

/// Boxed error produced by an implementation body.
///
/// Implementations are opaque payloads; whatever they raise is carried
/// through dispatch unchanged as the source of [`TypedError::Execution`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum TypedError {
	/// A descriptor with this name is already present in the registry.
	#[error("type '{0}' is already registered")]
	DuplicateType(Box<str>),

	/// No registered type predicate matched the value. Registries should
	/// end with a catch-all descriptor to make this unreachable in practice.
	#[error("value matched none of the {count} registered types")]
	UnclassifiedValue { count: usize },

	/// A signature string failed to parse or referenced an unknown type.
	#[error("invalid signature '{signature}': {reason}")]
	InvalidSignature { signature: Box<str>, reason: Box<str> },

	/// An implicit conversion raised.
	#[error("cannot convert from '{from}' to '{to}': {cause}")]
	Conversion {
		from: Box<str>,
		to: Box<str>,
		cause: Box<str>,
	},

	/// No signature, exact or conversion-assisted, accepts the offered
	/// argument types.
	#[error(
		"no matching signature for '{name}({})'; offered signatures: {}",
		.provided.join(", "),
		.available.join("; ")
	)]
	NoMatchingSignature {
		name: Box<str>,
		provided: Vec<Box<str>>,
		available: Vec<Box<str>>,
	},

	/// Both sides of a merge define the same signature and override was
	/// not requested.
	#[error("cannot merge '{name}': signature '{signature}' is defined by both tables")]
	DuplicateSignature { name: Box<str>, signature: Box<str> },

	/// The selected implementation raised.
	#[error("error invoking '{name}'")]
	Execution {
		name: Box<str>,
		#[source]
		cause: BoxError,
	},
}
