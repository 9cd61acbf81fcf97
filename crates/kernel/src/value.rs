//! The dynamic value interchanged through the namespace.
//!
//! The kernel routes values; it does not compute with them. Domain types
//! (complex numbers, big decimals, matrices, units, …) travel as opaque
//! [`ExternValue`] payloads, classified and coerced purely through the
//! descriptors and conversion edges the embedder registers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use numen_typed::{DispatchTable, Implementation};

use crate::error::KernelError;

/// A plain callable value. Same shape as a dispatch implementation, so a
/// plain function can serve directly as a signature body.
pub type NativeFn = Implementation<Value>;

/// An opaque domain payload with a tag for diagnostics.
#[derive(Clone)]
pub struct ExternValue {
	tag: Box<str>,
	payload: Arc<dyn Any + Send + Sync>,
}

impl ExternValue {
	pub fn new(tag: impl Into<Box<str>>, payload: impl Any + Send + Sync) -> Self {
		Self {
			tag: tag.into(),
			payload: Arc::new(payload),
		}
	}

	pub fn tag(&self) -> &str {
		&self.tag
	}

	pub fn downcast<T: Any>(&self) -> Option<&T> {
		self.payload.downcast_ref()
	}
}

impl fmt::Debug for ExternValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Extern<{}>", self.tag)
	}
}

#[derive(Clone, Default)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Number(f64),
	Str(Box<str>),
	List(Vec<Value>),
	Function(NativeFn),
	Dispatch(Arc<DispatchTable<Value>>),
	Extern(ExternValue),
}

impl Value {
	pub fn str(s: impl Into<Box<str>>) -> Self {
		Value::Str(s.into())
	}

	pub fn function(f: impl Fn(&[Value]) -> Result<Value, crate::BoxError> + Send + Sync + 'static) -> Self {
		Value::Function(Arc::new(f))
	}

	/// A short tag for diagnostics; unrelated to registry classification.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "boolean",
			Value::Number(_) => "number",
			Value::Str(_) => "string",
			Value::List(_) => "list",
			Value::Function(_) => "function",
			Value::Dispatch(_) => "dispatch",
			Value::Extern(_) => "extern",
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Value::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_dispatch(&self) -> Option<&Arc<DispatchTable<Value>>> {
		match self {
			Value::Dispatch(table) => Some(table),
			_ => None,
		}
	}

	pub fn is_callable(&self) -> bool {
		matches!(self, Value::Function(_) | Value::Dispatch(_))
	}

	/// Invokes a function or dispatch-table value.
	pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, KernelError> {
		match self {
			Value::Dispatch(table) => Ok(table.call(args)?),
			Value::Function(f) => f(args).map_err(|cause| KernelError::Execution {
				name: name.into(),
				cause,
			}),
			other => Err(KernelError::NotCallable {
				name: name.into(),
				type_name: other.type_name(),
			}),
		}
	}
}

/// Equality is structural for data values. Functions compare by pointer
/// identity; dispatch tables by name and signature set, so an idempotent
/// rebuild compares equal to its predecessor; extern payloads by pointer
/// identity and tag.
impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a == b,
			(Value::Str(a), Value::Str(b)) => a == b,
			(Value::List(a), Value::List(b)) => a == b,
			(Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
			(Value::Dispatch(a), Value::Dispatch(b)) => {
				Arc::ptr_eq(a, b) || (a.name() == b.name() && a.signatures() == b.signatures())
			}
			(Value::Extern(a), Value::Extern(b)) => {
				a.tag == b.tag && Arc::ptr_eq(&a.payload, &b.payload)
			}
			_ => false,
		}
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("Null"),
			Value::Bool(b) => write!(f, "Bool({b})"),
			Value::Number(n) => write!(f, "Number({n})"),
			Value::Str(s) => write!(f, "Str({s:?})"),
			Value::List(items) => f.debug_tuple("List").field(items).finish(),
			Value::Function(_) => f.write_str("Function(..)"),
			Value::Dispatch(table) => write!(f, "Dispatch({})", table.name()),
			Value::Extern(e) => e.fmt(f),
		}
	}
}

impl From<f64> for Value {
	fn from(n: f64) -> Self {
		Value::Number(n)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::Str(s.into())
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::List(items)
	}
}
