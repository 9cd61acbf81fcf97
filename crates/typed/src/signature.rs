//! Signature grammar: parsing and canonicalization.
//!
//! A signature is a comma-separated parameter list. Each parameter is a
//! `|`-separated set of acceptable type names; the last parameter may be
//! prefixed with `...` to absorb all remaining arguments under one set of
//! alternatives. Examples:
//!
//! ```text
//! ""                          zero arguments
//! "number"                    one number
//! "string, number | boolean"  a string, then a number or boolean
//! "number, ...string"         a number, then any count of strings
//! ```
//!
//! The canonical string form (single spaces around `|`, `, ` between
//! parameters) is the key under which an implementation is stored in a
//! dispatch table, so two spellings of the same signature collapse to one
//! entry.

use crate::error::TypedError;

/// One parameter position of a signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
	/// Acceptable type names, in declared order.
	pub alternatives: Vec<Box<str>>,
	/// True when this (last) parameter absorbs all remaining arguments.
	pub rest: bool,
}

impl Param {
	pub fn accepts(&self, type_name: &str) -> bool {
		self.alternatives.iter().any(|a| &**a == type_name)
	}
}

/// A parsed signature with its canonical string form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
	params: Vec<Param>,
	canonical: Box<str>,
}

impl Signature {
	/// Parses a raw signature string.
	pub fn parse(raw: &str) -> Result<Self, TypedError> {
		let invalid = |reason: &str| TypedError::InvalidSignature {
			signature: raw.into(),
			reason: reason.into(),
		};

		let trimmed = raw.trim();
		if trimmed.is_empty() {
			return Ok(Self {
				params: Vec::new(),
				canonical: "".into(),
			});
		}

		let mut params = Vec::new();
		let parts: Vec<&str> = trimmed.split(',').collect();
		let last = parts.len() - 1;

		for (i, part) in parts.iter().enumerate() {
			let mut part = part.trim();
			if part.is_empty() {
				return Err(invalid("empty parameter"));
			}

			let rest = part.starts_with("...");
			if rest {
				if i != last {
					return Err(invalid("rest parameter must be last"));
				}
				part = part[3..].trim_start();
				if part.is_empty() {
					return Err(invalid("rest parameter without type"));
				}
			}

			let mut alternatives = Vec::new();
			for alt in part.split('|') {
				let alt = alt.trim();
				if alt.is_empty() {
					return Err(invalid("empty type alternative"));
				}
				if alt.contains(char::is_whitespace) {
					return Err(invalid("whitespace inside type name"));
				}
				if !alternatives.iter().any(|a: &Box<str>| &**a == alt) {
					alternatives.push(Box::from(alt));
				}
			}

			params.push(Param { alternatives, rest });
		}

		let canonical = canonical_form(&params).into();
		Ok(Self { params, canonical })
	}

	pub fn canonical(&self) -> &str {
		&self.canonical
	}

	pub fn params(&self) -> &[Param] {
		&self.params
	}

	/// Whether the signature can accept `n` arguments.
	pub fn accepts_arity(&self, n: usize) -> bool {
		match self.params.last() {
			Some(p) if p.rest => n >= self.params.len() - 1,
			_ => n == self.params.len(),
		}
	}

	/// The parameter governing argument position `index`, rest-aware.
	pub fn param_at(&self, index: usize) -> Option<&Param> {
		match self.params.get(index) {
			Some(p) => Some(p),
			None => match self.params.last() {
				Some(p) if p.rest => Some(p),
				_ => None,
			}
		}
	}

	/// Every type name referenced by the signature.
	pub fn type_names(&self) -> impl Iterator<Item = &str> {
		self.params
			.iter()
			.flat_map(|p| p.alternatives.iter().map(|a| &**a))
	}
}

impl std::fmt::Display for Signature {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.canonical)
	}
}

fn canonical_form(params: &[Param]) -> String {
	let mut out = String::new();
	for (i, param) in params.iter().enumerate() {
		if i > 0 {
			out.push_str(", ");
		}
		if param.rest {
			out.push_str("...");
		}
		for (j, alt) in param.alternatives.iter().enumerate() {
			if j > 0 {
				out.push_str(" | ");
			}
			out.push_str(alt);
		}
	}
	out
}
