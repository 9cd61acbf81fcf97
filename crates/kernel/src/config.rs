//! Environment configuration.
//!
//! Configuration is plain data: a struct owned by the environment, updated
//! through partial [`ConfigUpdate`]s. A change emits `Event::Config`, which
//! causes the import merger to rebuild every configuration-sensitive
//! factory (see [`crate::env::Env::configure`]).

use serde::{Deserialize, Serialize};

/// Preferred structured output form for operations that can return either.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixMode {
	#[default]
	Matrix,
	Array,
}

/// Preferred numeric representation for operations that parse or generate
/// numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberMode {
	#[default]
	Float,
	Big,
	Fraction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Minimum relative difference used by comparison operations.
	pub relative_tolerance: f64,
	pub matrix_output: MatrixMode,
	pub number_mode: NumberMode,
	/// Significant digits for arbitrary-precision numbers.
	pub precision: u32,
	/// When true, output types depend only on input types, never on input
	/// values.
	pub predictable: bool,
	/// Seed for seeded pseudo-random generation; `None` seeds randomly.
	pub random_seed: Option<Box<str>>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			relative_tolerance: 1e-12,
			matrix_output: MatrixMode::default(),
			number_mode: NumberMode::default(),
			precision: 64,
			predictable: false,
			random_seed: None,
		}
	}
}

/// A partial configuration change; unset fields keep their current value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
	pub relative_tolerance: Option<f64>,
	pub matrix_output: Option<MatrixMode>,
	pub number_mode: Option<NumberMode>,
	pub precision: Option<u32>,
	pub predictable: Option<bool>,
	/// `Some(None)` clears the seed; `None` leaves it untouched.
	pub random_seed: Option<Option<Box<str>>>,
}

impl Config {
	/// Returns this configuration with the update applied.
	pub fn apply(&self, update: &ConfigUpdate) -> Config {
		Config {
			relative_tolerance: update.relative_tolerance.unwrap_or(self.relative_tolerance),
			matrix_output: update.matrix_output.unwrap_or(self.matrix_output),
			number_mode: update.number_mode.unwrap_or(self.number_mode),
			precision: update.precision.unwrap_or(self.precision),
			predictable: update.predictable.unwrap_or(self.predictable),
			random_seed: update
				.random_seed
				.clone()
				.unwrap_or_else(|| self.random_seed.clone()),
		}
	}
}
