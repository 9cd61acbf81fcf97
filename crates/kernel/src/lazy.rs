//! Explicit lazy-cell abstraction for deferred installations.
//!
//! "Install now, compute on first read" is a cell with a fallible thunk
//! and once-only initialization, not a hidden getter. The thunk stays in
//! place until a value is successfully produced, so a re-entrant force
//! (a dependency cycle) re-runs resolution and lets the resolver detect
//! the cycle structurally, and a failed force can be retried later.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::KernelError;
use crate::value::Value;

pub type LazyThunk = Arc<dyn Fn() -> Result<Value, KernelError> + Send + Sync>;

pub struct LazyCell {
	value: RwLock<Option<Value>>,
	thunk: Mutex<Option<LazyThunk>>,
}

impl LazyCell {
	pub fn new(thunk: impl Fn() -> Result<Value, KernelError> + Send + Sync + 'static) -> Self {
		Self {
			value: RwLock::new(None),
			thunk: Mutex::new(Some(Arc::new(thunk))),
		}
	}

	/// A cell that is already initialized.
	pub fn ready(value: Value) -> Self {
		Self {
			value: RwLock::new(Some(value)),
			thunk: Mutex::new(None),
		}
	}

	pub fn is_forced(&self) -> bool {
		self.value.read().is_some()
	}

	/// Returns the value, computing it on first call.
	///
	/// The thunk runs outside the cell's locks. If two forcings race, both
	/// run the thunk but only the first result is kept; the resolver's
	/// identity-keyed instance cache makes the duplicate run return the
	/// same instance anyway.
	pub fn force(&self) -> Result<Value, KernelError> {
		loop {
			if let Some(value) = &*self.value.read() {
				return Ok(value.clone());
			}

			let thunk = self.thunk.lock().clone();
			let Some(thunk) = thunk else {
				// The thunk is cleared only after a value is stored, so a
				// missing thunk means the store is about to become visible.
				continue;
			};

			let value = thunk()?;

			let mut slot = self.value.write();
			if let Some(existing) = &*slot {
				return Ok(existing.clone());
			}
			*slot = Some(value.clone());
			drop(slot);
			*self.thunk.lock() = None;
			return Ok(value);
		}
	}
}

impl std::fmt::Debug for LazyCell {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LazyCell")
			.field("forced", &self.is_forced())
			.finish_non_exhaustive()
	}
}
