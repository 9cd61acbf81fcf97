//! The extensibility kernel of the numen computing environment.
//!
//! # Role
//!
//! Hundreds of independently authored operations compose into one coherent,
//! overridable namespace. This crate is the machinery that makes that work:
//!
//! - [`Env`] — one environment instance owning a [`Namespace`], a type
//!   registry and conversion graph, an instance cache, a [`Config`], and a
//!   notification [`Channel`]. Instances never share mutable state.
//! - [`Factory`] — a named creation recipe with declared dependencies,
//!   awaiting installation. Factories are resolved lazily, memoized by
//!   identity, and invoked exactly once per environment.
//! - [`Import`] / [`Env::install`] — the import merger: batches of
//!   factories and plain values land in the namespace under an
//!   override/silent/wrap policy, dispatch tables contributed by separate
//!   loads merge into strictly larger tables, and every installation is
//!   announced on the event channel.
//! - The restricted surface — the subset of the namespace reachable from a
//!   sandboxed evaluator, with per-name transform overrides and a fixed
//!   denylist of internal subsystems.
//!
//! Operation bodies, expression evaluation, and value storage layout are
//! all opaque to this crate; the kernel only routes.

pub mod config;
pub mod env;
pub mod error;
pub mod events;
pub mod factory;
pub mod import;
pub mod lazy;
pub mod namespace;
mod resolver;
pub mod value;


pub use config::{Config, ConfigUpdate, MatrixMode, NumberMode};
pub use env::{Env, EnvBuilder, RestrictedSurface};
pub use error::KernelError;
pub use events::{Channel, Event, Subscription};
pub use factory::{CONFIG_DEPENDENCY, CreateFn, Factory, NAMESPACE_DEPENDENCY, Resolved};
pub use import::{Import, ImportOptions};
pub use lazy::LazyCell;
pub use namespace::{Binding, Namespace, RESTRICTED_DENYLIST};
pub use value::{ExternValue, NativeFn, Value};

pub use numen_typed::{
	BoxError, ConversionEdge, ConversionGraph, DispatchTable, Implementation, TypeDescriptor,
	TypeRegistry, TypedError,
};
