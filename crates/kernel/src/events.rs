//! The environment's notification channel.
//!
//! An explicit publish/subscribe channel owned by each environment
//! instance, scoped to its lifecycle. Delivery is synchronous on the
//! calling thread; listeners run outside the channel's own lock, so a
//! listener may subscribe, unsubscribe, or install without deadlocking.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::config::Config;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
	/// A name was installed (or reinstalled) into the namespace.
	Import {
		name: Box<str>,
		path: Option<Box<str>>,
	},
	/// The environment configuration changed.
	Config { config: Config },
}

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Token returned by [`Channel::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

#[derive(Default)]
pub struct Channel {
	listeners: RwLock<Vec<(u64, Listener)>>,
	next_token: AtomicU64,
}

impl Channel {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&self, listener: impl Fn(&Event) + Send + Sync + 'static) -> Subscription {
		let token = self.next_token.fetch_add(1, Ordering::Relaxed);
		self.listeners.write().push((token, Arc::new(listener)));
		Subscription(token)
	}

	/// Removes a listener. Returns false when the token was already gone.
	pub fn unsubscribe(&self, subscription: Subscription) -> bool {
		let mut listeners = self.listeners.write();
		let before = listeners.len();
		listeners.retain(|(token, _)| *token != subscription.0);
		listeners.len() != before
	}

	pub fn emit(&self, event: &Event) {
		let snapshot: Vec<Listener> = self
			.listeners
			.read()
			.iter()
			.map(|(_, l)| l.clone())
			.collect();
		for listener in snapshot {
			listener(event);
		}
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.read().len()
	}
}
