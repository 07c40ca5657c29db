//! Handler table: durable exports and idle-collected callback entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tether_channel::{CallError, Callable, Value};
use tokio::time::Instant;

enum Durability {
	/// Explicitly exported; never removed.
	Durable,
	/// Auto-registered for a marshaled callback; swept once idle.
	Ephemeral { last_seen: Option<Instant> },
}

struct Entry {
	callable: Callable,
	durability: Durability,
}

/// Mapping from exposed function name to callable.
#[derive(Default)]
pub(crate) struct HandlerTable {
	entries: HashMap<String, Entry>,
}

impl HandlerTable {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn insert_durable(&mut self, name: String, callable: Callable) {
		self.entries.insert(
			name,
			Entry {
				callable,
				durability: Durability::Durable,
			},
		);
	}

	pub(crate) fn insert_ephemeral(&mut self, name: String, callable: Callable) {
		self.entries.insert(
			name,
			Entry {
				callable,
				durability: Durability::Ephemeral { last_seen: None },
			},
		);
	}

	/// Fetches a callable; using an ephemeral entry restarts its idle clock.
	pub(crate) fn checkout(&mut self, name: &str) -> Option<Callable> {
		let entry = self.entries.get_mut(name)?;
		if let Durability::Ephemeral { last_seen } = &mut entry.durability {
			*last_seen = None;
		}
		Some(Arc::clone(&entry.callable))
	}

	/// One GC pass over ephemeral entries.
	///
	/// Entries not yet timestamped are timestamped now and kept; entries
	/// already timestamped are removed once `idle` has elapsed since their
	/// stamp. Removal therefore requires being observed unused across two
	/// consecutive sweeps beyond the idle threshold. Returns the number of
	/// entries removed.
	pub(crate) fn sweep(&mut self, idle: Duration) -> usize {
		let now = Instant::now();
		let before = self.entries.len();
		self.entries.retain(|_, entry| match &mut entry.durability {
			Durability::Durable => true,
			Durability::Ephemeral { last_seen } => match *last_seen {
				None => {
					*last_seen = Some(now);
					true
				}
				Some(stamp) => now.duration_since(stamp) <= idle,
			},
		});
		before - self.entries.len()
	}

	/// Sorted snapshot of all registered names.
	pub(crate) fn names(&self) -> Vec<String> {
		let mut names: Vec<_> = self.entries.keys().cloned().collect();
		names.sort();
		names
	}
}

/// Builder for the durable handlers one side exports.
#[derive(Default)]
pub struct Exports {
	entries: Vec<(String, Callable)>,
}

impl Exports {
	/// Creates an empty export set.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a named async function. Registering the same name twice
	/// keeps the later function.
	#[must_use]
	pub fn function<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Value, CallError>> + Send + 'static,
	{
		self.entries
			.push((name.into(), Arc::new(move |args| Box::pin(f(args)))));
		self
	}

	pub(crate) fn into_entries(self) -> Vec<(String, Callable)> {
		self.entries
	}
}
