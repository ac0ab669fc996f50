use std::{
	collections::{HashMap, VecDeque},
	num::NonZeroUsize,
	sync::Arc,
};

use tokio::sync::RwLock;
use tracing::debug;

use super::InferenceResult;

#[derive(Debug, Default)]
struct Entries {
	results: HashMap<String, Arc<InferenceResult>>,
	insertion_order: VecDeque<String>,
}

/// Process-wide store of classification results, keyed by the generated upload
/// filename.
///
/// Unbounded unless built with [`ResultStore::with_capacity`], in which case the
/// oldest result is evicted to make room for a new one.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
	entries: Arc<RwLock<Entries>>,
	capacity: Option<NonZeroUsize>,
}

impl ResultStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// A zero capacity means unbounded.
	#[must_use]
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			entries: Arc::default(),
			capacity: NonZeroUsize::new(capacity),
		}
	}

	pub async fn insert(&self, filename: impl Into<String>, result: InferenceResult) {
		let filename = filename.into();
		let mut entries = self.entries.write().await;

		if entries
			.results
			.insert(filename.clone(), Arc::new(result))
			.is_none()
		{
			entries.insertion_order.push_back(filename);
		}

		if let Some(capacity) = self.capacity {
			while entries.results.len() > capacity.get() {
				let Some(oldest) = entries.insertion_order.pop_front() else {
					break;
				};
				entries.results.remove(&oldest);
				debug!(filename = %oldest, "Evicted cached classification result");
			}
		}
	}

	pub async fn get(&self, filename: &str) -> Option<Arc<InferenceResult>> {
		self.entries.read().await.results.get(filename).cloned()
	}

	pub async fn len(&self) -> usize {
		self.entries.read().await.results.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}
}
