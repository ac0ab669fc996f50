use es_ai::{ClassificationPipeline, ModelAdapter, ResultStore};

/// Shared by every handler; cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
	pub pipeline: ClassificationPipeline,
}

impl AppState {
	pub fn new(pipeline: ClassificationPipeline) -> Self {
		Self { pipeline }
	}

	pub fn model(&self) -> &ModelAdapter {
		self.pipeline.model()
	}

	pub fn store(&self) -> &ResultStore {
		self.pipeline.store()
	}
}
