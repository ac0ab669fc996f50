//! Waste image classification: label catalog, input normalization, the model
//! adapter and the request pipeline built on top of them.

use std::path::{Path, PathBuf};

use ort::EnvironmentBuilder;
use thiserror::Error;
use tracing::debug;

pub mod catalog;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod store;
mod utils;

pub use catalog::{CatalogError, CatalogWarning, LabelCatalog, DEFAULT_CATEGORY};
pub use model::{
	Classifier, ModelAdapter, ModelOptions, OnnxClassifier, DEFAULT_MODEL_CANDIDATES,
};
pub use pipeline::{
	select_top, ClassificationError, ClassificationPipeline, InferenceResult, UploadedImage,
};
pub use preprocess::{normalize, INPUT_SHAPE, INPUT_SIZE};
pub use store::ResultStore;

pub use es_images::DEFAULT_MAXIMUM_UPLOAD_SIZE;

/// Points ONNX Runtime at its shared library and commits the global environment.
///
/// Must run once, before the first session is built.
pub fn init(onnxruntime_library: Option<&Path>) -> Result<(), ImageLabelerError> {
	if let Some(library) = onnxruntime_library {
		let path = if library.is_relative() {
			utils::get_path_relative_to_exe(library)
		} else {
			library.to_path_buf()
		};
		debug!(path = %path.display(), "Using ONNX Runtime library");
		std::env::set_var("ORT_DYLIB_PATH", path);
	}

	EnvironmentBuilder::default().with_name("ecoscan").commit()?;

	debug!("Initialized AI environment");

	Ok(())
}

#[derive(Debug, Error)]
pub enum ImageLabelerError {
	#[error("model executor failed: {0}")]
	ModelExecutorFailed(#[from] ort::Error),
	#[error("model executor panicked: {0}")]
	ExecutorPanicked(String),
	#[error("model file not found, tried: {0:?}")]
	ModelFileNotFound(Vec<PathBuf>),
	#[error("model has no {0} tensor")]
	MissingModelIO(&'static str),
	#[error("model returned {got} probabilities but the catalog has {expected} labels")]
	OutputSizeMismatch { expected: usize, got: usize },
	#[error("no model available for inference")]
	NoModelAvailable,
}
