use es_images::{upload_extension, DEFAULT_MAXIMUM_UPLOAD_SIZE};
use es_utils::error::FileIOError;

use std::{
	path::{Path, PathBuf},
	sync::Arc,
};

use serde::{ser::SerializeStruct, Serialize, Serializer};
use thiserror::Error;
use tokio::{fs, task::spawn_blocking};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
	catalog::{CatalogError, LabelCatalog},
	model::ModelAdapter,
	preprocess::normalize,
	store::ResultStore,
	ImageLabelerError,
};

/// One image as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedImage {
	/// Original filename, only used to recover the extension
	pub filename: String,
	pub bytes: Vec<u8>,
}

impl UploadedImage {
	pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
		Self {
			filename: filename.into(),
			bytes: bytes.into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
	pub predicted_class: String,
	/// Top class probability as a percentage, `0..=100`
	pub confidence: f64,
	pub functional_categories: Vec<String>,
	/// Generated name of the saved upload
	pub filename: String,
}

impl Serialize for InferenceResult {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut state = serializer.serialize_struct("InferenceResult", 6)?;
		state.serialize_field("success", &true)?;
		state.serialize_field("predicted_class", &self.predicted_class)?;
		state.serialize_field("confidence", &self.confidence)?;
		state.serialize_field("functional_categories", &self.functional_categories)?;
		state.serialize_field("categories", &self.functional_categories)?;
		state.serialize_field("filename", &self.filename)?;
		state.end()
	}
}

#[derive(Debug, Error)]
pub enum ClassificationError {
	#[error("No file provided")]
	MissingFilePart,
	#[error("No file selected")]
	EmptyFilename,
	#[error("Invalid file type")]
	UnsupportedExtension(String),
	#[error("Model not loaded")]
	ModelUnavailable,
	#[error("failed to decode image: {0}")]
	Decode(#[from] es_images::Error),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("inference failed: {0}")]
	Inference(ImageLabelerError),
	#[error(transparent)]
	Catalog(#[from] CatalogError),
}

impl ClassificationError {
	/// Whether the request itself was at fault, as opposed to the service
	#[must_use]
	pub const fn is_bad_input(&self) -> bool {
		matches!(
			self,
			Self::MissingFilePart | Self::EmptyFilename | Self::UnsupportedExtension(_)
		)
	}
}

impl From<ImageLabelerError> for ClassificationError {
	fn from(e: ImageLabelerError) -> Self {
		match e {
			ImageLabelerError::NoModelAvailable => Self::ModelUnavailable,
			e => Self::Inference(e),
		}
	}
}

/// Index and value of the highest probability; the first one wins on ties.
#[must_use]
pub fn select_top(probabilities: &[f32]) -> Option<(usize, f32)> {
	probabilities
		.iter()
		.copied()
		.enumerate()
		.reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
}

/// Upload to categorized result: validation, persistence, normalization,
/// inference and category lookup.
#[derive(Debug, Clone)]
pub struct ClassificationPipeline {
	catalog: Arc<LabelCatalog>,
	model: ModelAdapter,
	store: ResultStore,
	upload_dir: Arc<Path>,
	maximum_upload_size: u64,
}

impl ClassificationPipeline {
	pub fn new(
		catalog: Arc<LabelCatalog>,
		model: ModelAdapter,
		store: ResultStore,
		upload_dir: impl Into<PathBuf>,
	) -> Self {
		let upload_dir: PathBuf = upload_dir.into();
		Self {
			catalog,
			model,
			store,
			upload_dir: upload_dir.into(),
			maximum_upload_size: DEFAULT_MAXIMUM_UPLOAD_SIZE,
		}
	}

	#[must_use]
	pub fn with_maximum_upload_size(mut self, maximum_upload_size: u64) -> Self {
		self.maximum_upload_size = maximum_upload_size;
		self
	}

	pub fn model(&self) -> &ModelAdapter {
		&self.model
	}

	pub fn store(&self) -> &ResultStore {
		&self.store
	}

	pub fn upload_dir(&self) -> &Path {
		&self.upload_dir
	}

	/// Runs one upload through the whole pipeline.
	///
	/// Model availability is checked before anything touches the disk, so a
	/// missing model never leaves files behind. Successful results are
	/// registered in the result store under the generated filename.
	pub async fn classify(
		&self,
		upload: Option<UploadedImage>,
	) -> Result<InferenceResult, ClassificationError> {
		let UploadedImage { filename, bytes } = upload.ok_or(ClassificationError::MissingFilePart)?;

		if filename.is_empty() {
			return Err(ClassificationError::EmptyFilename);
		}

		let extension = upload_extension(&filename)
			.map_err(|_| ClassificationError::UnsupportedExtension(filename.clone()))?;

		if !self.model.is_available() {
			return Err(ClassificationError::ModelUnavailable);
		}

		let saved_name = format!("{}.{extension}", Uuid::new_v4().simple());
		let saved_path = self.upload_dir.join(&saved_name);

		fs::write(&saved_path, &bytes).await.map_err(|e| {
			FileIOError::from((&saved_path, e, "Failed to save uploaded image"))
		})?;

		debug!(original = %filename, saved = %saved_name, "Saved upload, starting image preprocessing");

		let maximum_upload_size = self.maximum_upload_size;
		let input = spawn_blocking(move || normalize(&bytes, maximum_upload_size))
			.await
			.map_err(|e| ImageLabelerError::ExecutorPanicked(e.to_string()))??;

		debug!(saved = %saved_name, "Image preprocessed, making prediction");

		let probabilities = self.model.classify(input).await?;

		if probabilities.len() != self.catalog.len() {
			return Err(ImageLabelerError::OutputSizeMismatch {
				expected: self.catalog.len(),
				got: probabilities.len(),
			}
			.into());
		}

		let (index, probability) = select_top(&probabilities).ok_or(
			ImageLabelerError::OutputSizeMismatch {
				expected: self.catalog.len(),
				got: 0,
			},
		)?;

		let predicted_class = self.catalog.class_name_for_index(index)?;
		let confidence = f64::from(probability) * 100.0;

		info!(
			saved = %saved_name,
			%predicted_class,
			confidence,
			"Prediction complete"
		);

		let result = InferenceResult {
			predicted_class: predicted_class.to_string(),
			confidence,
			functional_categories: self.catalog.categories_for_label(predicted_class).to_vec(),
			filename: saved_name.clone(),
		};

		self.store.insert(saved_name, result.clone()).await;

		Ok(result)
	}
}
