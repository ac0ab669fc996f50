use std::{
	fmt, io,
	path::{Path, PathBuf},
	sync::Arc,
};

use ndarray::{Array4, ArrayView4};
use ort::{GraphOptimizationLevel, Session, SessionBuilder};
use tokio::{fs, sync::Semaphore, task::spawn_blocking};
use tracing::{debug, error, info, warn};

use super::ImageLabelerError;

/// Model file names probed, in order, when no candidates are configured.
pub const DEFAULT_MODEL_CANDIDATES: [&str; 7] = [
	"model.onnx",
	"EcoScan_2 (1).onnx",
	"EcoScan_2.onnx",
	"EcoScan.onnx",
	"3RVision_2 (1).onnx",
	"3RVision_2.onnx",
	"3RVision.onnx",
];

/// A loaded classification model: one `[1, 224, 224, 3]` tensor in, one
/// probability per class out.
///
/// Implementations are called from the blocking thread pool and may be called
/// concurrently, up to the adapter's configured limit.
pub trait Classifier: Send + Sync + 'static {
	fn classify(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ImageLabelerError>;
}

pub struct OnnxClassifier {
	session: Session,
	input_name: String,
	output_name: String,
}

impl OnnxClassifier {
	pub fn from_file(model_path: &Path, intra_threads: usize) -> Result<Self, ImageLabelerError> {
		let session = SessionBuilder::new()?
			.with_optimization_level(GraphOptimizationLevel::Level3)?
			.with_intra_threads(i16::try_from(intra_threads).unwrap_or(i16::MAX))?
			.with_memory_pattern(true)?
			.with_model_from_file(model_path)?;

		let input_name = session
			.inputs
			.first()
			.map(|input| input.name.clone())
			.ok_or(ImageLabelerError::MissingModelIO("input"))?;
		let output_name = session
			.outputs
			.first()
			.map(|output| output.name.clone())
			.ok_or(ImageLabelerError::MissingModelIO("output"))?;

		debug!(%input_name, %output_name, "Model session ready");

		Ok(Self {
			session,
			input_name,
			output_name,
		})
	}
}

impl Classifier for OnnxClassifier {
	fn classify(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ImageLabelerError> {
		let outputs = self
			.session
			.run(ort::inputs![self.input_name.as_str() => input]?)?;

		let probabilities = outputs[self.output_name.as_str()].extract_tensor::<f32>()?;

		Ok(probabilities.view().iter().copied().collect())
	}
}

/// Options used to build a [`ModelAdapter`] from disk.
#[derive(Debug, Clone)]
pub struct ModelOptions {
	/// Ordered model paths; the first one that exists is loaded
	pub candidates: Vec<PathBuf>,
	/// ONNX Runtime shared library, relative paths are resolved against the executable
	pub onnxruntime_library: Option<PathBuf>,
	pub intra_threads: usize,
	pub max_concurrent_inferences: usize,
}

impl Default for ModelOptions {
	fn default() -> Self {
		Self {
			candidates: DEFAULT_MODEL_CANDIDATES.iter().map(PathBuf::from).collect(),
			onnxruntime_library: None,
			intra_threads: std::thread::available_parallelism()
				.map_or(1, usize::from)
				.min(4),
			max_concurrent_inferences: 1,
		}
	}
}

#[derive(Clone)]
enum ModelState {
	Loaded {
		classifier: Arc<dyn Classifier>,
		source: Option<Arc<Path>>,
	},
	Unavailable {
		reason: Arc<str>,
	},
}

/// Owns the model for the whole process lifetime.
///
/// Built once at startup: either a model was loaded, or the adapter stays
/// unavailable for good and every [`ModelAdapter::classify`] call fails fast with
/// [`ImageLabelerError::NoModelAvailable`]. There is no reload and no retry.
#[derive(Clone)]
pub struct ModelAdapter {
	state: ModelState,
	permits: Arc<Semaphore>,
}

impl ModelAdapter {
	pub fn new(classifier: Arc<dyn Classifier>, max_concurrent_inferences: usize) -> Self {
		Self {
			state: ModelState::Loaded {
				classifier,
				source: None,
			},
			permits: Arc::new(Semaphore::new(max_concurrent_inferences.max(1))),
		}
	}

	pub fn unavailable(reason: impl Into<String>) -> Self {
		let reason: String = reason.into();
		Self {
			state: ModelState::Unavailable {
				reason: reason.into(),
			},
			permits: Arc::new(Semaphore::new(1)),
		}
	}

	/// Loads the first existing candidate model, never failing: any problem leaves
	/// the adapter permanently unavailable.
	pub async fn load(options: ModelOptions) -> Self {
		let Some(model_path) = find_model_file(&options.candidates).await else {
			error!(
				candidates = ?options.candidates,
				"Model file not found! Place one of the candidate files in the model directory"
			);
			return Self::unavailable(
				ImageLabelerError::ModelFileNotFound(options.candidates).to_string(),
			);
		};

		info!(path = %model_path.display(), "Found model file, loading it");

		let ModelOptions {
			onnxruntime_library,
			intra_threads,
			max_concurrent_inferences,
			..
		} = options;

		let load_res = spawn_blocking({
			let model_path = model_path.clone();
			move || {
				super::init(onnxruntime_library.as_deref())?;
				OnnxClassifier::from_file(&model_path, intra_threads)
			}
		})
		.await;

		match load_res {
			Ok(Ok(classifier)) => {
				info!(path = %model_path.display(), "Model loaded successfully");
				Self {
					state: ModelState::Loaded {
						classifier: Arc::new(classifier),
						source: Some(model_path.into()),
					},
					permits: Arc::new(Semaphore::new(max_concurrent_inferences.max(1))),
				}
			}
			Ok(Err(e)) => {
				error!(path = %model_path.display(), "Error loading model: {e:#?}");
				Self::unavailable(e.to_string())
			}
			Err(e) => {
				error!(path = %model_path.display(), "Model loader panicked: {e:#?}");
				Self::unavailable(ImageLabelerError::ExecutorPanicked(e.to_string()).to_string())
			}
		}
	}

	pub fn is_available(&self) -> bool {
		matches!(self.state, ModelState::Loaded { .. })
	}

	pub fn source(&self) -> Option<&Path> {
		match &self.state {
			ModelState::Loaded { source, .. } => source.as_deref(),
			ModelState::Unavailable { .. } => None,
		}
	}

	pub fn unavailable_reason(&self) -> Option<&str> {
		match &self.state {
			ModelState::Loaded { .. } => None,
			ModelState::Unavailable { reason } => Some(&**reason),
		}
	}

	/// Runs the model on the blocking thread pool, holding one of the adapter's
	/// inference permits for the duration of the call.
	pub async fn classify(&self, input: Array4<f32>) -> Result<Vec<f32>, ImageLabelerError> {
		let classifier = match &self.state {
			ModelState::Loaded { classifier, .. } => Arc::clone(classifier),
			ModelState::Unavailable { .. } => return Err(ImageLabelerError::NoModelAvailable),
		};

		let _permit = Arc::clone(&self.permits)
			.acquire_owned()
			.await
			.map_err(|_| ImageLabelerError::NoModelAvailable)?;

		spawn_blocking(move || classifier.classify(input.view()))
			.await
			.map_err(|e| ImageLabelerError::ExecutorPanicked(e.to_string()))?
	}
}

impl fmt::Debug for ModelAdapter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModelAdapter")
			.field("available", &self.is_available())
			.field("source", &self.source())
			.field("unavailable_reason", &self.unavailable_reason())
			.finish()
	}
}

/// First candidate that exists on disk, in configuration order.
pub async fn find_model_file(candidates: &[PathBuf]) -> Option<PathBuf> {
	for candidate in candidates {
		match fs::metadata(candidate).await {
			Ok(metadata) if metadata.is_file() => return Some(candidate.clone()),
			Ok(_) => debug!(path = %candidate.display(), "Model candidate is not a file"),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				debug!(path = %candidate.display(), "Model candidate not found");
			}
			Err(e) => warn!(path = %candidate.display(), "Failed to inspect model candidate: {e:#?}"),
		}
	}

	None
}
