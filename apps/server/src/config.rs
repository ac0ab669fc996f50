//! Server configuration: JSON file, then CLI flags and environment variables

use es_ai::{ModelOptions, DEFAULT_MAXIMUM_UPLOAD_SIZE, DEFAULT_MODEL_CANDIDATES};
use es_utils::error::FileIOError;

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("invalid config file '{}': {source}", path.display())]
	Parse {
		path: Box<Path>,
		#[source]
		source: serde_json::Error,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
	/// Where uploads are saved under their generated names
	pub upload_dir: PathBuf,
	/// Served for any path no route matches, `None` disables static files
	pub static_dir: Option<PathBuf>,
	/// Relative model candidates are resolved against this directory
	pub model_dir: PathBuf,
	/// Model files to try, in order; the first existing one is loaded
	pub model_candidates: Vec<PathBuf>,
	pub onnxruntime_library: Option<PathBuf>,
	pub intra_threads: usize,
	pub max_concurrent_inferences: usize,
	/// In bytes
	pub max_upload_size: u64,
	/// Unbounded when unset
	pub result_store_capacity: Option<usize>,
	/// Refuse to start without a model instead of answering "Model not loaded"
	pub require_model: bool,
}

impl Default for ServerConfig {
	fn default() -> Self {
		let model_options = ModelOptions::default();

		Self {
			host: "0.0.0.0".to_string(),
			port: 5001,
			upload_dir: PathBuf::from("static/uploads"),
			static_dir: Some(PathBuf::from("static")),
			model_dir: PathBuf::from("."),
			model_candidates: DEFAULT_MODEL_CANDIDATES.iter().map(PathBuf::from).collect(),
			onnxruntime_library: None,
			intra_threads: model_options.intra_threads,
			max_concurrent_inferences: model_options.max_concurrent_inferences,
			max_upload_size: DEFAULT_MAXIMUM_UPLOAD_SIZE,
			result_store_capacity: None,
			require_model: false,
		}
	}
}

impl ServerConfig {
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();

		let json = std::fs::read_to_string(path)
			.map_err(|e| FileIOError::from((path, e, "Failed to read config file")))?;

		serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
			path: path.into(),
			source,
		})
	}

	/// Model loading options with candidates resolved against `model_dir`.
	pub fn model_options(&self) -> ModelOptions {
		ModelOptions {
			candidates: self
				.model_candidates
				.iter()
				.map(|candidate| self.model_dir.join(candidate))
				.collect(),
			onnxruntime_library: self.onnxruntime_library.clone(),
			intra_threads: self.intra_threads,
			max_concurrent_inferences: self.max_concurrent_inferences,
		}
	}
}

#[derive(Parser, Debug, Default)]
#[command(name = "es-server", about = "EcoScan waste classification server")]
pub struct Cli {
	/// JSON config file, flags below take precedence over it
	#[arg(long, env = "ECOSCAN_CONFIG")]
	pub config: Option<PathBuf>,

	#[arg(long, env = "ECOSCAN_HOST")]
	pub host: Option<String>,

	#[arg(long, env = "ECOSCAN_PORT")]
	pub port: Option<u16>,

	#[arg(long, env = "ECOSCAN_UPLOAD_DIR")]
	pub upload_dir: Option<PathBuf>,

	#[arg(long, env = "ECOSCAN_STATIC_DIR")]
	pub static_dir: Option<PathBuf>,

	#[arg(long, env = "ECOSCAN_MODEL_DIR")]
	pub model_dir: Option<PathBuf>,

	/// Model file candidate, may be repeated or comma separated
	#[arg(long = "model", env = "ECOSCAN_MODEL_CANDIDATES", value_delimiter = ',')]
	pub model_candidates: Vec<PathBuf>,

	/// Path to the ONNX Runtime shared library
	#[arg(long, env = "ECOSCAN_ONNXRUNTIME_LIBRARY")]
	pub onnxruntime_library: Option<PathBuf>,

	#[arg(long, env = "ECOSCAN_INTRA_THREADS")]
	pub intra_threads: Option<usize>,

	#[arg(long, env = "ECOSCAN_MAX_CONCURRENT_INFERENCES")]
	pub max_concurrent_inferences: Option<usize>,

	/// In bytes
	#[arg(long, env = "ECOSCAN_MAX_UPLOAD_SIZE")]
	pub max_upload_size: Option<u64>,

	#[arg(long, env = "ECOSCAN_RESULT_STORE_CAPACITY")]
	pub result_store_capacity: Option<usize>,

	#[arg(long, env = "ECOSCAN_REQUIRE_MODEL")]
	pub require_model: bool,
}

impl Cli {
	pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
		let mut config = self
			.config
			.as_deref()
			.map_or_else(|| Ok(ServerConfig::default()), ServerConfig::load)?;

		if let Some(host) = self.host {
			config.host = host;
		}
		if let Some(port) = self.port {
			config.port = port;
		}
		if let Some(upload_dir) = self.upload_dir {
			config.upload_dir = upload_dir;
		}
		if let Some(static_dir) = self.static_dir {
			config.static_dir = Some(static_dir);
		}
		if let Some(model_dir) = self.model_dir {
			config.model_dir = model_dir;
		}
		if !self.model_candidates.is_empty() {
			config.model_candidates = self.model_candidates;
		}
		if let Some(onnxruntime_library) = self.onnxruntime_library {
			config.onnxruntime_library = Some(onnxruntime_library);
		}
		if let Some(intra_threads) = self.intra_threads {
			config.intra_threads = intra_threads;
		}
		if let Some(max_concurrent_inferences) = self.max_concurrent_inferences {
			config.max_concurrent_inferences = max_concurrent_inferences;
		}
		if let Some(max_upload_size) = self.max_upload_size {
			config.max_upload_size = max_upload_size;
		}
		if let Some(capacity) = self.result_store_capacity {
			config.result_store_capacity = Some(capacity);
		}
		config.require_model |= self.require_model;

		Ok(config)
	}
}
