use crate::{error::ApiError, state::AppState};

use es_ai::{InferenceResult, UploadedImage};

use axum::{
	extract::{multipart::MultipartRejection, Multipart, State},
	Json,
};
use serde::Serialize;
use tracing::debug;

/// What `/analyze` answers with when it cannot classify the image.
const ANALYZE_FALLBACK_CATEGORY: &str = "general waste";

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
	categories: Vec<String>,
}

/// Classifies the multipart `image` field, answering with its categories only.
pub async fn analyze(
	State(state): State<AppState>,
	multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
	analyze_image(&state, multipart)
		.await
		.map(Json)
		.map_err(|e| {
			debug!(status = %e.status, "Analyze failed, answering with fallback categories: {}", e.message);
			e.with_fallback_categories([ANALYZE_FALLBACK_CATEGORY])
		})
}

async fn analyze_image(
	state: &AppState,
	multipart: Result<Multipart, MultipartRejection>,
) -> Result<AnalyzeResponse, ApiError> {
	let upload = read_file_field(multipart, "image")
		.await?
		.ok_or_else(|| ApiError::bad_request("No image provided"))?;

	let InferenceResult {
		functional_categories,
		..
	} = state.pipeline.classify(Some(upload)).await?;

	Ok(AnalyzeResponse {
		categories: functional_categories,
	})
}

/// Classifies the multipart `file` field, answering with the full result.
pub async fn upload(
	State(state): State<AppState>,
	multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<InferenceResult>, ApiError> {
	let upload = read_file_field(multipart, "file").await?;

	state
		.pipeline
		.classify(upload)
		.await
		.map(Json)
		.map_err(Into::into)
}

/// First file part named `field_name`, if any.
///
/// Parts without a filename are form values, not files, and are skipped. A
/// request that isn't multipart at all has no file part either.
async fn read_file_field(
	multipart: Result<Multipart, MultipartRejection>,
	field_name: &str,
) -> Result<Option<UploadedImage>, ApiError> {
	let mut multipart = match multipart {
		Ok(multipart) => multipart,
		Err(rejection) => {
			debug!("Request has no multipart body: {rejection}");
			return Ok(None);
		}
	};

	while let Some(field) = multipart
		.next_field()
		.await
		.map_err(|e| ApiError::new(e.status(), e.body_text()))?
	{
		if field.name() != Some(field_name) {
			continue;
		}

		let Some(filename) = field.file_name().map(ToString::to_string) else {
			continue;
		};

		let bytes = field
			.bytes()
			.await
			.map_err(|e| ApiError::new(e.status(), e.body_text()))?;

		debug!(%filename, size = bytes.len(), "Received upload");

		return Ok(Some(UploadedImage::new(filename, bytes.to_vec())));
	}

	Ok(None)
}
