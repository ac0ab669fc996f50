use crate::{error::ApiError, state::AppState};

use es_ai::InferenceResult;

use axum::{
	extract::{Path, State},
	Json,
};
use tracing::debug;

/// Cached result of an earlier `/upload` or `/analyze` call, by saved filename.
pub async fn get_result(
	State(state): State<AppState>,
	Path(filename): Path<String>,
) -> Result<Json<InferenceResult>, ApiError> {
	match state.store().get(&filename).await {
		Some(result) => Ok(Json(InferenceResult::clone(&result))),
		None => {
			debug!(%filename, "No cached result");
			Err(ApiError::not_found("ML results not found"))
		}
	}
}
