use crate::state::AppState;

use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	status: &'static str,
	model_loaded: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok",
		model_loaded: state.model().is_available(),
	})
}
