//! API error handling

use es_ai::ClassificationError;

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde_json::json;
use tracing::error;

/// Rendered as `{"error": message}`, plus `"categories"` when the endpoint
/// answers failures with fallback categories.
#[derive(Debug)]
pub struct ApiError {
	pub status: StatusCode,
	pub message: String,
	pub fallback_categories: Option<Vec<String>>,
}

impl ApiError {
	pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
		Self {
			status,
			message: msg.into(),
			fallback_categories: None,
		}
	}

	pub fn bad_request(msg: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, msg)
	}

	pub fn not_found(msg: impl Into<String>) -> Self {
		Self::new(StatusCode::NOT_FOUND, msg)
	}

	pub fn internal(msg: impl Into<String>) -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
	}

	#[must_use]
	pub fn with_fallback_categories<I, S>(mut self, categories: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.fallback_categories = Some(categories.into_iter().map(Into::into).collect());
		self
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = match self.fallback_categories {
			Some(categories) => json!({
				"error": self.message,
				"categories": categories,
			}),
			None => json!({ "error": self.message }),
		};

		(self.status, Json(body)).into_response()
	}
}

impl From<ClassificationError> for ApiError {
	fn from(err: ClassificationError) -> Self {
		if err.is_bad_input() {
			Self::bad_request(err.to_string())
		} else {
			error!("Classification failed: {err:#?}");
			Self::internal(err.to_string())
		}
	}
}
