use crate::{config::ServerConfig, state::AppState};

use axum::{
	extract::DefaultBodyLimit,
	http::{header, Method},
	routing::{get, post},
	Router,
};
use tower_http::{
	cors::{Any, CorsLayer},
	services::ServeDir,
	trace::TraceLayer,
};

mod classify;
mod health;
mod results;

/// Room for multipart boundaries and part headers on top of the image itself.
pub const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Create the main API router.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
	let body_limit = usize::try_from(config.max_upload_size.saturating_add(MULTIPART_OVERHEAD))
		.unwrap_or(usize::MAX);

	let mut router = Router::new()
		.route("/analyze", post(classify::analyze))
		.route("/upload", post(classify::upload))
		.route("/ml-results/:filename", get(results::get_result))
		.route("/health", get(health::health))
		.layer(DefaultBodyLimit::max(body_limit));

	// Index page and saved uploads
	if let Some(static_dir) = &config.static_dir {
		router = router.fallback_service(ServeDir::new(static_dir));
	}

	router
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
				.allow_headers([header::CONTENT_TYPE]),
		)
		.with_state(state)
}
