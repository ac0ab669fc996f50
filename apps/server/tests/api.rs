use es_ai::{
	ClassificationPipeline, Classifier, ImageLabelerError, LabelCatalog, ModelAdapter, ResultStore,
};
use es_server::{create_router, AppState, ServerConfig};

use std::{io::Cursor, path::Path, sync::Arc};

use axum::{
	body::{to_bytes, Body},
	http::{header, Request, StatusCode},
	Router,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use ndarray::ArrayView4;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const BOUNDARY: &str = "ecoscan-test-boundary";

struct Fixed(Vec<f32>);

impl Classifier for Fixed {
	fn classify(&self, _: ArrayView4<'_, f32>) -> Result<Vec<f32>, ImageLabelerError> {
		Ok(self.0.clone())
	}
}

fn one_hot(index: usize) -> Vec<f32> {
	let mut probabilities = vec![0.0; 25];
	probabilities[index] = 0.9;
	probabilities[(index + 1) % 25] = 0.1;
	probabilities
}

fn jpeg() -> Vec<u8> {
	let mut bytes = Vec::new();
	DynamicImage::ImageRgb8(RgbImage::new(64, 48))
		.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
		.unwrap();
	bytes
}

struct TestApp {
	dir: TempDir,
	router: Router,
}

impl TestApp {
	fn new(model: ModelAdapter) -> Self {
		Self::with_upload_limit(model, ServerConfig::default().max_upload_size)
	}

	fn with_upload_limit(model: ModelAdapter, max_upload_size: u64) -> Self {
		let dir = tempdir().unwrap();
		let static_dir = dir.path().join("static");
		let upload_dir = static_dir.join("uploads");
		std::fs::create_dir_all(&upload_dir).unwrap();
		std::fs::write(static_dir.join("index.html"), "<h1>EcoScan</h1>").unwrap();

		let config = ServerConfig {
			static_dir: Some(static_dir),
			upload_dir: upload_dir.clone(),
			max_upload_size,
			..Default::default()
		};

		let pipeline = ClassificationPipeline::new(
			Arc::new(LabelCatalog::ecoscan()),
			model,
			ResultStore::new(),
			upload_dir,
		)
		.with_maximum_upload_size(max_upload_size);

		Self {
			router: create_router(AppState::new(pipeline), &config),
			dir,
		}
	}

	fn classifying_as(index: usize) -> Self {
		Self::new(ModelAdapter::new(Arc::new(Fixed(one_hot(index))), 1))
	}

	fn upload_dir(&self) -> std::path::PathBuf {
		self.dir.path().join("static").join("uploads")
	}

	async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
		let response = self.router.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, bytes.to_vec())
	}

	async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
		let (status, bytes) = self.send(request).await;
		(status, serde_json::from_slice(&bytes).unwrap())
	}
}

/// `(field name, filename, content)`; a `None` filename makes a plain form value.
fn multipart(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
	let mut body = Vec::new();
	for (name, filename, content) in parts {
		body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
		match filename {
			Some(filename) => body.extend_from_slice(
				format!(
					"Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
					 Content-Type: application/octet-stream\r\n\r\n"
				)
				.as_bytes(),
			),
			None => body.extend_from_slice(
				format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
			),
		}
		body.extend_from_slice(content);
		body.extend_from_slice(b"\r\n");
	}
	body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

	Request::builder()
		.method("POST")
		.uri(uri)
		.header(
			header::CONTENT_TYPE,
			format!("multipart/form-data; boundary={BOUNDARY}"),
		)
		.body(Body::from(body))
		.unwrap()
}

fn get(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn saved_uploads(dir: &Path) -> usize {
	std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn analyze_returns_the_categories() {
	let app = TestApp::classifying_as(18);

	let (status, json) = app
		.send_json(multipart("/analyze", &[("image", Some("bottle.jpg"), &jpeg())]))
		.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json, json!({ "categories": ["Recyclable"] }));
	assert_eq!(saved_uploads(&app.upload_dir()), 1);

	// Analyzed uploads are cached under their saved name too
	let saved = std::fs::read_dir(app.upload_dir())
		.unwrap()
		.next()
		.unwrap()
		.unwrap()
		.file_name();
	let saved = saved.to_str().unwrap();

	let (status, cached) = app.send_json(get(&format!("/ml-results/{saved}"))).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(cached["predicted_class"], "plastic_bottles");
	assert_eq!(cached["filename"], saved);
}

#[tokio::test]
async fn analyze_without_image_falls_back_to_general_waste() {
	let app = TestApp::classifying_as(18);

	let (status, json) = app
		.send_json(multipart("/analyze", &[("file", Some("bottle.jpg"), &jpeg())]))
		.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(
		json,
		json!({ "error": "No image provided", "categories": ["general waste"] })
	);

	// Not multipart at all
	let (status, json) = app
		.send_json(
			Request::builder()
				.method("POST")
				.uri("/analyze")
				.body(Body::empty())
				.unwrap(),
		)
		.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error"], "No image provided");
}

#[tokio::test]
async fn analyze_failures_keep_the_fallback_categories() {
	let app = TestApp::classifying_as(18);

	let (status, json) = app
		.send_json(multipart(
			"/analyze",
			&[("image", Some("broken.png"), b"not an image")],
		))
		.await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json["categories"], json!(["general waste"]));
	assert!(json["error"].as_str().unwrap().contains("decode"));
}

#[tokio::test]
async fn upload_returns_the_full_result_and_caches_it() {
	let app = TestApp::classifying_as(8);

	let (status, json) = app
		.send_json(multipart(
			"/upload",
			&[
				("note", None, b"ignored"),
				("file", Some("Can.PNG"), &jpeg()),
			],
		))
		.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["success"], true);
	assert_eq!(json["predicted_class"], "glass waste");
	assert_eq!(json["functional_categories"], json!(["Recyclable"]));
	assert_eq!(json["categories"], json["functional_categories"]);
	assert!((json["confidence"].as_f64().unwrap() - 90.0).abs() < 1e-3);

	let filename = json["filename"].as_str().unwrap();
	assert!(filename.ends_with(".png"));
	assert!(app.upload_dir().join(filename).is_file());

	let (status, cached) = app.send_json(get(&format!("/ml-results/{filename}"))).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(cached, json);

	// The saved upload is served back as a static file
	let (status, bytes) = app.send(get(&format!("/uploads/{filename}"))).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(bytes, jpeg());
}

#[tokio::test]
async fn upload_rejects_bad_requests() {
	let app = TestApp::classifying_as(0);

	let (status, json) = app
		.send_json(multipart("/upload", &[("file", Some("notes.txt"), b"hello")]))
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json, json!({ "error": "Invalid file type" }));

	let (status, json) = app
		.send_json(multipart("/upload", &[("file", Some(""), b"")]))
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json, json!({ "error": "No file selected" }));

	let (status, json) = app
		.send_json(multipart("/upload", &[("image", Some("a.jpg"), &jpeg())]))
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json, json!({ "error": "No file provided" }));

	assert_eq!(saved_uploads(&app.upload_dir()), 0);
}

#[tokio::test]
async fn oversized_images_reach_the_pipeline() {
	let app = TestApp::with_upload_limit(
		ModelAdapter::new(Arc::new(Fixed(one_hot(0))), 1),
		1024,
	);

	// Over the image limit, but the multipart framing around it must not trip a 413
	let (status, json) = app
		.send_json(multipart("/upload", &[("file", Some("big.jpg"), &[0; 1500])]))
		.await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(json["error"].as_str().unwrap().contains("too large"));
}

#[tokio::test]
async fn unknown_results_are_not_found() {
	let app = TestApp::classifying_as(0);

	let (status, json) = app.send_json(get("/ml-results/unknown.jpg")).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(json, json!({ "error": "ML results not found" }));
}

#[tokio::test]
async fn missing_model_fails_every_request_without_saving() {
	let app = TestApp::new(ModelAdapter::unavailable("model file not found"));

	let (status, json) = app
		.send_json(multipart("/upload", &[("file", Some("a.jpg"), &jpeg())]))
		.await;
	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json, json!({ "error": "Model not loaded" }));

	let (status, json) = app
		.send_json(multipart("/analyze", &[("image", Some("a.jpg"), &jpeg())]))
		.await;
	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(
		json,
		json!({ "error": "Model not loaded", "categories": ["general waste"] })
	);

	assert_eq!(saved_uploads(&app.upload_dir()), 0);

	let (status, json) = app.send_json(get("/health")).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(json, json!({ "status": "ok", "model_loaded": false }));
}

#[tokio::test]
async fn health_reports_a_loaded_model() {
	let app = TestApp::classifying_as(0);

	let (status, json) = app.send_json(get("/health")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json, json!({ "status": "ok", "model_loaded": true }));
}

#[tokio::test]
async fn index_page_is_served() {
	let app = TestApp::classifying_as(0);

	let (status, bytes) = app.send(get("/")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(bytes, b"<h1>EcoScan</h1>");
}

#[tokio::test]
async fn cors_allows_any_origin() {
	let app = TestApp::classifying_as(0);

	let response = app
		.router
		.clone()
		.oneshot(
			Request::builder()
				.method("OPTIONS")
				.uri("/upload")
				.header(header::ORIGIN, "http://localhost:3000")
				.header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
				.header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
		"*"
	);
}
