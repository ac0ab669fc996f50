use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use es_ai::{ClassificationPipeline, LabelCatalog, ModelAdapter, ResultStore};
use es_server::{create_router, AppState, Cli};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::registry()
		.with(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "es_server=info,es_ai=info,tower_http=info".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let config = Cli::parse().into_config()?;

	tokio::fs::create_dir_all(&config.upload_dir)
		.await
		.with_context(|| {
			format!(
				"Unable to create upload directory '{}'",
				config.upload_dir.display()
			)
		})?;

	let model_options = config.model_options();
	for candidate in &model_options.candidates {
		info!(path = %candidate.display(), "Model candidate");
	}

	let model = ModelAdapter::load(model_options).await;
	if !model.is_available() {
		if config.require_model {
			bail!("Application cannot start because the model failed to load");
		}
		warn!(
			reason = model.unavailable_reason().unwrap_or_default(),
			"Starting without a model, classification requests will fail"
		);
	}

	let store = config
		.result_store_capacity
		.map_or_else(ResultStore::new, ResultStore::with_capacity);

	let pipeline = ClassificationPipeline::new(
		Arc::new(LabelCatalog::ecoscan()),
		model,
		store,
		config.upload_dir.clone(),
	)
	.with_maximum_upload_size(config.max_upload_size);

	let app = create_router(AppState::new(pipeline), &config);

	let listener = TcpListener::bind((config.host.as_str(), config.port))
		.await
		.with_context(|| format!("Unable to bind {}:{}", config.host, config.port))?;

	info!("Listening on http://{}", listener.local_addr()?);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	info!("Server stopped");

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			warn!("Failed to listen for Ctrl+C: {e:#?}");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(e) => {
				warn!("Failed to listen for SIGTERM: {e:#?}");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => info!("Received Ctrl+C, shutting down..."),
		() = terminate => info!("Received SIGTERM, shutting down..."),
	}
}
