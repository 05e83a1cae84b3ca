//! Otosearch API server
//!
//! HTTP API for car make/model/year recognition: accepts a photograph,
//! returns the top-3 predictions, a Grad-CAM heatmap overlay and the
//! looked-up specification record.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use otosearch_core::{ClassLabels, PipelineConfig};
use otosearch_specs::{RedisSpecStore, SpecStore};
use otosearch_vision::{CarClassifierConfig, CarPredictor, RecognitionPipeline};

use crate::state::{AppState, SharedState};

/// Otosearch API server
#[derive(Parser, Debug)]
#[command(name = "otosearch-server")]
#[command(version)]
#[command(about = "HTTP API for car make/model/year recognition")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Path to the frozen model record (.mpk)
    #[arg(long, env = "OTOSEARCH_MODEL")]
    model: PathBuf,

    /// Path to the class label table (JSON array, index = class id)
    #[arg(long, env = "OTOSEARCH_LABELS")]
    labels: PathBuf,

    /// Redis URL for the specification store (optional)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Model input size in pixels
    #[arg(long, default_value = "224")]
    image_size: u32,

    /// Maximum upload size in megabytes
    #[arg(long, default_value = "16")]
    max_upload_mb: usize,
}

/// Build the application router around shared state.
fn app(state: SharedState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/predict", post(routes::predict::predict))
        .route("/health", get(routes::health::health_check))
        .route("/specs/{label}", get(routes::specs::get_specs))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    info!("Otosearch server v{}", env!("CARGO_PKG_VERSION"));

    // Startup preconditions: the label table and the model artifact must
    // both load, or the process refuses to start.
    let labels = ClassLabels::from_json_file(&cli.labels)
        .with_context(|| format!("loading class labels from {}", cli.labels.display()))?;
    info!("Loaded {} class labels", labels.len());

    let model_config = CarClassifierConfig::new()
        .with_num_classes(labels.len())
        .with_input_size(cli.image_size as usize);
    let predictor = CarPredictor::load(&cli.model, &model_config)
        .with_context(|| format!("loading model from {}", cli.model.display()))?;
    info!(
        "Model loaded: {} classes on {}",
        predictor.num_classes(),
        otosearch_vision::backend::backend_name()
    );

    let pipeline = RecognitionPipeline::new(
        predictor,
        labels,
        PipelineConfig::default().with_image_size(cli.image_size),
    )
    .context("assembling recognition pipeline")?;

    // The spec store is best-effort: without it every lookup uses the
    // label-derived fallback record.
    let store: Option<Arc<dyn SpecStore>> = match &cli.redis_url {
        Some(url) => match RedisSpecStore::new(url).await {
            Ok(store) => {
                info!("Connected to spec store ({})", store.backend_name());
                Some(Arc::new(store))
            }
            Err(e) => {
                warn!("Spec store unavailable ({}); using label fallback", e);
                None
            }
        },
        None => {
            info!("No spec store configured; using label fallback");
            None
        }
    };

    let state = Arc::new(AppState::new(pipeline, store));
    let app = app(state, cli.max_upload_mb * 1024 * 1024);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .context("invalid host/port")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
