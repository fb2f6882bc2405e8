//! pagecrop server
//!
//! Backend for the interactive crop-and-scale tool. Every user interaction
//! maps to one request:
//!
//! - Document inspection (page sizes for slider bounds)
//! - Crop validation, per page or for a bare page size
//! - Page rasterization and preview projection
//! - The transform itself, returning the rewritten PDF
//! - DWG/DXF conversion through an external converter

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use pagecrop_core::convert::ODA_ARGS;
use pagecrop_core::rasterize::DEFAULT_DPI;
use pagecrop_core::{CommandConverter, PdftoppmRasterizer};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod state;

use api::{
    handle_convert, handle_health, handle_inspect, handle_preview, handle_rasterize,
    handle_transform, handle_validate, handle_validate_document,
};
use state::AppState;

/// Command-line arguments for the pagecrop server
#[derive(Parser, Debug)]
#[command(name = "pagecrop-server")]
#[command(version, about = "Interactive PDF crop and scale service")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PAGECROP_PORT", default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "PAGECROP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Timeout for one transform, conversion or rasterization in milliseconds
    #[arg(long, env = "PAGECROP_TIMEOUT_MS", default_value = "30000")]
    timeout_ms: u64,

    /// Largest accepted upload in megabytes (before base64 encoding)
    #[arg(long, env = "PAGECROP_MAX_UPLOAD_MB", default_value = "50")]
    max_upload_mb: usize,

    /// Rate limit: requests per second per IP
    #[arg(long, env = "PAGECROP_RATE_LIMIT", default_value = "10")]
    rate_limit: u32,

    /// pdftoppm executable used to render previews
    #[arg(long, env = "PAGECROP_PDFTOPPM", default_value = "pdftoppm")]
    pdftoppm: PathBuf,

    /// Preview resolution; 72 keeps one pixel per PDF point
    #[arg(long, env = "PAGECROP_DPI", default_value_t = DEFAULT_DPI)]
    dpi: u32,

    /// Drawing converter executable
    #[arg(long, env = "PAGECROP_CONVERTER", default_value = "ODAFileConverter")]
    converter: PathBuf,

    /// Converter arguments, whitespace separated. Placeholders: {input},
    /// {input_dir}, {output_dir}, {stem}
    #[arg(long, env = "PAGECROP_CONVERTER_ARGS")]
    converter_args: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_state(self) -> AppState {
        let converter_args = match &self.converter_args {
            Some(args) => args.split_whitespace().map(str::to_string).collect(),
            None => ODA_ARGS.iter().map(|s| s.to_string()).collect(),
        };

        AppState {
            timeout_ms: self.timeout_ms,
            max_body_bytes: body_limit(self.max_upload_mb),
            rasterizer: Arc::new(PdftoppmRasterizer::new(self.pdftoppm, self.dpi)),
            converter: Arc::new(CommandConverter::new(self.converter, converter_args)),
        }
    }
}

/// Body limit for an upload of `max_upload_mb` once base64-encoded into JSON
fn body_limit(max_upload_mb: usize) -> usize {
    let raw = max_upload_mb * 1024 * 1024;
    raw / 3 * 4 + 64 * 1024
}

/// Routes and middleware shared by the binary and the tests
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // API endpoints
        .route("/api/inspect", post(handle_inspect))
        .route("/api/validate", post(handle_validate))
        .route("/api/validate-document", post(handle_validate_document))
        .route("/api/rasterize", post(handle_rasterize))
        .route("/api/preview", post(handle_preview))
        .route("/api/transform", post(handle_transform))
        .route("/api/convert", post(handle_convert))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let rate_limit = args.rate_limit;
    info!("Starting pagecrop server on {}", addr);
    info!("Rasterizer: {} at {} dpi", args.pdftoppm.display(), args.dpi);
    info!("Converter: {}", args.converter.display());

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(rate_limit.into())
            .burst_size(rate_limit * 2)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit: {}", rate_limit))?,
    );

    let state = args.into_state();
    info!("Operation timeout: {}ms", state.timeout_ms);

    let app = router(state).layer(GovernorLayer {
        config: governor_conf,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", rate_limit);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
