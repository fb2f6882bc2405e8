//! API handlers for the pagecrop server
//!
//! Handlers decode the payload, run the synchronous engine on the blocking
//! pool under the configured timeout, and encode the result. Documents and
//! images live only for the duration of one handler call.

use std::time::{Duration, Instant};

use axum::{extract::State, Json};
use pagecrop_core::command::{decode_base64, encode_base64};
use pagecrop_core::preview::{decode_image, encode_png};
use pagecrop_core::{
    inspect, project_preview, validate, validate_pages, CropRect, DocumentInfo,
    DrawingFormat, PageCropError, PageRect, PageValidation, ProcessMetrics, ProcessResult,
    TransformRequest,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ServerError;
use crate::state::AppState;

/// Run a blocking engine call with the request timeout
async fn run_blocking<T, F>(timeout_ms: u64, task: F) -> Result<T, ServerError>
where
    F: FnOnce() -> Result<T, PageCropError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        tokio::task::spawn_blocking(task),
    )
    .await;

    match result {
        Ok(Ok(output)) => output.map_err(ServerError::from),
        Ok(Err(join_error)) => Err(ServerError::Internal(format!(
            "Worker task failed: {}",
            join_error
        ))),
        Err(_timeout) => Err(ServerError::Timeout(timeout_ms)),
    }
}

fn decode_payload(data: &str, what: &str) -> Result<Vec<u8>, ServerError> {
    decode_base64(data)
        .map_err(|e| ServerError::InvalidRequest(format!("{} is not valid base64: {}", what, e)))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pagecrop-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Request body carrying a base64-encoded PDF
#[derive(Deserialize)]
pub struct DocumentRequest {
    pub data: String,
}

#[derive(Serialize)]
pub struct InspectResponse {
    pub success: bool,
    #[serde(flatten)]
    pub info: DocumentInfo,
}

/// Handler: POST /api/inspect
pub async fn handle_inspect(
    State(state): State<AppState>,
    Json(req): Json<DocumentRequest>,
) -> Result<Json<InspectResponse>, ServerError> {
    let bytes = decode_payload(&req.data, "data")?;
    info!("Inspect request: {} bytes", bytes.len());

    let info = run_blocking(state.timeout_ms, move || inspect(&bytes)).await?;

    Ok(Json(InspectResponse {
        success: true,
        info,
    }))
}

/// Crop rectangle checked against a bare page size
#[derive(Deserialize)]
pub struct ValidateRequest {
    pub crop: CropRect,
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub valid: bool,
    pub error: Option<String>,
}

/// Handler: POST /api/validate
///
/// Pure and cheap; called on every slider move.
pub async fn handle_validate(Json(req): Json<ValidateRequest>) -> Json<ValidateResponse> {
    let error = validate(&req.crop, &PageRect::new(req.width, req.height))
        .err()
        .map(|e| e.to_string());
    debug!("Validate {:?} against {}x{}: {:?}", req.crop, req.width, req.height, error);

    Json(ValidateResponse {
        success: true,
        valid: error.is_none(),
        error,
    })
}

#[derive(Deserialize)]
pub struct ValidateDocumentRequest {
    pub data: String,
    pub crop: CropRect,
}

#[derive(Serialize)]
pub struct ValidateDocumentResponse {
    pub success: bool,
    /// True when the crop fits every page
    pub valid: bool,
    pub pages: Vec<PageValidation>,
}

/// Handler: POST /api/validate-document
pub async fn handle_validate_document(
    State(state): State<AppState>,
    Json(req): Json<ValidateDocumentRequest>,
) -> Result<Json<ValidateDocumentResponse>, ServerError> {
    let bytes = decode_payload(&req.data, "data")?;
    let crop = req.crop;

    let pages = run_blocking(state.timeout_ms, move || validate_pages(&bytes, &crop)).await?;

    Ok(Json(ValidateDocumentResponse {
        success: true,
        valid: pages.iter().all(|p| p.valid),
        pages,
    }))
}

/// PNG image response shared by rasterize and preview
#[derive(Serialize)]
pub struct ImageResponse {
    pub success: bool,
    /// Base64-encoded PNG
    pub data: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Deserialize)]
pub struct RasterizeRequest {
    pub data: String,
    /// Zero-based page index
    #[serde(default)]
    pub page_index: usize,
}

/// Handler: POST /api/rasterize
pub async fn handle_rasterize(
    State(state): State<AppState>,
    Json(req): Json<RasterizeRequest>,
) -> Result<Json<ImageResponse>, ServerError> {
    let bytes = decode_payload(&req.data, "data")?;
    let page_index = req.page_index;
    info!("Rasterize request: page {} of {} bytes", page_index, bytes.len());

    let rasterizer = state.rasterizer.clone();
    let (png, width, height) = run_blocking(state.timeout_ms, move || {
        let image = rasterizer.rasterize(&bytes, page_index)?;
        let png = encode_png(&image)?;
        Ok((png, image.width(), image.height()))
    })
    .await?;

    Ok(Json(ImageResponse {
        success: true,
        data: encode_base64(&png),
        width,
        height,
    }))
}

#[derive(Deserialize)]
pub struct PreviewRequest {
    /// Base64-encoded page image (PNG or any format the decoder knows)
    pub image: String,
    pub crop: CropRect,
    pub scale: f64,
}

/// Handler: POST /api/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<ImageResponse>, ServerError> {
    let bytes = decode_payload(&req.image, "image")?;
    let (crop, scale) = (req.crop, req.scale);
    debug!("Preview request: crop {:?} at scale {}", crop, scale);

    let (png, width, height) = run_blocking(state.timeout_ms, move || {
        let image = decode_image(&bytes)?;
        let preview = project_preview(&image, &crop, scale)?;
        let png = encode_png(&preview)?;
        Ok((png, preview.width(), preview.height()))
    })
    .await?;

    Ok(Json(ImageResponse {
        success: true,
        data: encode_base64(&png),
        width,
        height,
    }))
}

/// Transform body; `data` is decoded here so bad base64 gets the JSON error
#[derive(Deserialize)]
pub struct TransformBody {
    pub data: String,
    pub crop: CropRect,
    pub scale: f64,
}

/// Handler: POST /api/transform
pub async fn handle_transform(
    State(state): State<AppState>,
    Json(body): Json<TransformBody>,
) -> Result<Json<ProcessResult>, ServerError> {
    let req = TransformRequest {
        document: decode_payload(&body.data, "data")?,
        crop: body.crop,
        scale: body.scale,
    };
    info!(
        "Transform request: {} bytes, crop {:?}, scale {}",
        req.document.len(),
        req.crop,
        req.scale
    );

    let started = Instant::now();
    let input_size_bytes = req.document.len();
    let output = run_blocking(state.timeout_ms, move || {
        pagecrop_core::transform::apply(&req)
    })
    .await?;

    let metrics = ProcessMetrics {
        input_size_bytes,
        output_size_bytes: output.bytes.len(),
        page_count: output.pages.len() as u32,
        processing_time_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        "Transform complete: {} pages in {}ms",
        metrics.page_count, metrics.processing_time_ms
    );

    Ok(Json(ProcessResult {
        success: true,
        data: Some(encode_base64(&output.bytes)),
        error: None,
        pages: Some(output.pages),
        metrics: Some(metrics),
    }))
}

#[derive(Deserialize)]
pub struct ConvertRequest {
    pub data: String,
    pub format: DrawingFormat,
}

#[derive(Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    /// Base64-encoded PDF
    pub data: String,
    pub page_count: usize,
    pub size_bytes: usize,
}

/// Handler: POST /api/convert
pub async fn handle_convert(
    State(state): State<AppState>,
    Json(req): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>, ServerError> {
    let bytes = decode_payload(&req.data, "data")?;
    let format = req.format;
    info!(
        "Convert request: {} bytes of {}",
        bytes.len(),
        format.extension()
    );

    let converter = state.converter.clone();
    let (pdf, info) = run_blocking(state.timeout_ms, move || {
        let pdf = converter.convert(&bytes, format)?;
        // The converter's output must open like any other upload
        let info = inspect(&pdf)?;
        Ok((pdf, info))
    })
    .await?;

    Ok(Json(ConvertResponse {
        success: true,
        data: encode_base64(&pdf),
        page_count: info.page_count,
        size_bytes: pdf.len(),
    }))
}
