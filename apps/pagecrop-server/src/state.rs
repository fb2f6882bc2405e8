//! Application state for the pagecrop server
//!
//! Nothing here is mutable: every request loads and owns its own document,
//! so concurrent sessions never share engine state.

use std::sync::Arc;

use pagecrop_core::{FormatConverter, Rasterizer};

#[derive(Clone)]
pub struct AppState {
    /// Upper bound for one blocking engine/tool call, in milliseconds
    pub timeout_ms: u64,
    /// Request body limit in bytes (base64 payloads included)
    pub max_body_bytes: usize,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub converter: Arc<dyn FormatConverter>,
}
