use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

use crate::geometry::{CropRect, PageGeometry};

/// One "apply" action: the document plus the crop and scale chosen for it
#[derive(Debug, Clone, Deserialize)]
pub struct TransformRequest {
    /// Source PDF, base64-encoded on the wire
    #[serde(rename = "data", deserialize_with = "from_base64")]
    pub document: Vec<u8>,
    pub crop: CropRect,
    pub scale: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    /// Base64-encoded PDF data
    pub data: Option<String>,
    pub error: Option<String>,
    /// Boxes written to each output page
    pub pages: Option<Vec<PageGeometry>>,
    pub metrics: Option<ProcessMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: u32,
    pub processing_time_ms: u64,
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(data.trim())
}

fn from_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    decode_base64(&encoded).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_base64_document() {
        let json = r#"{"data":"JVBERi0xLjc=","crop":{"left":1,"top":2,"right":3,"bottom":4},"scale":1.5}"#;
        let request: TransformRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.document, b"%PDF-1.7".to_vec());
        assert_eq!(request.crop, CropRect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(request.scale, 1.5);
    }

    #[test]
    fn test_request_rejects_bad_base64() {
        let json = r#"{"data":"%%%","crop":{"left":1,"top":2,"right":3,"bottom":4},"scale":1.0}"#;
        let result: Result<TransformRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
