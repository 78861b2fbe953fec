use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error envelope returned by the analysis service: `{"detail": ...}`.
///
/// `detail` is usually a string, but request validation failures carry a
/// structured list, so it is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: serde_json::Value,
}

impl ApiErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match &self.detail {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) if text.trim().is_empty() => None,
            serde_json::Value::String(text) => Some(text.trim().to_string()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sensor field '{0}' (expected ph, ec or temperature)")]
pub struct UnknownSensorField(pub String);

/// NaN and infinities cannot be sent as readings or kept in serialized state.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{field} must be a finite number, got {value}")]
pub struct NonFiniteReading {
    pub field: &'static str,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_text_flattens_string_and_structured_details() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"detail":"File too large"}"#).expect("decode");
        assert_eq!(body.detail_text().as_deref(), Some("File too large"));

        let body: ApiErrorBody =
            serde_json::from_str(r#"{"detail":[{"loc":["body","file"],"msg":"field required"}]}"#)
                .expect("decode");
        let text = body.detail_text().expect("structured detail");
        assert!(text.contains("field required"));

        let body: ApiErrorBody = serde_json::from_str(r#"{"detail":"  "}"#).expect("decode");
        assert_eq!(body.detail_text(), None);
    }
}
