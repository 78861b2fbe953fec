use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, SensorReading};

pub const ANALYZE_ROUTE: &str = "/api/v1/analyze";
pub const CHAT_ROUTE: &str = "/api/v1/chat";
pub const MODELS_STATUS_ROUTE: &str = "/api/v1/models/status";
pub const PLANTS_ROUTE: &str = "/api/v1/plants/";
pub const HEALTH_ROUTE: &str = "/health";

/// Multipart field names of the analysis submission.
pub const FILE_FIELD: &str = "file";
pub const SENSOR_DATA_FIELD: &str = "sensor_data";
pub const QUERY_FIELD: &str = "query";

/// JSON object carried in the `sensor_data` multipart field. The service
/// expects every value as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorDataForm {
    pub ph: String,
    pub ec: String,
    pub temperature: String,
}

/// Whole numbers keep one decimal place (`2.0`, not `2`).
fn form_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl From<&SensorReading> for SensorDataForm {
    fn from(value: &SensorReading) -> Self {
        Self {
            ph: form_value(value.ph),
            ec: form_value(value.ec),
            temperature: form_value(value.temperature),
        }
    }
}

impl SensorDataForm {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Body of `POST /api/v1/chat`. `image_id` ties the question to an earlier
/// analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_form_sends_values_as_strings() {
        let reading = SensorReading {
            ph: 6.5,
            ec: 1.25,
            temperature: 22.0,
        };
        let json = SensorDataForm::from(&reading).to_json().expect("encode");
        let value: serde_json::Value = serde_json::from_str(&json).expect("decode");
        assert_eq!(
            value,
            serde_json::json!({"ph": "6.5", "ec": "1.25", "temperature": "22.0"})
        );

        let defaults = SensorDataForm::from(&SensorReading::default());
        assert_eq!(defaults.ec, "2.0");
        assert_eq!(defaults.temperature, "22.0");
    }

    #[test]
    fn chat_request_omits_missing_image_id() {
        let body = serde_json::to_value(ChatRequest {
            message: "Is it contagious?".into(),
            history: Vec::new(),
            image_id: None,
        })
        .expect("encode");
        assert_eq!(
            body,
            serde_json::json!({"message": "Is it contagious?", "history": []})
        );

        let reply: ChatResponse =
            serde_json::from_str(r#"{"message":"Yes, via spores."}"#).expect("decode");
        assert!(reply.sources.is_empty());
    }
}
