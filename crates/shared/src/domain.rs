use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NonFiniteReading, UnknownSensorField};

pub const DEFAULT_PH: f64 = 6.5;
pub const DEFAULT_EC: f64 = 2.0;
pub const DEFAULT_TEMPERATURE_CELSIUS: f64 = 22.0;

/// Manually entered environment readings attached to one analysis attempt.
///
/// The nominal ranges (pH 0-14, EC 0-5 mS/cm, 10-40 °C) are input hints only;
/// nothing here rejects values outside them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub ph: f64,
    pub ec: f64,
    pub temperature: f64,
}

impl Default for SensorReading {
    fn default() -> Self {
        Self {
            ph: DEFAULT_PH,
            ec: DEFAULT_EC,
            temperature: DEFAULT_TEMPERATURE_CELSIUS,
        }
    }
}

impl SensorReading {
    pub fn get(&self, field: SensorField) -> f64 {
        match field {
            SensorField::Ph => self.ph,
            SensorField::Ec => self.ec,
            SensorField::Temperature => self.temperature,
        }
    }

    /// Leaves the reading untouched when `value` is not finite.
    pub fn set(&mut self, field: SensorField, value: f64) -> Result<(), NonFiniteReading> {
        if !value.is_finite() {
            return Err(NonFiniteReading {
                field: field.as_str(),
                value,
            });
        }
        match field {
            SensorField::Ph => self.ph = value,
            SensorField::Ec => self.ec = value,
            SensorField::Temperature => self.temperature = value,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorField {
    Ph,
    Ec,
    Temperature,
}

impl SensorField {
    pub const ALL: [SensorField; 3] = [SensorField::Ph, SensorField::Ec, SensorField::Temperature];

    pub fn as_str(self) -> &'static str {
        match self {
            SensorField::Ph => "ph",
            SensorField::Ec => "ec",
            SensorField::Temperature => "temperature",
        }
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorField {
    type Err = UnknownSensorField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ph" => Ok(SensorField::Ph),
            "ec" => Ok(SensorField::Ec),
            "temperature" | "temp" => Ok(SensorField::Temperature),
            other => Err(UnknownSensorField(other.to_string())),
        }
    }
}

/// `[x1, y1, x2, y2]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(value: BoundingBox) -> Self {
        [value.x1, value.y1, value.x2, value.y2]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Confidence as a whole percentage, the way reports display it.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

pub const DEFAULT_PRIORITY: &str = "normal";

/// Recommendation priority. Values the client does not know are kept verbatim
/// in `Other` instead of failing the whole document; a missing priority reads
/// as `Other("normal")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
    Other(String),
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Other(DEFAULT_PRIORITY.to_string())
    }
}

impl Priority {
    pub fn is_high(&self) -> bool {
        matches!(self, Priority::High)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            "low" => Priority::Low,
            _ => Priority::Other(value),
        }
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        match value {
            Priority::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionAnalysis {
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub summary: String,
    pub has_disease: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResult {
    #[serde(default)]
    pub query: String,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Diagnostic document returned by the analysis service. Held verbatim and
/// replaced wholesale by the next attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<VisionAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag: Option<RagResult>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub summary: String,
}

impl AnalysisResult {
    pub fn detections(&self) -> &[Detection] {
        self.vision
            .as_ref()
            .map(|vision| vision.detections.as_slice())
            .unwrap_or_default()
    }

    pub fn narrative(&self) -> Option<&str> {
        self.rag.as_ref().map(|rag| rag.answer.as_str())
    }
}

pub const DEFAULT_PLANT_TYPE: &str = "Tomato";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub plant_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlant {
    pub name: String,
    #[serde(rename = "type")]
    pub plant_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a follow-up conversation about a diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// State of one model backend. Fields beyond `status` differ per backend
/// (`model_path`, `host`, `models`, `error`, ...) and are kept as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub status: String,
    #[serde(flatten)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl ModelState {
    pub fn error(&self) -> Option<&str> {
        self.details.get("error").and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsStatus {
    pub yolo: ModelState,
    pub ollama: ModelState,
}
