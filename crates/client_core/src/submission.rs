//! Attempt state machine: one image, optional readings, at most one request.
//!
//! `transition` is pure. Anything that touches the outside world (network,
//! preview handles) is returned as an [`Effect`] for the caller to perform.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared::domain::{AnalysisResult, SensorField, SensorReading};

use crate::{
    preview::PreviewId,
    upload::{ImageCandidate, ValidationError},
};

pub const GENERIC_FAILURE_MESSAGE: &str = "analysis failed for an unknown reason";

/// Identifies the request issued for one particular image selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptTicket(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedImage {
    pub file_name: String,
    pub mime_type: String,
    #[serde(with = "bytes_b64")]
    pub bytes: Vec<u8>,
    pub preview: PreviewId,
}

impl SelectedImage {
    pub fn from_candidate(candidate: ImageCandidate, preview: PreviewId) -> Self {
        Self {
            file_name: candidate.file_name,
            mime_type: candidate.mime_type.unwrap_or_default(),
            bytes: candidate.bytes,
            preview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum AttemptPhase {
    Idle,
    ImageSelected {
        image: SelectedImage,
    },
    Analyzing {
        image: SelectedImage,
        ticket: AttemptTicket,
    },
    Succeeded {
        image: SelectedImage,
        result: Box<AnalysisResult>,
    },
    Failed {
        image: SelectedImage,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Idle,
    ImageSelected,
    Analyzing,
    Succeeded,
    Failed,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseKind::Idle => "idle",
            PhaseKind::ImageSelected => "image_selected",
            PhaseKind::Analyzing => "analyzing",
            PhaseKind::Succeeded => "succeeded",
            PhaseKind::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl AttemptPhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            AttemptPhase::Idle => PhaseKind::Idle,
            AttemptPhase::ImageSelected { .. } => PhaseKind::ImageSelected,
            AttemptPhase::Analyzing { .. } => PhaseKind::Analyzing,
            AttemptPhase::Succeeded { .. } => PhaseKind::Succeeded,
            AttemptPhase::Failed { .. } => PhaseKind::Failed,
        }
    }

    pub fn image(&self) -> Option<&SelectedImage> {
        match self {
            AttemptPhase::Idle => None,
            AttemptPhase::ImageSelected { image }
            | AttemptPhase::Analyzing { image, .. }
            | AttemptPhase::Succeeded { image, .. }
            | AttemptPhase::Failed { image, .. } => Some(image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptState {
    pub phase: AttemptPhase,
    pub sensors: SensorReading,
    pub attach_sensors: bool,
    pub query: Option<String>,
    pub generation: u64,
    /// Last rejected image or reading, shown until the next accepted image or reset.
    pub notice: Option<String>,
}

impl Default for AttemptState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AttemptState {
    pub fn new(attach_sensors: bool) -> Self {
        Self {
            phase: AttemptPhase::Idle,
            sensors: SensorReading::default(),
            attach_sensors,
            query: None,
            generation: 0,
            notice: None,
        }
    }

    pub fn kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    pub fn image(&self) -> Option<&SelectedImage> {
        self.phase.image()
    }

    pub fn preview(&self) -> Option<PreviewId> {
        self.image().map(|image| image.preview)
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.phase {
            AttemptPhase::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            AttemptPhase::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> Option<AttemptTicket> {
        match &self.phase {
            AttemptPhase::Analyzing { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }

    pub fn can_start_analysis(&self) -> bool {
        matches!(self.phase, AttemptPhase::ImageSelected { .. })
    }

    /// Whether a completion for `ticket` would still be applied.
    pub fn is_current(&self, ticket: AttemptTicket) -> bool {
        self.in_flight() == Some(ticket)
    }
}

/// Outbound submission built from the state at the moment analysis starts.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub ticket: AttemptTicket,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub sensors: Option<SensorReading>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptEvent {
    ImageAccepted(SelectedImage),
    ImageRejected(ValidationError),
    SensorUpdated { field: SensorField, value: f64 },
    QueryUpdated(Option<String>),
    StartAnalysis,
    AnalysisSucceeded {
        ticket: AttemptTicket,
        result: Box<AnalysisResult>,
    },
    AnalysisFailed {
        ticket: AttemptTicket,
        message: String,
    },
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Dispatch(AnalysisRequest),
    ReleasePreview(PreviewId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: AttemptState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: AttemptState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }
}

pub fn transition(mut state: AttemptState, event: AttemptEvent) -> Transition {
    let mut effects = Vec::new();

    match event {
        AttemptEvent::ImageAccepted(image) => {
            if let Some(previous) = state.preview() {
                if previous != image.preview {
                    effects.push(Effect::ReleasePreview(previous));
                }
            }
            state.generation += 1;
            state.notice = None;
            state.phase = AttemptPhase::ImageSelected { image };
        }
        AttemptEvent::ImageRejected(error) => {
            state.notice = Some(error.to_string());
        }
        AttemptEvent::SensorUpdated { field, value } => {
            if let Err(err) = state.sensors.set(field, value) {
                state.notice = Some(err.to_string());
            }
        }
        AttemptEvent::QueryUpdated(query) => {
            state.query = query
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty());
        }
        AttemptEvent::StartAnalysis => {
            let image = match state.phase {
                AttemptPhase::ImageSelected { image } => image,
                _ => return Transition::unchanged(state),
            };
            let ticket = AttemptTicket(state.generation);
            effects.push(Effect::Dispatch(AnalysisRequest {
                ticket,
                file_name: image.file_name.clone(),
                mime_type: image.mime_type.clone(),
                bytes: image.bytes.clone(),
                sensors: state.attach_sensors.then_some(state.sensors),
                query: state.query.clone(),
            }));
            state.phase = AttemptPhase::Analyzing { image, ticket };
        }
        AttemptEvent::AnalysisSucceeded { ticket, result } => {
            if !state.is_current(ticket) {
                return Transition::unchanged(state);
            }
            if let AttemptPhase::Analyzing { image, .. } = state.phase {
                state.phase = AttemptPhase::Succeeded { image, result };
            }
        }
        AttemptEvent::AnalysisFailed { ticket, message } => {
            if !state.is_current(ticket) {
                return Transition::unchanged(state);
            }
            let message = if message.trim().is_empty() {
                GENERIC_FAILURE_MESSAGE.to_string()
            } else {
                message
            };
            if let AttemptPhase::Analyzing { image, .. } = state.phase {
                state.phase = AttemptPhase::Failed { image, message };
            }
        }
        AttemptEvent::Reset => {
            if let Some(previous) = state.preview() {
                effects.push(Effect::ReleasePreview(previous));
            }
            state = AttemptState {
                generation: state.generation + 1,
                ..AttemptState::new(state.attach_sensors)
            };
        }
    }

    Transition { state, effects }
}

mod bytes_b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
