//! Client core for the plant health diagnostic service: attempt state
//! machine, report derivation, follow-up chat, and the HTTP contract with the
//! service.

pub mod controller;
pub mod conversation;
pub mod greenhouse;
pub mod preview;
pub mod report;
pub mod service;
pub mod submission;
pub mod upload;

pub use controller::{Completion, PendingAnalysis, SubmissionController};
pub use conversation::Conversation;
pub use greenhouse::Greenhouse;
pub use preview::{PreviewId, PreviewRegistry};
pub use report::{health_score, DiagnosticReport, ScoreTier};
pub use service::{AnalysisService, ChatService, PlantRegistry, ServiceClient, ServiceError};
pub use submission::{
    transition, AnalysisRequest, AttemptEvent, AttemptPhase, AttemptState, AttemptTicket, Effect,
    PhaseKind, SelectedImage, Transition,
};
pub use upload::{ImageCandidate, UploadPolicy, ValidationError};
