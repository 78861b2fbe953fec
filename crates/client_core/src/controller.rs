//! Owns one attempt and carries out the effects of its transitions.
//!
//! The driver never times out or cancels a request. A response that arrives
//! after the user picked another image or reset is dropped by ticket.

use std::sync::Arc;

use shared::{
    domain::{AnalysisResult, SensorField},
    error::NonFiniteReading,
};
use tracing::{debug, info, warn};

use crate::{
    preview::PreviewRegistry,
    report::DiagnosticReport,
    service::{AnalysisService, ServiceError},
    submission::{
        transition, AnalysisRequest, AttemptEvent, AttemptState, AttemptTicket, Effect, PhaseKind,
        SelectedImage, Transition,
    },
    upload::{ImageCandidate, UploadPolicy, ValidationError},
};

/// A dispatched request that has not been awaited yet.
pub struct PendingAnalysis<S: AnalysisService + ?Sized> {
    service: Arc<S>,
    request: AnalysisRequest,
}

impl<S: AnalysisService + ?Sized> PendingAnalysis<S> {
    pub fn ticket(&self) -> AttemptTicket {
        self.request.ticket
    }

    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    pub async fn send(self) -> Completion {
        let Self { service, request } = self;
        let ticket = request.ticket;
        let outcome = service.analyze(request).await;
        Completion { ticket, outcome }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub ticket: AttemptTicket,
    pub outcome: Result<AnalysisResult, ServiceError>,
}

impl Completion {
    pub fn into_event(self) -> AttemptEvent {
        match self.outcome {
            Ok(result) => AttemptEvent::AnalysisSucceeded {
                ticket: self.ticket,
                result: Box::new(result),
            },
            Err(err) => AttemptEvent::AnalysisFailed {
                ticket: self.ticket,
                message: err.to_string(),
            },
        }
    }
}

pub struct SubmissionController<S: AnalysisService + ?Sized> {
    service: Arc<S>,
    policy: UploadPolicy,
    previews: PreviewRegistry,
    state: AttemptState,
}

impl<S: AnalysisService + ?Sized> SubmissionController<S> {
    pub fn new(service: Arc<S>, policy: UploadPolicy, attach_sensors: bool) -> Self {
        Self {
            service,
            policy,
            previews: PreviewRegistry::new(),
            state: AttemptState::new(attach_sensors),
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn phase(&self) -> PhaseKind {
        self.state.kind()
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.state.preview().and_then(|id| self.previews.url(id))
    }

    pub fn live_previews(&self) -> usize {
        self.previews.live()
    }

    pub fn report(&self) -> Option<DiagnosticReport<'_>> {
        self.state.result().map(DiagnosticReport::derive)
    }

    /// Handles a drop or picker selection. Rejections leave the phase alone
    /// and are surfaced through the state's notice as well as the return.
    pub fn drop_files(&mut self, files: Vec<ImageCandidate>) -> Result<(), ValidationError> {
        match self.policy.accept(files) {
            Ok(candidate) => {
                let mime_type = candidate.mime_type.clone().unwrap_or_default();
                let preview = self.previews.create(&mime_type, &candidate.bytes);
                info!(
                    file = %candidate.file_name,
                    size_bytes = candidate.size(),
                    previous_phase = %self.phase(),
                    "image selected"
                );
                let image = SelectedImage::from_candidate(candidate, preview);
                self.apply(AttemptEvent::ImageAccepted(image));
                Ok(())
            }
            Err(err) => {
                warn!("image rejected: {err}");
                self.apply(AttemptEvent::ImageRejected(err.clone()));
                Err(err)
            }
        }
    }

    pub fn select_image(&mut self, candidate: ImageCandidate) -> Result<(), ValidationError> {
        self.drop_files(vec![candidate])
    }

    /// A non-finite value keeps the previous reading and sets the notice.
    pub fn update_sensor_data(
        &mut self,
        field: SensorField,
        value: f64,
    ) -> Result<(), NonFiniteReading> {
        let mut scratch = self.state.sensors;
        let checked = scratch.set(field, value);
        if let Err(err) = &checked {
            warn!("sensor reading rejected: {err}");
        }
        self.apply(AttemptEvent::SensorUpdated { field, value });
        checked
    }

    pub fn set_query(&mut self, query: Option<String>) {
        self.apply(AttemptEvent::QueryUpdated(query));
    }

    /// Returns `None` unless an image is selected and nothing is in flight.
    pub fn start_analysis(&mut self) -> Option<PendingAnalysis<S>> {
        let Some(request) = self.apply(AttemptEvent::StartAnalysis) else {
            debug!(phase = %self.phase(), "start analysis ignored");
            return None;
        };
        Some(PendingAnalysis {
            service: Arc::clone(&self.service),
            request,
        })
    }

    /// Applies a finished request. Returns whether it belonged to the live
    /// attempt.
    pub fn complete(&mut self, completion: Completion) -> bool {
        let ticket = completion.ticket;
        if !self.state.is_current(ticket) {
            info!(
                ticket = ticket.0,
                phase = %self.phase(),
                "discarding response for a superseded attempt"
            );
            return false;
        }
        if let Err(err) = &completion.outcome {
            warn!(ticket = ticket.0, "analysis failed: {err}");
        }
        self.apply(completion.into_event());
        info!(ticket = ticket.0, phase = %self.phase(), "analysis finished");
        true
    }

    /// Starts the request, waits for it, and applies the outcome.
    pub async fn analyze(&mut self) -> PhaseKind {
        if let Some(pending) = self.start_analysis() {
            let completion = pending.send().await;
            self.complete(completion);
        }
        self.phase()
    }

    pub fn reset(&mut self) {
        debug!(phase = %self.phase(), "resetting attempt");
        self.apply(AttemptEvent::Reset);
    }

    fn apply(&mut self, event: AttemptEvent) -> Option<AnalysisRequest> {
        let current = std::mem::take(&mut self.state);
        let Transition { state, effects } = transition(current, event);
        self.state = state;

        let mut dispatched = None;
        for effect in effects {
            match effect {
                Effect::ReleasePreview(id) => {
                    self.previews.release(id);
                }
                Effect::Dispatch(request) => dispatched = Some(request),
            }
        }
        dispatched
    }
}

impl<S: AnalysisService + ?Sized> Drop for SubmissionController<S> {
    fn drop(&mut self) {
        let released = self.previews.release_all();
        if released > 0 {
            debug!(released, "released previews on teardown");
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
