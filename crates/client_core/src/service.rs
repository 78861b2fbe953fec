//! HTTP contract with the analysis and plant registry services.

use std::error::Error as _;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{AnalysisResult, HealthStatus, ModelsStatus, NewPlant, Plant},
    error::ApiErrorBody,
    protocol::{
        ChatRequest, ChatResponse, SensorDataForm, ANALYZE_ROUTE, CHAT_ROUTE, FILE_FIELD,
        HEALTH_ROUTE, MODELS_STATUS_ROUTE, PLANTS_ROUTE, QUERY_FIELD, SENSOR_DATA_FIELD,
    },
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::submission::AnalysisRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("invalid service url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("could not build request: {0}")]
    Request(String),
    #[error("could not reach service: {0}")]
    Transport(String),
    #[error("service returned {status}{}{}", reason_suffix(.reason), detail_suffix(.detail))]
    Status {
        status: u16,
        reason: String,
        detail: Option<String>,
    },
    #[error("malformed response from service: {0}")]
    Decode(String),
}

fn reason_suffix(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(" {reason}")
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(": {detail}"),
        None => String::new(),
    }
}

impl ServiceError {
    /// Prefers the `detail` of a JSON error envelope, then the raw body text.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|envelope| envelope.detail_text())
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            });
        Self::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            detail,
        }
    }

    fn transport(err: reqwest::Error) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Transport(message)
    }
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, ServiceError>;
}

#[async_trait]
pub trait PlantRegistry: Send + Sync {
    async fn list_plants(&self) -> Result<Vec<Plant>, ServiceError>;
    async fn create_plant(&self, plant: &NewPlant) -> Result<(), ServiceError>;
}

/// Follow-up questions about an analysis, answered by the assistant.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: Url,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        Self::with_http(Client::new(), base_url)
    }

    pub fn with_http(http: Client, base_url: &str) -> Result<Self, ServiceError> {
        let trimmed = base_url.trim();
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| ServiceError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidUrl {
                url: base_url.to_string(),
                reason: "url cannot be used as a base".to_string(),
            });
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Routes resolve below the base path, so a proxied base such as
    /// `http://host/proxy/` keeps its prefix.
    pub fn endpoint(&self, route: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(route.trim_start_matches('/'))
            .map_err(|e| ServiceError::InvalidUrl {
                url: format!("{}{route}", self.base_url),
                reason: e.to_string(),
            })
    }

    pub async fn health(&self) -> Result<HealthStatus, ServiceError> {
        self.get_json(HEALTH_ROUTE).await
    }

    pub async fn models_status(&self) -> Result<ModelsStatus, ServiceError> {
        self.get_json(MODELS_STATUS_ROUTE).await
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, ServiceError> {
        let response = self
            .http
            .get(self.endpoint(route)?)
            .send()
            .await
            .map_err(ServiceError::transport)?;
        read_json(response).await
    }
}

fn build_form(request: AnalysisRequest) -> Result<Form, ServiceError> {
    let file = Part::bytes(request.bytes)
        .file_name(request.file_name)
        .mime_str(&request.mime_type)
        .map_err(|e| ServiceError::Request(format!("invalid image mime type: {e}")))?;
    let mut form = Form::new().part(FILE_FIELD, file);

    if let Some(sensors) = &request.sensors {
        let encoded = SensorDataForm::from(sensors)
            .to_json()
            .map_err(|e| ServiceError::Request(format!("failed to encode sensor data: {e}")))?;
        form = form.text(SENSOR_DATA_FIELD, encoded);
    }
    if let Some(query) = request.query {
        form = form.text(QUERY_FIELD, query);
    }
    Ok(form)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let err = ServiceError::from_status(status, &body);
        warn!(status = status.as_u16(), "service request failed: {err}");
        return Err(err);
    }

    let bytes = response.bytes().await.map_err(ServiceError::transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()))
}

#[async_trait]
impl AnalysisService for ServiceClient {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, ServiceError> {
        let url = self.endpoint(ANALYZE_ROUTE)?;
        let ticket = request.ticket.0;
        info!(
            ticket,
            file = %request.file_name,
            size_bytes = request.bytes.len(),
            with_sensors = request.sensors.is_some(),
            "submitting image for analysis"
        );

        let form = build_form(request)?;
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                let err = ServiceError::transport(err);
                warn!(ticket, "analysis request did not complete: {err}");
                err
            })?;

        let result: AnalysisResult = read_json(response).await?;
        debug!(
            ticket,
            analysis_id = %result.id,
            recommendations = result.recommendations.len(),
            "analysis result received"
        );
        Ok(result)
    }
}

#[async_trait]
impl ChatService for ServiceClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        debug!(
            image_id = request.image_id.as_deref().unwrap_or("-"),
            history = request.history.len(),
            "sending chat message"
        );
        let response = self
            .http
            .post(self.endpoint(CHAT_ROUTE)?)
            .json(request)
            .send()
            .await
            .map_err(ServiceError::transport)?;
        read_json(response).await
    }
}

#[async_trait]
impl PlantRegistry for ServiceClient {
    async fn list_plants(&self) -> Result<Vec<Plant>, ServiceError> {
        self.get_json(PLANTS_ROUTE).await
    }

    async fn create_plant(&self, plant: &NewPlant) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(self.endpoint(PLANTS_ROUTE)?)
            .json(plant)
            .send()
            .await
            .map_err(ServiceError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(status, &body));
        }
        info!(name = %plant.name, plant_type = %plant.plant_type, "plant record created");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
