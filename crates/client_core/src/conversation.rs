//! Follow-up chat about a finished analysis.

use std::sync::Arc;

use shared::{
    domain::{ChatMessage, ChatRole},
    protocol::{ChatRequest, ChatResponse},
};
use tracing::{info, warn};

use crate::service::{ChatService, ServiceError};

pub struct Conversation<C: ChatService + ?Sized> {
    service: Arc<C>,
    image_id: Option<String>,
    history: Vec<ChatMessage>,
}

impl<C: ChatService + ?Sized> Conversation<C> {
    /// `image_id` is the `id` of an earlier analysis result; blank means none.
    pub fn new(service: Arc<C>, image_id: Option<String>) -> Self {
        Self {
            service,
            image_id: image_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            history: Vec::new(),
        }
    }

    pub fn image_id(&self) -> Option<&str> {
        self.image_id.as_deref()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Sends `message` with the turns so far. Blank messages are not sent and
    /// return `Ok(None)`. A failed request leaves the history as it was.
    pub async fn ask(&mut self, message: &str) -> Result<Option<ChatResponse>, ServiceError> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }

        let request = ChatRequest {
            message: message.to_string(),
            history: self.history.clone(),
            image_id: self.image_id.clone(),
        };
        let reply = self.service.chat(&request).await.map_err(|err| {
            warn!("chat request failed: {err}");
            err
        })?;

        info!(
            turns = self.history.len() / 2 + 1,
            sources = reply.sources.len(),
            "assistant replied"
        );
        self.history.push(ChatMessage {
            role: ChatRole::User,
            content: request.message,
        });
        self.history.push(ChatMessage {
            role: ChatRole::Assistant,
            content: reply.message.clone(),
        });
        Ok(Some(reply))
    }
}

#[cfg(test)]
#[path = "tests/conversation_tests.rs"]
mod tests;
