//! Local preview handles for selected images.
//!
//! A preview is a `data:` URL held until the controller releases it. Every
//! superseded selection must be released, otherwise the encoded payload stays
//! resident for the lifetime of the registry.

use std::{collections::HashMap, fmt};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewId(pub Uuid);

impl fmt::Display for PreviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Default)]
pub struct PreviewRegistry {
    previews: HashMap<PreviewId, String>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, mime_type: &str, bytes: &[u8]) -> PreviewId {
        let id = PreviewId(Uuid::new_v4());
        let url = format!("data:{mime_type};base64,{}", STANDARD.encode(bytes));
        self.previews.insert(id, url);
        tracing::debug!(preview = %id, "created image preview");
        id
    }

    pub fn url(&self, id: PreviewId) -> Option<&str> {
        self.previews.get(&id).map(String::as_str)
    }

    /// Returns whether the handle was still live.
    pub fn release(&mut self, id: PreviewId) -> bool {
        let released = self.previews.remove(&id).is_some();
        if released {
            tracing::debug!(preview = %id, "released image preview");
        }
        released
    }

    pub fn release_all(&mut self) -> usize {
        let count = self.previews.len();
        self.previews.clear();
        count
    }

    pub fn live(&self) -> usize {
        self.previews.len()
    }
}
