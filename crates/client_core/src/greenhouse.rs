use std::sync::Arc;

use shared::domain::{NewPlant, Plant, DEFAULT_PLANT_TYPE};
use tracing::warn;

use crate::service::{PlantRegistry, ServiceError};

/// Plant list backing the greenhouse view.
pub struct Greenhouse<R: PlantRegistry + ?Sized> {
    registry: Arc<R>,
    plants: Vec<Plant>,
    loading: bool,
    last_error: Option<String>,
}

impl<R: PlantRegistry + ?Sized> Greenhouse<R> {
    pub fn new(registry: Arc<R>) -> Self {
        Self {
            registry,
            plants: Vec::new(),
            loading: true,
            last_error: None,
        }
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    /// True until the first refresh finishes.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// A failed refresh keeps the previous list.
    pub async fn refresh(&mut self) -> Result<(), ServiceError> {
        let outcome = self.registry.list_plants().await;
        self.loading = false;
        match outcome {
            Ok(plants) => {
                self.plants = plants;
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!("failed to fetch plants: {err}");
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Returns `Ok(false)` without calling the registry when `name` is blank,
    /// `Ok(true)` once the registry accepted the record.
    pub async fn add_plant(
        &mut self,
        name: &str,
        plant_type: Option<&str>,
    ) -> Result<bool, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let plant = NewPlant {
            name: name.to_string(),
            plant_type: plant_type
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_PLANT_TYPE)
                .to_string(),
        };

        if let Err(err) = self.registry.create_plant(&plant).await {
            warn!(name = %plant.name, "failed to add plant: {err}");
            self.last_error = Some(err.to_string());
            return Err(err);
        }
        // The record exists even when the reload fails; `refresh` keeps that error.
        let _ = self.refresh().await;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "tests/greenhouse_tests.rs"]
mod tests;
