use super::*;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Mutex;

#[derive(Default)]
struct TestPlantRegistry {
    plants: Mutex<Vec<Plant>>,
    created: Mutex<Vec<NewPlant>>,
    fail_list: bool,
    fail_create: bool,
}

#[async_trait]
impl PlantRegistry for TestPlantRegistry {
    async fn list_plants(&self) -> Result<Vec<Plant>, ServiceError> {
        if self.fail_list {
            return Err(ServiceError::Transport("connection refused".into()));
        }
        Ok(self.plants.lock().await.clone())
    }

    async fn create_plant(&self, plant: &NewPlant) -> Result<(), ServiceError> {
        if self.fail_create {
            return Err(ServiceError::Status {
                status: 422,
                reason: "Unprocessable Entity".into(),
                detail: None,
            });
        }
        self.created.lock().await.push(plant.clone());
        let mut plants = self.plants.lock().await;
        let id = format!("p-{}", plants.len() + 1);
        plants.push(Plant {
            id,
            name: plant.name.clone(),
            plant_type: plant.plant_type.clone(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        });
        Ok(())
    }
}

#[tokio::test]
async fn refresh_loads_plants_and_clears_loading() {
    let registry = Arc::new(TestPlantRegistry::default());
    let mut greenhouse = Greenhouse::new(registry);
    assert!(greenhouse.is_loading());

    greenhouse.refresh().await.expect("refresh");
    assert!(!greenhouse.is_loading());
    assert!(greenhouse.plants().is_empty());
}

#[tokio::test]
async fn adding_a_plant_refreshes_the_list() {
    let registry = Arc::new(TestPlantRegistry::default());
    let mut greenhouse = Greenhouse::new(registry.clone());

    let added = greenhouse
        .add_plant("  Bay A - Row 1 ", None)
        .await
        .expect("add");
    assert!(added);
    assert_eq!(greenhouse.plants().len(), 1);
    assert_eq!(greenhouse.plants()[0].name, "Bay A - Row 1");

    let created = registry.created.lock().await;
    assert_eq!(created[0].plant_type, DEFAULT_PLANT_TYPE);
}

#[tokio::test]
async fn blank_names_are_ignored() {
    let registry = Arc::new(TestPlantRegistry::default());
    let mut greenhouse = Greenhouse::new(registry.clone());

    assert!(!greenhouse.add_plant("   ", Some("Pepper")).await.expect("noop"));
    assert!(registry.created.lock().await.is_empty());
}

#[tokio::test]
async fn failures_are_recorded_without_dropping_the_list() {
    let registry = Arc::new(TestPlantRegistry {
        fail_create: true,
        ..TestPlantRegistry::default()
    });
    let mut greenhouse = Greenhouse::new(registry);

    let err = greenhouse
        .add_plant("Row 2", Some("Pepper"))
        .await
        .expect_err("create fails");
    assert!(matches!(err, ServiceError::Status { status: 422, .. }));
    assert!(greenhouse.last_error().is_some());

    let registry = Arc::new(TestPlantRegistry {
        fail_list: true,
        ..TestPlantRegistry::default()
    });
    let mut greenhouse = Greenhouse::new(registry);
    assert!(greenhouse.refresh().await.is_err());
    assert!(!greenhouse.is_loading());
    assert!(greenhouse
        .last_error()
        .is_some_and(|message| message.contains("connection refused")));
}

#[tokio::test]
async fn created_plant_counts_as_added_when_reload_fails() {
    let registry = Arc::new(TestPlantRegistry {
        fail_list: true,
        ..TestPlantRegistry::default()
    });
    let mut greenhouse = Greenhouse::new(registry.clone());

    let added = greenhouse
        .add_plant("Row 3", Some("Pepper"))
        .await
        .expect("create succeeded");
    assert!(added);
    assert_eq!(registry.created.lock().await.len(), 1);
    assert!(greenhouse
        .last_error()
        .is_some_and(|message| message.contains("connection refused")));
}
