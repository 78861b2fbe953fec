use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        "api_url = \"http://greenhouse.local:9000\"\nmax_upload_bytes = 2048\n",
    )
    .expect("valid file");

    assert_eq!(settings.api_url, "http://greenhouse.local:9000");
    assert_eq!(settings.max_upload_bytes, 2048);
    assert!(settings.attach_sensor_data);
    assert_eq!(settings.upload_policy().max_bytes, 2048);
}

#[test]
fn unknown_file_keys_are_rejected() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "api_ulr = \"typo\"").is_err());
    assert_eq!(settings, Settings::default());
}

#[test]
fn app_prefixed_env_wins_over_legacy_name() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("PLANT_HEALTH_API_URL", "http://legacy:8001"),
            ("APP__API_URL", "http://preferred:8001"),
            ("APP__ATTACH_SENSOR_DATA", "off"),
        ]),
    );
    assert_eq!(settings.api_url, "http://preferred:8001");
    assert!(!settings.attach_sensor_data);
}

#[test]
fn invalid_env_values_keep_previous_settings() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("APP__MAX_UPLOAD_BYTES", "ten megabytes"),
            ("APP__ATTACH_SENSOR_DATA", "maybe"),
        ]),
    );
    assert_eq!(settings, Settings::default());
}

#[test]
fn explicit_config_path_must_exist() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let missing = env::temp_dir().join(format!("plant_health_missing_{suffix}.toml"));

    let err = load_settings(Some(&missing)).expect_err("missing file");
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn explicit_config_file_is_loaded() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("plant_health_config_{suffix}.toml"));
    fs::write(&path, "max_upload_bytes = 4096\nattach_sensor_data = false\n").expect("write");

    let settings = load_settings(Some(&path)).expect("load");
    assert_eq!(settings.max_upload_bytes, 4096);
    assert!(!settings.attach_sensor_data);

    fs::remove_file(path).expect("cleanup");
}
