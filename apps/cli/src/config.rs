use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Context;
use client_core::UploadPolicy;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "plant-health.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub max_upload_bytes: u64,
    pub attach_sensor_data: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8001".into(),
            max_upload_bytes: UploadPolicy::default().max_bytes,
            attach_sensor_data: true,
        }
    }
}

impl Settings {
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::default().with_max_bytes(self.max_upload_bytes)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    max_upload_bytes: Option<u64>,
    attach_sensor_data: Option<bool>,
}

/// Defaults, then the config file, then the environment. An explicitly
/// requested file must exist; the default file is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound && config_path.is_none() => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file.max_upload_bytes {
        settings.max_upload_bytes = v;
    }
    if let Some(v) = file.attach_sensor_data {
        settings.attach_sensor_data = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PLANT_HEALTH_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = lookup("APP__MAX_UPLOAD_BYTES") {
        match v.trim().parse::<u64>() {
            Ok(parsed) => settings.max_upload_bytes = parsed,
            Err(err) => warn!("ignoring APP__MAX_UPLOAD_BYTES={v:?}: {err}"),
        }
    }

    if let Some(v) = lookup("APP__ATTACH_SENSOR_DATA") {
        match parse_flag(&v) {
            Some(parsed) => settings.attach_sensor_data = parsed,
            None => warn!("ignoring APP__ATTACH_SENSOR_DATA={v:?}: expected true or false"),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
