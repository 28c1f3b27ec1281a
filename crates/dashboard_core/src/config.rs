use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use url::Url;

use crate::{notifications::SupersededResolution, trigger::DEFAULT_FETCH_INTERVAL};

pub const DEFAULT_SETTINGS_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSettings {
    pub api_base_url: String,
    pub fetch_interval_ms: u64,
    pub event_buffer: usize,
    pub superseded_resolution: SupersededResolution,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".into(),
            fetch_interval_ms: DEFAULT_FETCH_INTERVAL.as_millis() as u64,
            event_buffer: 256,
            superseded_resolution: SupersededResolution::Apply,
        }
    }
}

impl DashboardSettings {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_interval_ms)
    }

    pub fn api_base_url(&self) -> Result<Url> {
        parse_api_base_url(&self.api_base_url)
    }
}

/// Defaults, then `dashboard.toml` in the working directory, then environment.
pub fn load_settings() -> DashboardSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> DashboardSettings {
    let mut settings = DashboardSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, env);

    settings
}

fn apply_file_overrides(settings: &mut DashboardSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!("ignoring unparsable settings file");
        return;
    };
    let text = |key: &str| match file_cfg.get(key)? {
        toml::Value::String(value) => Some(value.clone()),
        toml::Value::Integer(value) => Some(value.to_string()),
        _ => None,
    };

    if let Some(v) = text("api_base_url") {
        settings.api_base_url = v;
    }
    if let Some(v) = text("fetch_interval_ms").and_then(|v| v.parse().ok()) {
        settings.fetch_interval_ms = v;
    }
    if let Some(v) = text("event_buffer").and_then(|v| v.parse().ok()) {
        settings.event_buffer = v;
    }
    if let Some(v) = text("superseded_resolution").and_then(|v| v.parse().ok()) {
        settings.superseded_resolution = v;
    }
}

fn apply_env_overrides(settings: &mut DashboardSettings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("DASHBOARD_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = env("APP__FETCH_INTERVAL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.fetch_interval_ms = parsed;
        }
    }

    if let Some(v) = env("APP__EVENT_BUFFER") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.event_buffer = parsed;
        }
    }

    if let Some(v) = env("APP__SUPERSEDED_RESOLUTION") {
        if let Ok(parsed) = v.parse::<SupersededResolution>() {
            settings.superseded_resolution = parsed;
        }
    }
}

pub fn parse_api_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let url = Url::parse(raw).with_context(|| format!("invalid API base URL '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("API base URL must be http or https, got '{}'", url.scheme());
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
