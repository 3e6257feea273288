use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PATH: &str = "/api/remove-bg";

/// Tunables for the upload session controller.
///
/// Every field has a default, so a partial JSON document is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerSettings {
    /// Base URL of the removal service, without the path.
    pub endpoint: String,
    pub path: String,
    pub request_timeout_secs: u64,
    /// Estimator cadence.
    pub tick_interval_ms: u64,
    pub progress_step: u8,
    /// Highest value the estimator may report on its own.
    pub progress_cap: u8,
    pub max_retries: u32,
    /// Log every estimator tick at info level instead of debug.
    pub verbose_ticks: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            path: DEFAULT_PATH.into(),
            request_timeout_secs: 120,
            tick_interval_ms: 500,
            progress_step: 10,
            progress_cap: 90,
            max_retries: 3,
            verbose_ticks: false,
        }
    }
}

impl ControllerSettings {
    /// Read settings from a JSON file. A missing file yields the defaults; a
    /// malformed one is logged and also falls back to the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                warn!(
                    "Ignoring malformed settings in {}: {err}; using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    /// Apply `CUTOUT_ENDPOINT`, `CUTOUT_TIMEOUT_SECS` and `CUTOUT_DEBUG`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("CUTOUT_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint.trim().to_string();
            }
        }

        if let Ok(raw) = std::env::var("CUTOUT_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => warn!("Ignoring invalid CUTOUT_TIMEOUT_SECS value '{raw}'"),
            }
        }

        self.verbose_ticks = std::env::var("CUTOUT_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(self.verbose_ticks);

        self
    }

    /// Full URL of the removal route.
    pub fn removal_url(&self) -> String {
        join_url(&self.endpoint, &self.path)
    }

    pub fn health_url(&self) -> String {
        join_url(&self.endpoint, "/healthz")
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_estimator_and_retry_contract() {
        let settings = ControllerSettings::default();
        assert_eq!(settings.tick_interval(), Duration::from_millis(500));
        assert_eq!(settings.progress_step, 10);
        assert_eq!(settings.progress_cap, 90);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.removal_url(), "http://127.0.0.1:8000/api/remove-bg");
    }

    #[test]
    fn joins_endpoint_and_path_without_double_slashes() {
        let settings = ControllerSettings {
            endpoint: "https://bg.example.org/".into(),
            path: "/api/remove-bg".into(),
            ..ControllerSettings::default()
        };
        assert_eq!(settings.removal_url(), "https://bg.example.org/api/remove-bg");
        assert_eq!(settings.health_url(), "https://bg.example.org/healthz");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = ControllerSettings::load(&dir.path().join("absent.json")).expect("load");
        assert_eq!(loaded, ControllerSettings::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "max_retries": 5, "endpoint": "http://svc:9000" }"#).expect("write");

        let loaded = ControllerSettings::load(&path).expect("load");
        assert_eq!(loaded.max_retries, 5);
        assert_eq!(loaded.endpoint, "http://svc:9000");
        assert_eq!(loaded.progress_cap, 90);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write");

        let loaded = ControllerSettings::load(&path).expect("load");
        assert_eq!(loaded, ControllerSettings::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let settings = ControllerSettings {
            request_timeout_secs: 15,
            verbose_ticks: true,
            ..ControllerSettings::default()
        };
        settings.save(&path).expect("save");
        assert_eq!(ControllerSettings::load(&path).expect("load"), settings);
    }
}
