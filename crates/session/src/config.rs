use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEBOUNCE_RANGE_MS: std::ops::RangeInclusive<u64> = 50..=80;

/// Preview service settings. Every field has a default so a partial JSON file
/// is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewConfig {
    pub base_url: String,
    /// Quiescence window for coalesced updates.
    pub debounce_ms: u64,
    pub keep_alive_interval_ms: u64,
    /// Server-side idle timeout; must be longer than the keep-alive interval.
    pub session_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            debounce_ms: 60,
            keep_alive_interval_ms: 4_000,
            session_timeout_ms: 5_000,
            request_timeout_ms: 3_000,
        }
    }
}

impl PreviewConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` when it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() { Self::load(path) } else { Ok(Self::default()) }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("baseUrl must not be empty".into()));
        }
        if !DEBOUNCE_RANGE_MS.contains(&self.debounce_ms) {
            return Err(ConfigError::Invalid(format!(
                "debounceMs must be within {}..={} (got {})",
                DEBOUNCE_RANGE_MS.start(), DEBOUNCE_RANGE_MS.end(), self.debounce_ms
            )));
        }
        if self.keep_alive_interval_ms == 0 || self.keep_alive_interval_ms >= self.session_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "keepAliveIntervalMs ({}) must be non-zero and below sessionTimeoutMs ({})",
                self.keep_alive_interval_ms, self.session_timeout_ms
            )));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }

    pub fn keep_alive_interval(&self) -> Duration { Duration::from_millis(self.keep_alive_interval_ms) }

    pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.request_timeout_ms) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PreviewConfig::default();
        config.validate().unwrap();
        assert!(config.keep_alive_interval() < Duration::from_millis(config.session_timeout_ms));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PreviewConfig = serde_json::from_str(r#"{"baseUrl":"http://sign.local","debounceMs":75}"#).unwrap();
        assert_eq!(config.base_url, "http://sign.local");
        assert_eq!(config.debounce_ms, 75);
        assert_eq!(config.keep_alive_interval_ms, 4_000);
    }

    #[test]
    fn rejects_keep_alive_not_below_timeout() {
        let config = PreviewConfig { keep_alive_interval_ms: 5_000, ..PreviewConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_debounce_outside_window() {
        for debounce_ms in [0, 49, 81, 500] {
            let config = PreviewConfig { debounce_ms, ..PreviewConfig::default() };
            assert!(config.validate().is_err(), "{debounce_ms} accepted");
        }
    }

    #[test]
    fn load_validates_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.json");
        fs::write(&path, r#"{"debounceMs":10}"#).unwrap();
        assert!(matches!(PreviewConfig::load(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(PreviewConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = PreviewConfig::load_or_default(Path::new("/nonexistent/ledsign/preview.json")).unwrap();
        assert_eq!(config, PreviewConfig::default());
    }
}
