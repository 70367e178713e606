//! Engine configuration.
//!
//! Loaded from YAML; every key is optional:
//!
//! ```yaml
//! drive_mode: until_interaction   # or each_message
//! session_ttl_secs: 3600          # 0 disables expiry
//! sweep_interval_secs: 60
//! default_model: openai/gpt-4.1
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// How far a single start/continue call drives a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Progress messages are batched into the envelope; only interaction
    /// requests and terminal outcomes stop the drive.
    #[default]
    UntilInteraction,
    /// Every progress message is its own suspension point.
    EachMessage,
}

impl DriveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UntilInteraction => "until_interaction",
            Self::EachMessage => "each_message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub drive_mode: DriveMode,
    pub session_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drive_mode: DriveMode::default(),
            session_ttl_secs: 3600,
            sweep_interval_secs: 60,
            default_model: None,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, EngineError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
            .map_err(|e| EngineError::Validation(format!("Invalid engine config: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Validation(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw).map_err(|e| match e {
            EngineError::Validation(msg) => {
                EngineError::Validation(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Idle time after which a suspended session is evicted, `None` when
    /// expiry is disabled.
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml_str("drive_mode: each_message\n").unwrap();
        assert_eq!(config.drive_mode, DriveMode::EachMessage);
        assert_eq!(config.session_ttl_secs, 3600);
        assert_eq!(config.default_model, None);
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = EngineConfig::from_yaml_str("session_ttl_secs: 0").unwrap();
        assert_eq!(config.session_ttl(), None);
        assert_eq!(
            EngineConfig::default().session_ttl(),
            Some(Duration::from_secs(3600))
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_model: local/llama\nsweep_interval_secs: 5").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_model.as_deref(), Some("local/llama"));
        assert_eq!(config.sweep_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_malformed_file_names_the_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "drive_mode: sideways").unwrap();

        let err = EngineConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err
            .to_string()
            .contains(&file.path().display().to_string()));
    }
}
