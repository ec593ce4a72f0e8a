//! Engine configuration loaded from TOML.
//!
//! Every table and field is optional; an empty document yields the defaults.

use serde::Deserialize;
use services_audio::AudioConfig;
use services_gpu::RenderConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid engine config")]
    Parse(#[from] toml::de::Error),

    #[error("{field} must be non-zero")]
    Zero { field: &'static str },
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub render: RenderConfig,
    pub audio: AudioConfig,
    pub jobs: JobConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    /// Stack size for user jobs; `None` keeps the platform default.
    pub stack_size: Option<usize>,
    /// How long shutdown waits on each job before reporting it leaked.
    pub shutdown_timeout_ms: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            stack_size: None,
            shutdown_timeout_ms: 2_000,
        }
    }
}

impl JobConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Rejects capacities the rings and allocators cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("render.ring_capacity", self.render.ring_capacity),
            ("render.release_ring_capacity", self.render.release_ring_capacity),
            ("audio.ring_capacity", self.audio.ring_capacity),
            ("audio.release_ring_capacity", self.audio.release_ring_capacity),
            ("jobs.shutdown_timeout_ms", self.jobs.shutdown_timeout_ms as usize),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [render]
            ring_capacity = 64
            release_latency_frames = 2

            [audio]
            wait_for_continue = false

            [jobs]
            stack_size = 1048576
            "#,
        )
        .unwrap();
        assert_eq!(config.render.ring_capacity, 64);
        assert_eq!(config.render.release_latency_frames, 2);
        assert_eq!(config.render.initial_slots, RenderConfig::default().initial_slots);
        assert!(!config.audio.wait_for_continue);
        assert_eq!(config.jobs.stack_size, Some(1 << 20));
        assert_eq!(config.jobs.shutdown_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("[render]\nring_capacty = 8\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err:?}");
    }

    #[test]
    fn zero_ring_capacity_is_rejected() {
        let err = EngineConfig::from_toml_str("[audio]\nring_capacity = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Zero {
                field: "audio.ring_capacity"
            }
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::from_path("/nonexistent/engine.toml").unwrap_err();
        assert!(err.to_string().contains("engine.toml"));
    }
}
