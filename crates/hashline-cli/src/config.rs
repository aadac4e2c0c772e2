//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use hashline_core::{DigestKind, PipelineConfig};
use serde::Deserialize;

/// Global configuration for hashline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub digest: DigestSection,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub max_in_flight: usize,
    pub max_digest_calls: usize,
    pub join_timeout_secs: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        let defaults = PipelineConfig::default();
        Self {
            max_in_flight: defaults.max_in_flight,
            max_digest_calls: defaults.max_digest_calls,
            join_timeout_secs: defaults.join_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DigestSection {
    pub hash1: DigestKind,
    pub hash2: DigestKind,
}

impl Default for DigestSection {
    fn default() -> Self {
        Self {
            hash1: DigestKind::Crc32,
            hash2: DigestKind::Md5,
        }
    }
}

impl PipelineSection {
    pub fn to_pipeline_config(self) -> PipelineConfig {
        PipelineConfig {
            max_in_flight: self.max_in_flight.max(1),
            max_digest_calls: self.max_digest_calls.max(1),
            join_timeout: Duration::from_secs(self.join_timeout_secs.max(1)),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./hashline.toml (current directory)
    /// 2. ~/.config/hashline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("hashline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "hashline") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.digest.hash1, DigestKind::Crc32);
        assert_eq!(config.digest.hash2, DigestKind::Md5);
        assert_eq!(config.pipeline.join_timeout_secs, 30);
        assert!(config.pipeline.max_digest_calls >= 1);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[pipeline]
max_in_flight = 8
max_digest_calls = 2
join_timeout_secs = 5

[digest]
hash1 = "xxh64"
hash2 = "blake3"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.pipeline.max_in_flight, 8);
        assert_eq!(config.digest.hash1, DigestKind::Xxh64);

        let pipeline = config.pipeline.to_pipeline_config();
        assert_eq!(pipeline.max_digest_calls, 2);
        assert_eq!(pipeline.join_timeout, Duration::from_secs(5));
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let config: Config = toml::from_str("[digest]\nhash2 = \"xxh32\"\n").unwrap();
        assert_eq!(config.digest.hash1, DigestKind::Crc32);
        assert_eq!(config.digest.hash2, DigestKind::Xxh32);
        assert_eq!(config.pipeline.join_timeout_secs, 30);
    }

    #[test]
    fn unknown_digest_rejected() {
        let err = toml::from_str::<Config>("[digest]\nhash1 = \"sha1\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn zero_limits_are_clamped() {
        let section = PipelineSection {
            max_in_flight: 0,
            max_digest_calls: 0,
            join_timeout_secs: 0,
        };
        let pipeline = section.to_pipeline_config();
        assert_eq!(pipeline.max_in_flight, 1);
        assert_eq!(pipeline.max_digest_calls, 1);
        assert_eq!(pipeline.join_timeout, Duration::from_secs(1));
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashline.toml");
        std::fs::write(&path, "[pipeline]\nmax_in_flight = 3\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.pipeline.max_in_flight, 3);
    }

    #[test]
    fn from_file_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
