//! Optional `config.toml` settings.
//!
//! ```toml
//! scope_file = "~/eng/scope.csv"
//! jobs = 16
//! aws_binary = "aws"
//! text_services = ["s3"]
//! ```
//!
//! Command-line flags and environment variables override these values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::paths;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Scope file used when no scope flag or env var is given
    pub scope_file: Option<String>,
    /// Number of concurrent invocations
    pub jobs: usize,
    /// The aws executable
    pub aws_binary: String,
    /// Services whose output is never JSON
    pub text_services: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scope_file: None,
            jobs: fanout::DEFAULT_JOBS,
            aws_binary: "aws".to_string(),
            text_services: vec!["s3".to_string()],
        }
    }
}

impl Settings {
    /// Load settings from the config directory, or defaults if there is no file.
    pub fn load() -> Result<Self> {
        let path = paths::config_dir()?.join(CONFIG_FILE);
        Self::load_from(&path)
    }

    /// Load settings from a specific file, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Parse settings from TOML.
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)?;
        if settings.jobs == 0 {
            anyhow::bail!("jobs must be at least 1");
        }
        if settings.aws_binary.trim().is_empty() {
            anyhow::bail!("aws_binary must not be empty");
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.text_services, vec!["s3"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::parse("jobs = 16\n").unwrap();
        assert_eq!(settings.jobs, 16);
        assert_eq!(settings.aws_binary, "aws");
        assert_eq!(settings.scope_file, None);
    }

    #[test]
    fn test_full_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
scope_file = "~/eng/scope.csv"
jobs = 4
aws_binary = "/usr/local/bin/aws"
text_services = ["s3", "logs"]
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.scope_file.as_deref(), Some("~/eng/scope.csv"));
        assert_eq!(settings.jobs, 4);
        assert_eq!(settings.aws_binary, "/usr/local/bin/aws");
        assert_eq!(settings.text_services, vec!["s3", "logs"]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Settings::parse("jobs = 0").is_err());
        assert!(Settings::parse("aws_binary = \"\"").is_err());
        assert!(Settings::parse("unknown_key = true").is_err());
        assert!(Settings::parse("jobs = \"many\"").is_err());
    }
}
