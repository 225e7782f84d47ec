//! Path resolution for aws-all
//!
//! # Environment Variables
//!
//! - `AWS_ALL_CONFIG_DIR` - Override config directory
//! - `AWS_ALL_SCOPE_FILE` - Default scope file when no scope flag is given
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `AWS_ALL_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/aws-all` (if set)
//! 3. `~/.config/aws-all`
//!
//! For default_scope_file():
//! 1. `AWS_ALL_SCOPE_FILE` environment variable
//! 2. `scope_file` in `config.toml`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "AWS_ALL_CONFIG_DIR";

/// Environment variable naming the default scope file
pub const ENV_SCOPE_FILE: &str = "AWS_ALL_SCOPE_FILE";

/// Get the aws-all config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("aws-all");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("aws-all");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// The scope file used when no scope flag is given, if any is configured.
pub fn default_scope_file(configured: Option<&str>) -> Option<PathBuf> {
    scope_file_from(std::env::var(ENV_SCOPE_FILE).ok(), configured)
}

fn scope_file_from(env_value: Option<String>, configured: Option<&str>) -> Option<PathBuf> {
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        log::debug!("Using scope file from {ENV_SCOPE_FILE}: {value}");
        return Some(expand(&value));
    }
    configured.filter(|v| !v.trim().is_empty()).map(expand)
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/aws-all/config", || {
            let result = config_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/aws-all/config"));
        });
    }

    #[test]
    fn test_scope_file_env_wins() {
        let result = scope_file_from(Some("/env/scope.csv".into()), Some("/cfg/scope.csv"));
        assert_eq!(result, Some(PathBuf::from("/env/scope.csv")));
    }

    #[test]
    fn test_scope_file_falls_back_to_config() {
        let result = scope_file_from(None, Some("/cfg/scope.csv"));
        assert_eq!(result, Some(PathBuf::from("/cfg/scope.csv")));

        let result = scope_file_from(Some("  ".into()), Some("/cfg/scope.csv"));
        assert_eq!(result, Some(PathBuf::from("/cfg/scope.csv")));
    }

    #[test]
    fn test_scope_file_none() {
        assert_eq!(scope_file_from(None, None), None);
        assert_eq!(scope_file_from(None, Some("")), None);
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/eng/scope.csv");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("eng").join("scope.csv"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("AWS_ALL_TEST_ENG_HOME", "/opt/eng", || {
            let result = expand("$AWS_ALL_TEST_ENG_HOME/scope.csv");
            assert_eq!(result, PathBuf::from("/opt/eng/scope.csv"));
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_AWS_ALL_12345/file");
        assert_eq!(
            result,
            PathBuf::from("/path/$NONEXISTENT_VAR_AWS_ALL_12345/file")
        );
    }
}
