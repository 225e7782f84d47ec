//! Error types for planning and fanning out a command.
//!
//! Every error here is fatal for the current run: nothing is retried and no
//! partial report is produced. Unparseable command output is deliberately
//! absent from this list; it becomes an opaque outcome instead.

use thiserror::Error;

/// Categories of fan-out errors for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Conflicting or missing scope inputs
    Scope,
    /// Profile not known locally
    Profile,
    /// Region outside the catalog, or none resolvable
    Region,
    /// The external command wrote to stderr
    Execution,
    /// An account registry lookup failed
    Registry,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Scope => "Invalid scope",
            Self::Profile => "Unknown profile",
            Self::Region => "Invalid region",
            Self::Execution => "Command failed",
            Self::Registry => "Account lookup failed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Scope => {
                "Pass exactly one of --profiles, --scope-file or --match, or set AWS_ALL_SCOPE_FILE"
            }
            Self::Profile => "Check `aws configure list-profiles` for the available profiles",
            Self::Region => "Use catalog region names, a comma-separated list, or `all`",
            Self::Execution => "Run the printed command by hand to inspect the failure",
            Self::Registry => "Check the profile's credentials with `aws sts get-caller-identity`",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while planning or dispatching a run.
#[derive(Debug, Error)]
pub enum Error {
    /// Conflicting or missing scope inputs
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// One or more scoped profiles are not configured locally
    #[error("profile(s) not found locally: {}", profiles.join(", "))]
    InvalidProfile {
        /// Every unknown profile handle, in scope order
        profiles: Vec<String>,
    },

    /// One or more requested regions are not in the catalog
    #[error("invalid region(s): {}", regions.join(","))]
    InvalidRegion {
        /// Every invalid requested region, in request order
        regions: Vec<String>,
    },

    /// No usable default region is configured for a profile
    #[error("no valid region found for profile {profile}{}", configured_suffix(configured))]
    NoRegion {
        /// Profile whose default region was looked up
        profile: String,
        /// The configured value, when one exists but is not in the catalog
        configured: Option<String>,
    },

    /// No command was given to fan out
    #[error("no command provided")]
    MissingCommand,

    /// The external command reported something on stderr
    #[error("command failed: {invocation}\n{stderr}")]
    Execution {
        /// The exact command line that failed
        invocation: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// An account registry lookup failed
    #[error("registry lookup failed: {message}")]
    Registry {
        /// Description of the failed lookup
        message: String,
    },

    /// Worker pool could not be created
    #[error("failed to create worker pool: {0}")]
    ThreadPool(String),

    /// Malformed JSON from a registry lookup
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

fn configured_suffix(configured: &Option<String>) -> String {
    configured
        .as_deref()
        .map(|c| format!(" (configured: {c})"))
        .unwrap_or_default()
}

impl Error {
    /// Get the error category for user feedback.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidScope(_) | Error::MissingCommand => ErrorCategory::Scope,
            Error::InvalidProfile { .. } => ErrorCategory::Profile,
            Error::InvalidRegion { .. } | Error::NoRegion { .. } => ErrorCategory::Region,
            Error::Execution { .. } => ErrorCategory::Execution,
            Error::Registry { .. } => ErrorCategory::Registry,
            _ => ErrorCategory::Other,
        }
    }

    /// Build a registry error with a formatted message.
    pub fn registry(message: impl Into<String>) -> Self {
        Error::Registry {
            message: message.into(),
        }
    }
}

/// Result type for fan-out operations.
pub type Result<T> = std::result::Result<T, Error>;
