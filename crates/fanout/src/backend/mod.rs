//! Collaborator abstractions for running commands and looking up accounts.
//!
//! The [`Executor`] and [`Registry`] traits keep the planner and scheduler
//! independent of the real `aws` CLI, allowing:
//! - Real CLI execution via [`aws::AwsCli`]
//! - Mock implementations for testing

pub mod aws;

use crate::error::Result;
use crate::types::{CommandOutput, Invocation};

/// Runs one fully formed invocation and captures its output.
pub trait Executor: Send + Sync {
    /// Run the invocation to completion.
    ///
    /// Only failure to start the process is an `Err`; a command that runs and
    /// reports a problem does so through [`CommandOutput::stderr`].
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Source of local profiles, default regions and account ids.
pub trait Registry: Send + Sync {
    /// List every locally configured profile handle.
    fn list_profiles(&self) -> Result<Vec<String>>;

    /// Get the configured default region for a profile, if any.
    fn default_region(&self, profile: &str) -> Result<Option<String>>;

    /// Look up the account id behind a profile.
    fn account_id(&self, profile: &str) -> Result<String>;
}
