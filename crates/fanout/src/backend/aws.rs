//! Real backend using the `aws` command line.

use crate::backend::{Executor, Registry};
use crate::error::{Error, Result};
use crate::types::{CommandOutput, Invocation};
use std::process::{Command, Output};

/// Backend that executes real `aws` commands.
pub struct AwsCli {
    /// Path or name of the aws executable
    program: String,
}

impl AwsCli {
    /// Create a backend running `program` (usually just `aws`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The executable this backend runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        log::trace!("{} {}", self.program, args.join(" "));
        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| Error::registry(format!("failed to execute {}: {e}", self.program)))
    }

    /// Run a command and require success.
    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::registry(format!(
                "`{} {}` failed: {}",
                self.program,
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Default for AwsCli {
    fn default() -> Self {
        Self::new("aws")
    }
}

impl Executor for AwsCli {
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        log::debug!("Running: {invocation}");
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .map_err(|e| Error::Execution {
                invocation: invocation.to_string(),
                stderr: format!("failed to execute {}: {e}", invocation.program),
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }
}

impl Registry for AwsCli {
    fn list_profiles(&self) -> Result<Vec<String>> {
        let stdout = self.run_checked(&["configure", "list-profiles"])?;
        Ok(parse_profiles(&stdout))
    }

    fn default_region(&self, profile: &str) -> Result<Option<String>> {
        // `configure get` exits non-zero when the key is unset
        let output = self.run(&["--profile", profile, "configure", "get", "region"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let region = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!region.is_empty()).then_some(region))
    }

    fn account_id(&self, profile: &str) -> Result<String> {
        let stdout = self.run_checked(&[
            "--profile",
            profile,
            "--output",
            "json",
            "sts",
            "get-caller-identity",
        ])?;
        parse_caller_identity(&stdout)?
            .ok_or_else(|| Error::registry(format!("no account id returned for profile {profile}")))
    }
}

/// Parse `aws configure list-profiles` output.
fn parse_profiles(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract the account id from `sts get-caller-identity` JSON.
///
/// Output that is not JSON is an error; JSON without `Account` is `None`.
fn parse_caller_identity(stdout: &str) -> Result<Option<String>> {
    let json: serde_json::Value = serde_json::from_str(stdout)?;
    Ok(json["Account"].as_str().map(str::to_string))
}
