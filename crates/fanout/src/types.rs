//! Core types shared by the planner, scheduler, classifier and reporter.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// One scoped profile, optionally with its already-known account id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeEntry {
    /// Local profile handle
    pub profile: String,
    /// Account id behind the profile, when already recorded
    pub account_id: Option<String>,
}

impl ScopeEntry {
    /// Create an entry whose account id is not yet known.
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            account_id: None,
        }
    }

    /// Create an entry with a known account id.
    pub fn with_account(profile: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            account_id: Some(account_id.into()),
        }
    }
}

/// Classified output of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Output parsed as JSON
    Structured(serde_json::Value),
    /// Output that could not be parsed, carried through verbatim
    Opaque(String),
}

impl Outcome {
    /// Check if the outcome is raw text
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque(_))
    }
}

/// A scoped account with its resolved regions and, after dispatch, one
/// outcome per region.
///
/// Regions are fixed at construction. Each region's outcome can be recorded
/// exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Local profile handle
    pub profile: String,
    /// Remote account id
    pub account_id: String,
    regions: Vec<String>,
    outcomes: HashMap<String, Outcome>,
}

impl Account {
    /// Create an account with its resolved region set.
    pub fn new(
        profile: impl Into<String>,
        account_id: impl Into<String>,
        regions: Vec<String>,
    ) -> Self {
        Self {
            profile: profile.into(),
            account_id: account_id.into(),
            regions,
            outcomes: HashMap::new(),
        }
    }

    /// Resolved regions, in resolution order.
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// Outcome recorded for a region, if any.
    pub fn outcome(&self, region: &str) -> Option<&Outcome> {
        self.outcomes.get(region)
    }

    /// Record the outcome for one region.
    ///
    /// Fails if the region was not resolved for this account or already has
    /// an outcome.
    pub fn record(&mut self, region: &str, outcome: Outcome) -> Result<()> {
        if !self.regions.iter().any(|r| r == region) {
            return Err(Error::Other(format!(
                "region {region} is not planned for profile {}",
                self.profile
            )));
        }
        if self.outcomes.contains_key(region) {
            return Err(Error::Other(format!(
                "outcome for {}/{region} already recorded",
                self.profile
            )));
        }
        self.outcomes.insert(region.to_string(), outcome);
        Ok(())
    }

    /// Whether every resolved region has an outcome.
    pub fn is_complete(&self) -> bool {
        self.regions.iter().all(|r| self.outcomes.contains_key(r))
    }

    /// Whether any region's outcome is opaque text.
    pub fn is_opaque(&self) -> bool {
        self.outcomes.values().any(Outcome::is_opaque)
    }

    /// Outcomes in resolved-region order, skipping regions not yet recorded.
    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.regions
            .iter()
            .filter_map(|r| self.outcomes.get(r).map(|o| (r.as_str(), o)))
    }
}

/// Captured result of running one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// A fully formed command line for one (profile, region) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub profile: String,
    pub region: String,
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// The user's command, ready to be bound to each (profile, region) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    command: Vec<String>,
    text_services: Vec<String>,
}

impl CommandTemplate {
    /// Create a template for `program` running `command`.
    pub fn new(program: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            program: program.into(),
            command,
            text_services: Vec::new(),
        }
    }

    /// Services whose output is plain text, so `--output json` is not added.
    pub fn with_text_services(mut self, services: Vec<String>) -> Self {
        self.text_services = services;
        self
    }

    /// The user's command without profile or region flags.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// The service token (first word) of the command.
    pub fn service(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Whether the service only produces text output.
    pub fn expects_text(&self) -> bool {
        self.service()
            .is_some_and(|s| self.text_services.iter().any(|t| t == s))
    }

    /// Bind the template to one profile and region.
    pub fn invocation(&self, profile: &str, region: &str) -> Invocation {
        let mut args = vec![
            "--profile".to_string(),
            profile.to_string(),
            "--region".to_string(),
            region.to_string(),
        ];
        args.extend(self.command.iter().cloned());
        if !self.expects_text() {
            args.push("--output".to_string());
            args.push("json".to_string());
        }

        Invocation {
            profile: profile.to_string(),
            region: region.to_string(),
            program: self.program.clone(),
            args,
        }
    }
}
