//! Execution planner - validates the scope and resolves every account's
//! region set before anything is dispatched.

use crate::backend::Registry;
use crate::error::{Error, Result};
use crate::region::{RegionPolicy, resolve};
use crate::scheduler::{DEFAULT_JOBS, pool};
use crate::types::{Account, CommandTemplate, ScopeEntry};
use rayon::prelude::*;

/// Everything one run needs, assembled once and passed down by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Scoped profiles, in report order
    pub scope: Vec<ScopeEntry>,
    /// The user's command, possibly still carrying `--region`
    pub command: Vec<String>,
    /// Explicitly requested regions
    pub regions: Option<Vec<String>>,
    /// Ignore global-service region pinning
    pub global_override: bool,
    /// Worker pool size for both phases
    pub jobs: usize,
    /// Executable to run
    pub program: String,
    /// Services whose output is plain text
    pub text_services: Vec<String>,
}

impl RunConfig {
    /// Create a config with default jobs, `aws` as program and `s3` as the
    /// only text service.
    pub fn new(scope: Vec<ScopeEntry>, command: Vec<String>) -> Self {
        Self {
            scope,
            command,
            regions: None,
            global_override: false,
            jobs: DEFAULT_JOBS,
            program: "aws".to_string(),
            text_services: vec!["s3".to_string()],
        }
    }

    pub fn with_regions(mut self, regions: Option<Vec<String>>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_global_override(mut self, global_override: bool) -> Self {
        self.global_override = global_override;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_text_services(mut self, services: Vec<String>) -> Self {
        self.text_services = services;
        self
    }
}

/// Result of planning: accounts ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Accounts in scope order, regions resolved
    pub accounts: Vec<Account>,
    /// The command bound into each invocation
    pub template: CommandTemplate,
    /// The region policy used for every account
    pub policy: RegionPolicy,
    /// Profiles whose account id was looked up during planning
    pub discovered: Vec<ScopeEntry>,
}

impl Plan {
    /// Total number of invocations dispatch will run
    pub fn invocation_count(&self) -> usize {
        self.accounts.iter().map(|a| a.regions().len()).sum()
    }
}

/// Plan a run.
///
/// Fails fast: an empty scope or command, an unknown profile, or an invalid
/// region for any account aborts before a single command is dispatched.
pub fn plan(config: &RunConfig, registry: &dyn Registry) -> Result<Plan> {
    if config.scope.is_empty() {
        return Err(Error::InvalidScope("no profiles in scope".to_string()));
    }
    if config.command.is_empty() {
        return Err(Error::MissingCommand);
    }

    let scope = dedup_scope(&config.scope);
    if scope.len() < config.scope.len() {
        log::debug!(
            "Dropped {} repeated profile(s) from scope",
            config.scope.len() - scope.len()
        );
    }
    validate_profiles(&scope, registry)?;

    let (policy, command) = RegionPolicy::from_command(
        &config.command,
        config.regions.clone(),
        config.global_override,
    )?;
    log::debug!("Region policy: {policy:?}");

    let template = CommandTemplate::new(config.program.clone(), command)
        .with_text_services(config.text_services.clone());

    let pool = pool(config.jobs)?;
    let resolved: Vec<(Account, bool)> = pool.install(|| {
        scope
            .par_iter()
            .map(|entry| resolve_account(entry, &policy, registry))
            .collect::<Result<_>>()
    })?;

    let mut accounts = Vec::with_capacity(resolved.len());
    let mut discovered = Vec::new();
    for (account, looked_up) in resolved {
        if looked_up {
            discovered.push(ScopeEntry::with_account(
                account.profile.clone(),
                account.account_id.clone(),
            ));
        }
        accounts.push(account);
    }

    Ok(Plan {
        accounts,
        template,
        policy,
        discovered,
    })
}

/// One entry per profile, at its first position; the first known account
/// id wins.
fn dedup_scope(scope: &[ScopeEntry]) -> Vec<ScopeEntry> {
    let mut unique: Vec<ScopeEntry> = Vec::with_capacity(scope.len());
    for entry in scope {
        match unique.iter_mut().find(|e| e.profile == entry.profile) {
            Some(existing) => {
                if existing.account_id.is_none() {
                    existing.account_id.clone_from(&entry.account_id);
                }
            }
            None => unique.push(entry.clone()),
        }
    }
    unique
}

/// Every scoped profile must be configured locally.
fn validate_profiles(scope: &[ScopeEntry], registry: &dyn Registry) -> Result<()> {
    let known = registry.list_profiles()?;
    let unknown: Vec<String> = scope
        .iter()
        .filter(|e| !known.contains(&e.profile))
        .map(|e| e.profile.clone())
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidProfile { profiles: unknown })
    }
}

/// Resolve one account's regions and, when missing, its id.
fn resolve_account(
    entry: &ScopeEntry,
    policy: &RegionPolicy,
    registry: &dyn Registry,
) -> Result<(Account, bool)> {
    let regions = resolve(&entry.profile, policy, registry)?;

    let (account_id, looked_up) = match &entry.account_id {
        Some(id) => (id.clone(), false),
        None => {
            let id = registry.account_id(&entry.profile)?;
            log::info!("Discovered account {id} for profile {}", entry.profile);
            (id, true)
        }
    };

    log::debug!("{}: {} region(s) {:?}", entry.profile, regions.len(), regions);
    Ok((Account::new(entry.profile.clone(), account_id, regions), looked_up))
}
