use anyhow::Result;
use fanout::{AwsCli, Plan, Registry, RenderedReport, RunConfig, ScopeEntry};
use std::path::{Path, PathBuf};

use crate::Context;
use crate::cli::Cli;
use crate::config::Settings;
use crate::paths;
use crate::progress::DispatchBar;
use crate::runner;
use crate::scope::{self, ScopeSource};
use crate::ui;

/// Scoped profiles plus where newly learned account ids are written.
#[derive(Debug)]
struct ResolvedScope {
    entries: Vec<ScopeEntry>,
    /// Records already in the scope file
    known: Vec<ScopeEntry>,
    /// File that discovered accounts are appended to
    file: Option<PathBuf>,
    /// Whether the scope itself came from `file`
    from_file: bool,
}

pub fn run(ctx: &Context, cli: Cli) -> Result<()> {
    let settings = Settings::load()?;

    if !runner::command_exists(&settings.aws_binary) {
        anyhow::bail!(
            "AWS CLI not found ({}). Install it from https://aws.amazon.com/cli/",
            settings.aws_binary
        );
    }
    if cli.command.is_empty() {
        return Err(fanout::Error::MissingCommand.into());
    }

    let aws = AwsCli::new(settings.aws_binary.clone());
    let default_file = paths::default_scope_file(settings.scope_file.as_deref());
    let source = ScopeSource::select(&cli.scope, default_file.clone())?;
    let scope = resolve_scope(source, default_file, cli.add, &aws)?;

    let jobs = cli.jobs.unwrap_or(settings.jobs).max(1);
    let regions = cli
        .regions
        .as_deref()
        .map(fanout::region::parse_requested_regions)
        .transpose()?;

    let config = RunConfig::new(scope.entries.clone(), cli.command.clone())
        .with_regions(regions)
        .with_global_override(cli.global)
        .with_jobs(jobs)
        .with_program(aws.program())
        .with_text_services(settings.text_services.clone());

    let plan = fanout::plan(&config, &aws)?;
    record_accounts(ctx, &plan, &scope, cli.add)?;

    if !ctx.quiet {
        ui::info(&format!(
            "Running across {} ({})",
            ui::count(plan.accounts.len(), "account"),
            ui::count(plan.invocation_count(), "invocation")
        ));
        if ctx.verbose > 0 {
            for account in &plan.accounts {
                ui::kv(
                    &account.profile,
                    &format!("{} [{}]", account.account_id, account.regions().join(", ")),
                );
            }
        }
    }

    let bar = DispatchBar::new(ctx.quiet);
    let accounts = fanout::dispatch(plan.accounts, &plan.template, &aws, jobs, &bar)?;
    let report = fanout::render(&accounts);
    print_report(&report);

    Ok(())
}

/// Turn the scope source into entries, filling known account ids.
fn resolve_scope(
    source: ScopeSource,
    default_file: Option<PathBuf>,
    add: bool,
    registry: &dyn Registry,
) -> Result<ResolvedScope> {
    match source {
        ScopeSource::File(path) => {
            let entries = scope::read(&path)?;
            if entries.is_empty() {
                return Err(fanout::Error::InvalidScope(format!(
                    "no profiles in {}",
                    path.display()
                ))
                .into());
            }
            if add {
                ui::warn("--add has no effect with a scope file; new accounts are recorded automatically");
            }
            log::debug!("{} profile(s) from {}", entries.len(), path.display());
            Ok(ResolvedScope {
                known: entries.clone(),
                entries,
                file: Some(path),
                from_file: true,
            })
        }
        ScopeSource::Profiles(profiles) => scope_from_profiles(profiles, default_file, add),
        ScopeSource::Match(regex) => {
            let profiles: Vec<String> = registry
                .list_profiles()?
                .into_iter()
                .filter(|p| regex.is_match(p))
                .collect();
            if profiles.is_empty() {
                return Err(fanout::Error::InvalidScope(format!(
                    "no local profile matches {}",
                    regex.as_str()
                ))
                .into());
            }
            log::debug!("{} profile(s) match {}", profiles.len(), regex.as_str());
            scope_from_profiles(profiles, default_file, add)
        }
    }
}

fn scope_from_profiles(
    profiles: Vec<String>,
    default_file: Option<PathBuf>,
    add: bool,
) -> Result<ResolvedScope> {
    if add && default_file.is_none() {
        return Err(fanout::Error::InvalidScope(format!(
            "--add needs a scope file; set {} or scope_file in config.toml",
            paths::ENV_SCOPE_FILE
        ))
        .into());
    }

    let known = match &default_file {
        Some(path) => scope::read_if_exists(path)?,
        None => Vec::new(),
    };

    let entries = profiles
        .into_iter()
        .map(|profile| {
            let account_id = known
                .iter()
                .find(|k| k.profile == profile)
                .and_then(|k| k.account_id.clone());
            ScopeEntry {
                profile,
                account_id,
            }
        })
        .collect();

    Ok(ResolvedScope {
        entries,
        known,
        file: default_file,
        from_file: false,
    })
}

/// Records the run should append to the scope file.
///
/// A file-based scope gains every account id looked up during planning.
/// An explicit scope with `--add` gains every account not yet recorded.
fn pending_records(plan: &Plan, scope: &ResolvedScope, add: bool) -> Vec<ScopeEntry> {
    if scope.from_file {
        return plan.discovered.clone();
    }
    if !add {
        return Vec::new();
    }
    plan.accounts
        .iter()
        .filter(|a| {
            !scope
                .known
                .iter()
                .any(|k| k.profile == a.profile && k.account_id.is_some())
        })
        .map(|a| ScopeEntry::with_account(a.profile.clone(), a.account_id.clone()))
        .collect()
}

fn record_accounts(ctx: &Context, plan: &Plan, scope: &ResolvedScope, add: bool) -> Result<()> {
    let pending = pending_records(plan, scope, add);
    let Some(path) = scope.file.as_deref() else {
        return Ok(());
    };
    if pending.is_empty() {
        return Ok(());
    }

    for entry in &pending {
        if let Some(account_id) = &entry.account_id {
            scope::append(path, &entry.profile, account_id)?;
        }
    }

    if !ctx.quiet {
        ui::success(&format!(
            "Recorded {} in {}",
            ui::count(pending.len(), "account"),
            display_path(path)
        ));
    }
    Ok(())
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir() {
        Some(home) => match path.strip_prefix(&home) {
            Ok(rest) => format!("~/{}", rest.display()),
            Err(_) => path.display().to_string(),
        },
        None => path.display().to_string(),
    }
}

fn print_report(report: &RenderedReport) {
    let text = report.to_string();
    if text.ends_with('\n') {
        print!("{text}");
    } else {
        println!("{text}");
    }
}
