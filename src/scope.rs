//! Scope selection and the scope file.
//!
//! The scope file is a plain table, one `profile,account` record per line.
//! A header whose first field is `profile` (any case) is skipped, and a
//! record without an account id is allowed; its id is looked up at run time.

use anyhow::{Context, Result};
use fanout::ScopeEntry;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::ScopeArgs;

/// Where the scoped profiles come from.
#[derive(Debug)]
pub enum ScopeSource {
    /// Explicit profile list
    Profiles(Vec<String>),
    /// Every record of a scope file
    File(PathBuf),
    /// Every local profile matching a pattern
    Match(Regex),
}

impl ScopeSource {
    /// Pick the scope source from the flags, falling back to `default_file`.
    ///
    /// More than one flag, an invalid pattern, or no source at all is an
    /// invalid scope.
    pub fn select(args: &ScopeArgs, default_file: Option<PathBuf>) -> fanout::Result<Self> {
        let given = usize::from(!args.profiles.is_empty())
            + usize::from(args.scope_file.is_some())
            + usize::from(args.matching.is_some());
        if given > 1 {
            return Err(fanout::Error::InvalidScope(
                "--profiles, --scope-file and --match are mutually exclusive".to_string(),
            ));
        }

        if !args.profiles.is_empty() {
            let mut profiles: Vec<String> = Vec::with_capacity(args.profiles.len());
            for profile in args.profiles.iter().map(|p| p.trim()) {
                if !profile.is_empty() && !profiles.iter().any(|p| p == profile) {
                    profiles.push(profile.to_string());
                }
            }
            if profiles.is_empty() {
                return Err(fanout::Error::InvalidScope("empty profile list".to_string()));
            }
            return Ok(Self::Profiles(profiles));
        }
        if let Some(path) = &args.scope_file {
            return Ok(Self::File(path.clone()));
        }
        if let Some(pattern) = &args.matching {
            let regex = Regex::new(pattern).map_err(|e| {
                fanout::Error::InvalidScope(format!("invalid --match pattern: {e}"))
            })?;
            return Ok(Self::Match(regex));
        }

        default_file.map(Self::File).ok_or_else(|| {
            fanout::Error::InvalidScope(format!(
                "no scope given; use --profiles, --scope-file, --match or set {}",
                crate::paths::ENV_SCOPE_FILE
            ))
        })
    }
}

/// Parse scope file content.
///
/// Profiles keep the position of their first record; a later record's
/// account id replaces an earlier one.
pub fn parse(content: &str) -> Vec<ScopeEntry> {
    let mut entries: Vec<ScopeEntry> = Vec::new();

    for line in content.lines() {
        let mut fields = line.split(',').map(str::trim);
        let profile = match fields.next() {
            Some(p) if !p.is_empty() => p,
            _ => continue,
        };
        if profile.eq_ignore_ascii_case("profile") {
            continue;
        }
        let account_id = fields
            .next()
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        match entries.iter_mut().find(|e| e.profile == profile) {
            Some(existing) => {
                if account_id.is_some() {
                    existing.account_id = account_id;
                }
            }
            None => entries.push(ScopeEntry {
                profile: profile.to_string(),
                account_id,
            }),
        }
    }

    entries
}

/// Read every record of a scope file.
pub fn read(path: &Path) -> Result<Vec<ScopeEntry>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read scope file {}", path.display()))?;
    Ok(parse(&content))
}

/// Read a scope file if it exists, else return no records.
pub fn read_if_exists(path: &Path) -> Result<Vec<ScopeEntry>> {
    if path.exists() { read(path) } else { Ok(Vec::new()) }
}

/// Append one `profile,account` record, creating the file if needed.
pub fn append(path: &Path, profile: &str, account_id: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }

    // Keep records on their own line even if the file lacks a trailing newline
    let needs_newline = fs::read(path)
        .map(|bytes| !bytes.is_empty() && !bytes.ends_with(b"\n"))
        .unwrap_or(false);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open scope file {}", path.display()))?;

    let prefix = if needs_newline { "\n" } else { "" };
    writeln!(file, "{prefix}{profile},{account_id}")
        .with_context(|| format!("Could not write scope file {}", path.display()))?;

    log::info!("Added {profile},{account_id} to {}", path.display());
    Ok(())
}
