//! Region resolution.
//!
//! Computes the ordered, duplicate-free set of regions a command targets for
//! one profile. Resolution runs for every account before any command is
//! dispatched, so a bad region aborts the run before any remote call.

use crate::backend::Registry;
use crate::error::{Error, Result};

/// Every region a command may target, in report order.
pub const REGION_CATALOG: &[&str] = &[
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ca-central-1",
    "eu-central-1",
    "eu-north-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

/// Services without regional partitioning, and the region they answer in.
pub const GLOBAL_SERVICES: &[(&str, &str)] = &[
    ("budgets", "us-east-1"),
    ("ce", "us-east-1"),
    ("cloudfront", "us-east-1"),
    ("globalaccelerator", "us-west-2"),
    ("iam", "us-east-1"),
    ("organizations", "us-east-1"),
    ("route53", "us-east-1"),
    ("sts", "us-east-1"),
];

/// Requested-region sentinel expanding to the whole catalog.
pub const ALL_REGIONS: &str = "all";

/// Requested-region sentinel replaced by the profile's default region.
pub const DEFAULT_REGION: &str = "default";

/// Command flag carrying a region inside the user's command.
pub const REGION_FLAG: &str = "--region";

/// Check if a region is in the catalog
pub fn is_known_region(region: &str) -> bool {
    REGION_CATALOG.contains(&region)
}

/// The pinned region for a global service, if `service` is one.
pub fn global_region(service: &str) -> Option<&'static str> {
    GLOBAL_SERVICES
        .iter()
        .find(|(name, _)| *name == service)
        .map(|(_, region)| *region)
}

/// Split a comma-separated region list, dropping empty entries.
pub fn parse_region_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a region value the user supplied; an empty list is invalid.
pub fn parse_requested_regions(value: &str) -> Result<Vec<String>> {
    let regions = parse_region_list(value);
    if regions.is_empty() {
        return Err(Error::InvalidRegion {
            regions: vec![format!("{value:?}")],
        });
    }
    Ok(regions)
}

/// Region inputs for one run, built once during planning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionPolicy {
    /// Requested regions; may contain `all` or `default`
    pub requested: Option<Vec<String>>,
    /// Ignore global-service pinning
    pub global_override: bool,
    /// First word of the command (the service)
    pub command_head: String,
}

impl RegionPolicy {
    /// Build a policy from the user's command.
    ///
    /// Any `--region X` (or `--region=X`) pair inside the command is lifted
    /// out; the returned command no longer carries it. An explicit
    /// `requested` list takes precedence over regions found in the command.
    /// A `--region` without a value, or with an empty one, is an invalid
    /// region rather than a fall back to the profile default.
    pub fn from_command(
        command: &[String],
        requested: Option<Vec<String>>,
        global_override: bool,
    ) -> Result<(Self, Vec<String>)> {
        let mut embedded = Vec::new();
        let mut remaining = Vec::with_capacity(command.len());
        let mut tokens = command.iter();

        while let Some(token) = tokens.next() {
            if token == REGION_FLAG {
                let value = tokens.next().ok_or_else(|| Error::InvalidRegion {
                    regions: vec![format!("{REGION_FLAG} without a value")],
                })?;
                embedded.extend(parse_requested_regions(value)?);
            } else if let Some(value) = token.strip_prefix("--region=") {
                embedded.extend(parse_requested_regions(value)?);
            } else {
                remaining.push(token.clone());
            }
        }

        let requested = requested
            .filter(|r| !r.is_empty())
            .or_else(|| (!embedded.is_empty()).then_some(embedded));

        let policy = Self {
            requested,
            global_override,
            command_head: remaining.first().cloned().unwrap_or_default(),
        };
        Ok((policy, remaining))
    }
}

/// Resolve the regions `profile` should be queried in.
///
/// Priority: global-service pinning, then the profile default when nothing
/// was requested, then `all`, then the validated requested list. The result
/// is never empty and holds each region once, in first-seen order.
pub fn resolve(
    profile: &str,
    policy: &RegionPolicy,
    registry: &dyn Registry,
) -> Result<Vec<String>> {
    if !policy.global_override
        && let Some(region) = global_region(&policy.command_head)
    {
        log::debug!(
            "{profile}: {} is global, pinned to {region}",
            policy.command_head
        );
        return Ok(vec![region.to_string()]);
    }

    let requested = match policy.requested.as_deref() {
        None | Some([]) => {
            let region = default_region(profile, registry)?;
            log::debug!("{profile}: using default region {region}");
            return Ok(vec![region]);
        }
        Some(requested) => requested,
    };

    if requested.iter().any(|r| r.eq_ignore_ascii_case(ALL_REGIONS)) {
        return Ok(REGION_CATALOG.iter().map(|r| r.to_string()).collect());
    }

    let mut default = None;
    let mut regions = Vec::with_capacity(requested.len());
    for region in requested {
        if region.eq_ignore_ascii_case(DEFAULT_REGION) {
            if default.is_none() {
                default = Some(default_region(profile, registry)?);
            }
            regions.extend(default.clone());
        } else {
            regions.push(region.clone());
        }
    }

    let invalid: Vec<String> = regions
        .iter()
        .filter(|r| !is_known_region(r))
        .cloned()
        .collect();
    if !invalid.is_empty() {
        return Err(Error::InvalidRegion { regions: invalid });
    }

    Ok(dedup(regions))
}

/// Look up the profile default, requiring it to be a catalog region.
fn default_region(profile: &str, registry: &dyn Registry) -> Result<String> {
    match registry.default_region(profile)? {
        Some(region) if is_known_region(&region) => Ok(region),
        configured => Err(Error::NoRegion {
            profile: profile.to_string(),
            configured,
        }),
    }
}

fn dedup(regions: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(regions.len());
    for region in regions {
        if !unique.contains(&region) {
            unique.push(region);
        }
    }
    unique
}
