//! # fanout
//!
//! Run one AWS CLI command across many accounts and regions and merge the
//! results into a single report.
//!
//! A run has three stages, each joined before the next starts:
//! 1. Planning - validate profiles, resolve every account's regions and
//!    missing account ids ([`plan`])
//! 2. Dispatch - one invocation per (account, region) pair on a worker
//!    pool, each output classified as JSON or text ([`dispatch`])
//! 3. Rendering - provenance-tagged records in scope/region order, as one
//!    JSON document or as plain-text blocks ([`render`])
//!
//! ## Example
//!
//! ```no_run
//! use fanout::{AwsCli, NoProgress, RunConfig, ScopeEntry};
//!
//! let aws = AwsCli::default();
//! let config = RunConfig::new(
//!     vec![ScopeEntry::new("dev"), ScopeEntry::new("prod")],
//!     vec!["ec2".into(), "describe-vpcs".into()],
//! )
//! .with_regions(Some(vec!["all".into()]));
//!
//! let plan = fanout::plan(&config, &aws).expect("planning failed");
//! let accounts = fanout::dispatch(plan.accounts, &plan.template, &aws, config.jobs, &NoProgress)
//!     .expect("dispatch failed");
//! println!("{}", fanout::render(&accounts));
//! ```

pub mod backend;
pub mod classify;
pub mod context;
pub mod error;
pub mod planner;
pub mod region;
pub mod report;
pub mod scheduler;
pub mod types;

pub use backend::aws::AwsCli;
pub use backend::{Executor, Registry};
pub use classify::{classify, derive_key};
pub use context::{NoProgress, ProgressCallback};
pub use error::{Error, ErrorCategory, Result};
pub use planner::{Plan, RunConfig, plan};
pub use region::{RegionPolicy, resolve};
pub use report::{RenderedReport, render};
pub use scheduler::{DEFAULT_JOBS, dispatch};
pub use types::{Account, CommandOutput, CommandTemplate, Invocation, Outcome, ScopeEntry};

/// Plan, dispatch and render in one call.
///
/// Convenience for callers that do not need to act between planning and
/// dispatch (such as persisting discovered account ids).
pub fn run(
    config: &RunConfig,
    registry: &dyn Registry,
    executor: &dyn Executor,
    progress: &dyn ProgressCallback,
) -> Result<RenderedReport> {
    let plan = plan(config, registry)?;
    let accounts = dispatch(plan.accounts, &plan.template, executor, config.jobs, progress)?;
    Ok(render(&accounts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Two-profile fake AWS: serves both registry and executor roles.
    struct FakeAws;

    impl Registry for FakeAws {
        fn list_profiles(&self) -> Result<Vec<String>> {
            Ok(vec!["dev".into(), "prod".into()])
        }

        fn default_region(&self, _profile: &str) -> Result<Option<String>> {
            Ok(Some("us-west-2".into()))
        }

        fn account_id(&self, profile: &str) -> Result<String> {
            Err(Error::registry(format!("unexpected lookup for {profile}")))
        }
    }

    impl Executor for FakeAws {
        fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
            let instance = format!("i-{}", invocation.profile);
            Ok(CommandOutput {
                stdout: json!({"Reservations": [{"Instances": [{"InstanceId": instance}]}]})
                    .to_string(),
                stderr: String::new(),
                success: true,
            })
        }
    }

    #[test]
    fn test_end_to_end_structured() {
        let config = RunConfig::new(
            vec![
                ScopeEntry::with_account("dev", "111"),
                ScopeEntry::with_account("prod", "222"),
            ],
            vec![
                "describe-instances".into(),
                "--region".into(),
                "us-east-1".into(),
            ],
        );

        let report = run(&config, &FakeAws, &FakeAws, &NoProgress).unwrap();
        let RenderedReport::Document(values) = &report else {
            panic!("expected structured report");
        };

        assert_eq!(
            values,
            &vec![
                json!({
                    "Reservations": [{"Instances": [{"InstanceId": "i-dev"}]}],
                    "Profile": "dev",
                    "Account": "111",
                    "Region": "us-east-1"
                }),
                json!({
                    "Reservations": [{"Instances": [{"InstanceId": "i-prod"}]}],
                    "Profile": "prod",
                    "Account": "222",
                    "Region": "us-east-1"
                }),
            ]
        );

        let parsed: serde_json::Value = serde_json::from_str(&report.to_string()).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_end_to_end_unknown_profile_dispatches_nothing() {
        let config = RunConfig::new(
            vec![ScopeEntry::with_account("stage", "333")],
            vec!["ec2".into(), "describe-vpcs".into()],
        );
        let err = run(&config, &FakeAws, &FakeAws, &NoProgress).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Profile);
    }
}
