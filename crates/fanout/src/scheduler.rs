//! Fan-out scheduler - one invocation per (account, region) pair, run on a
//! rayon pool, joined before anything is reported.

use crate::backend::Executor;
use crate::classify::classify;
use crate::context::ProgressCallback;
use crate::error::{Error, Result};
use crate::types::{Account, CommandTemplate, Invocation, Outcome};
use rayon::prelude::*;

/// Default number of concurrent invocations
pub const DEFAULT_JOBS: usize = 8;

/// Build a worker pool with `jobs` threads (at least one).
pub(crate) fn pool(jobs: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))
}

/// One planned invocation and the account slot it fills.
struct Task {
    account: usize,
    invocation: Invocation,
}

/// Run `template` once for every region of every account.
///
/// Waits for every invocation before returning. The first invocation that
/// writes to stderr fails the whole run and all other results are dropped.
/// Outcomes are stored on the accounts, so report order never depends on
/// completion order.
pub fn dispatch(
    mut accounts: Vec<Account>,
    template: &CommandTemplate,
    executor: &dyn Executor,
    jobs: usize,
    progress: &dyn ProgressCallback,
) -> Result<Vec<Account>> {
    let tasks: Vec<Task> = accounts
        .iter()
        .enumerate()
        .flat_map(|(index, account)| {
            account.regions().iter().map(move |region| Task {
                account: index,
                invocation: template.invocation(&account.profile, region),
            })
        })
        .collect();

    log::info!(
        "Dispatching {} invocation(s) across {} account(s)",
        tasks.len(),
        accounts.len()
    );
    progress.on_dispatch_start(tasks.len());

    let pool = pool(jobs)?;
    let results: Result<Vec<Outcome>> = pool.install(|| {
        tasks
            .par_iter()
            .map(|task| run_task(&task.invocation, template, executor, progress))
            .collect()
    });

    progress.on_dispatch_complete();
    let outcomes = results?;

    for (task, outcome) in tasks.iter().zip(outcomes) {
        accounts[task.account].record(&task.invocation.region, outcome)?;
    }

    Ok(accounts)
}

/// Run and classify one invocation.
fn run_task(
    invocation: &Invocation,
    template: &CommandTemplate,
    executor: &dyn Executor,
    progress: &dyn ProgressCallback,
) -> Result<Outcome> {
    let output = executor.execute(invocation)?;

    if !output.stderr.is_empty() {
        log::debug!(
            "{}/{} wrote to stderr, aborting run",
            invocation.profile,
            invocation.region
        );
        return Err(Error::Execution {
            invocation: invocation.to_string(),
            stderr: output.stderr.trim_end().to_string(),
        });
    }
    if !output.success {
        log::warn!("{invocation} exited unsuccessfully without stderr output");
    }

    let outcome = classify(&output.stdout, template.command());
    log::debug!(
        "{}/{}: {}",
        invocation.profile,
        invocation.region,
        if outcome.is_opaque() { "text" } else { "json" }
    );
    progress.on_invocation_complete(invocation, &outcome);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::types::CommandOutput;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes profile/region as JSON; earlier regions sleep longer so
    /// completion order is the reverse of plan order.
    struct EchoExecutor {
        calls: AtomicUsize,
        fail_on: Option<(String, String)>,
    }

    impl EchoExecutor {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: None,
            }
        }

        fn failing(profile: &str, region: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: Some((profile.to_string(), region.to_string())),
            }
        }
    }

    impl Executor for EchoExecutor {
        fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = match invocation.region.as_str() {
                "us-east-1" => 30,
                "us-east-2" => 15,
                _ => 0,
            };
            std::thread::sleep(Duration::from_millis(delay));

            if let Some((profile, region)) = &self.fail_on
                && *profile == invocation.profile
                && *region == invocation.region
            {
                return Ok(CommandOutput {
                    stdout: String::new(),
                    stderr: "An error occurred (UnauthorizedOperation)\n".into(),
                    success: false,
                });
            }

            Ok(CommandOutput {
                stdout: json!({"Who": invocation.profile, "Where": invocation.region})
                    .to_string(),
                stderr: String::new(),
                success: true,
            })
        }
    }

    struct TextExecutor;

    impl Executor for TextExecutor {
        fn execute(&self, _invocation: &Invocation) -> Result<CommandOutput> {
            Ok(CommandOutput {
                stdout: "2024-01-01 00:00:00 bucket\n".into(),
                stderr: String::new(),
                success: true,
            })
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        started: Mutex<Option<usize>>,
        completed: Mutex<Vec<String>>,
        finished: AtomicUsize,
    }

    impl ProgressCallback for RecordingProgress {
        fn on_dispatch_start(&self, total: usize) {
            *self.started.lock().unwrap() = Some(total);
        }

        fn on_invocation_complete(&self, invocation: &Invocation, _outcome: &Outcome) {
            self.completed
                .lock()
                .unwrap()
                .push(format!("{}/{}", invocation.profile, invocation.region));
        }

        fn on_dispatch_complete(&self) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn accounts() -> Vec<Account> {
        vec![
            Account::new("a", "111", vec!["us-east-1".into(), "us-east-2".into()]),
            Account::new("b", "222", vec!["us-east-1".into()]),
        ]
    }

    fn template() -> CommandTemplate {
        CommandTemplate::new("aws", vec!["ec2".into(), "describe-vpcs".into()])
    }

    #[test]
    fn test_dispatch_fills_every_region() {
        let executor = EchoExecutor::new();
        let done = dispatch(accounts(), &template(), &executor, 4, &NoProgress).unwrap();

        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);
        assert!(done.iter().all(Account::is_complete));
        assert_eq!(
            done[0].outcome("us-east-2"),
            Some(&Outcome::Structured(
                json!({"Who": "a", "Where": "us-east-2"})
            ))
        );
        assert_eq!(
            done[1].outcome("us-east-1"),
            Some(&Outcome::Structured(
                json!({"Who": "b", "Where": "us-east-1"})
            ))
        );
    }

    #[test]
    fn test_dispatch_aborts_on_stderr() {
        let executor = EchoExecutor::failing("a", "us-east-2");
        let err = dispatch(accounts(), &template(), &executor, 4, &NoProgress).unwrap_err();

        match err {
            Error::Execution { invocation, stderr } => {
                assert!(invocation.contains("--profile a --region us-east-2"));
                assert_eq!(stderr, "An error occurred (UnauthorizedOperation)");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dispatch_single_worker() {
        let executor = EchoExecutor::new();
        let done = dispatch(accounts(), &template(), &executor, 0, &NoProgress).unwrap();
        assert!(done.iter().all(Account::is_complete));
    }

    #[test]
    fn test_dispatch_reports_progress() {
        let progress = RecordingProgress::default();
        dispatch(accounts(), &template(), &EchoExecutor::new(), 3, &progress).unwrap();

        assert_eq!(*progress.started.lock().unwrap(), Some(3));
        let mut completed = progress.completed.lock().unwrap().clone();
        completed.sort();
        assert_eq!(completed, vec!["a/us-east-1", "a/us-east-2", "b/us-east-1"]);
        assert_eq!(progress.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_marks_text_output_opaque() {
        let template = CommandTemplate::new("aws", vec!["s3".into(), "ls".into()])
            .with_text_services(vec!["s3".into()]);
        let done = dispatch(accounts(), &template, &TextExecutor, 2, &NoProgress).unwrap();
        assert!(done.iter().all(Account::is_opaque));
    }

    #[test]
    fn test_dispatch_without_accounts() {
        let progress = RecordingProgress::default();
        let done = dispatch(Vec::new(), &template(), &EchoExecutor::new(), 2, &progress).unwrap();
        assert!(done.is_empty());
        assert_eq!(*progress.started.lock().unwrap(), Some(0));
    }
}
