//! Progress reporting hooks.
//!
//! Lets the scheduler report progress without depending on a terminal UI.

use crate::types::{Invocation, Outcome};

/// Progress callback for dispatch.
///
/// Called from worker threads, so implementations take `&self`.
pub trait ProgressCallback: Send + Sync {
    /// Called once before any invocation starts
    fn on_dispatch_start(&self, total: usize);

    /// Called when one invocation has been classified
    fn on_invocation_complete(&self, invocation: &Invocation, outcome: &Outcome);

    /// Called once after every invocation finished, or the run aborted
    fn on_dispatch_complete(&self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_dispatch_start(&self, _total: usize) {}
    fn on_invocation_complete(&self, _invocation: &Invocation, _outcome: &Outcome) {}
    fn on_dispatch_complete(&self) {}
}
