//! Failure recovery: classification, backoff, and user-mediated
//! retry decisions.
//!
//! Module-generation failures never silently auto-retry against a paid
//! API. Below the attempt limit the loop suspends in a `waiting_retry`
//! state and the user resolves it with retry, switch, or skip; at the
//! limit (or with nobody listening) the module is marked permanently
//! failed and the loop moves on.

mod classify;
mod gate;
mod policy;

pub use classify::{classify, suggested_wait, wait_hint, FailureKind};
pub use gate::{DecisionGate, GateSignal};
pub use policy::RetryPolicy;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The user's resolution of a `waiting_retry` suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryDecision {
    /// Re-invoke the same module immediately; attempt count increments.
    Retry,
    /// The caller will swap provider/model configuration and re-invoke;
    /// the loop returns control without touching the module.
    Switch,
    /// Mark the module permanently failed and continue with the next one.
    Skip,
}

/// Everything the UI needs to present a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryInfo {
    /// Title of the failing module.
    pub module_title: String,
    /// Human-readable error text.
    pub error: String,
    /// Failure classification driving the recommended action.
    pub kind: FailureKind,
    /// Current attempt number (1-based).
    pub attempt: u32,
    /// Configured attempt limit.
    pub max_attempts: u32,
    /// Recommended wait before retrying.
    pub wait: Duration,
}
