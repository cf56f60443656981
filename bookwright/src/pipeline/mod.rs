//! The generation pipeline: orchestrator, prompt construction, and
//! final book assembly.

mod assembly;
mod orchestrator;
mod prompts;

pub use assembly::assemble_book;
pub use orchestrator::BookPipeline;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Static pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on any single generation call. Large-context
    /// generation is slow, so this is on the order of minutes. Firing
    /// takes the same path as explicit cancellation and classifies as
    /// a network failure.
    pub request_timeout: Duration,
    /// How many prior completed modules feed the next module's prompt.
    pub context_window: usize,
    /// Per-module character cap when building that context.
    pub context_chars_per_module: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(300),
            context_window: 2,
            context_chars_per_module: 4_000,
        }
    }
}

impl PipelineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the prior-module context window.
    #[must_use]
    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }
}

/// An immutable snapshot of user configuration, consumed at call start.
///
/// There is no live mutable settings object inside the pipeline; a
/// settings change mid-run only affects calls the caller makes with a
/// new session value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSession {
    /// Provider label, for logging only.
    pub provider: String,
    /// Model label, for logging only.
    pub model: String,
    /// Output language preference.
    pub language: String,
    /// Token limit per call.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Whether module generation should stream chunks.
    pub stream: bool,
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self {
            provider: "default".to_string(),
            model: "default".to_string(),
            language: "en".to_string(),
            max_tokens: 4_096,
            temperature: 0.7,
            stream: false,
        }
    }
}

/// How a module-loop invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Every targeted module reached a terminal result (completed or
    /// permanently failed).
    Finished,
    /// The pause flag was honored at an iteration boundary.
    Paused,
    /// An in-flight call was cancelled; state is as last checkpointed.
    Cancelled,
    /// The user chose to switch provider/model; the caller must
    /// re-invoke with a new session.
    SwitchRequested,
}
