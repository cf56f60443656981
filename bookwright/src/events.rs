//! The status/event bus between the orchestrator and its observers.
//!
//! Events flow through a broadcast channel so any number of UI surfaces
//! can watch the same run; a subscriber that falls behind observes a
//! `Lagged` error and simply picks up at the next event, which is safe
//! because every event carries a self-contained full-record snapshot.
//! Commands travel the other way as direct method calls on the
//! orchestrator, which accepts or ignores them based on current state.

use crate::book::Project;
use crate::recovery::RetryInfo;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Overall run status carried in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// No run active.
    Idle,
    /// Module generation in progress.
    Generating,
    /// Pause flag honored; loop suspended at an iteration boundary.
    Paused,
    /// Suspended on a failure, awaiting a user decision.
    WaitingRetry,
    /// Run finished; final book assembled.
    Completed,
    /// Run failed.
    Error,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Generating => write!(f, "generating"),
            Self::Paused => write!(f, "paused"),
            Self::WaitingRetry => write!(f, "waiting_retry"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The module currently being generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentModule {
    /// Roadmap module id.
    pub id: String,
    /// Module title.
    pub title: String,
    /// Attempt number for this module (1-based).
    pub attempt: u32,
    /// Per-module progress, 0-100.
    pub progress: u8,
    /// Text streamed so far, when the provider streams.
    pub partial_text: String,
}

/// A point-in-time view of a generation run.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Owning project.
    pub project_id: Uuid,
    /// Overall run status.
    pub status: RunStatus,
    /// The in-flight module, when generating.
    pub current_module: Option<CurrentModule>,
    /// Total progress percentage, 0-100.
    pub progress: u8,
    /// Human-readable log line.
    pub message: String,
    /// Running total of generated words.
    pub total_words: usize,
    /// Present only when `status` is `WaitingRetry`.
    pub retry: Option<RetryInfo>,
}

impl StatusSnapshot {
    /// Creates a snapshot with no current module or retry info.
    #[must_use]
    pub fn new(project_id: Uuid, status: RunStatus, message: impl Into<String>) -> Self {
        Self {
            project_id,
            status,
            current_module: None,
            progress: 0,
            message: message.into(),
            total_words: 0,
            retry: None,
        }
    }
}

/// Events published by the orchestrator.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The project record changed; a full copy replaces any prior view.
    ProjectUpdated(Box<Project>),
    /// A run status snapshot.
    Status(StatusSnapshot),
}

/// Multi-subscriber event bus over a broadcast channel.
#[derive(Debug, Clone)]
pub struct StatusBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl StatusBus {
    /// Creates a bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publishes an event. Publishing with no subscribers is a no-op.
    pub fn publish(&self, event: PipelineEvent) {
        // SendError only means nobody is listening right now.
        let _ = self.tx.send(event);
    }
}
