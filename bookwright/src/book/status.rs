//! Status enums for projects and module results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target complexity of a generated book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    /// No prior knowledge assumed.
    Beginner,
    /// Some familiarity with the subject.
    Intermediate,
    /// Deep treatment for practitioners.
    Advanced,
}

impl Default for Complexity {
    fn default() -> Self {
        Self::Beginner
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// The lifecycle status of a project.
///
/// This is a single tagged value rather than a set of loose flags; the
/// [`can_transition`](ProjectStatus::can_transition) function is the one
/// place legal moves are defined. `RoadmapCompleted` doubles as the
/// "ready to assemble" marker once every module has a completed result;
/// `Completed` is reserved for after assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Created; roadmap not yet generated.
    Planning,
    /// Roadmap exists; content generation has not finished.
    RoadmapCompleted,
    /// The module loop is running (or paused mid-run).
    GeneratingContent,
    /// Final summary and concatenation in progress.
    Assembling,
    /// Final book assembled.
    Completed,
    /// Unrecoverable failure; message stored on the project.
    Error,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Planning
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::RoadmapCompleted => write!(f, "roadmap_completed"),
            Self::GeneratingContent => write!(f, "generating_content"),
            Self::Assembling => write!(f, "assembling"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl ProjectStatus {
    /// Returns true if the project can move from `self` to `to`.
    #[must_use]
    pub fn can_transition(self, to: Self) -> bool {
        if self == to {
            return true;
        }
        match (self, to) {
            // Any state may fail.
            (_, Self::Error) => true,
            (Self::Planning, Self::RoadmapCompleted)
            | (Self::RoadmapCompleted, Self::GeneratingContent)
            | (Self::RoadmapCompleted, Self::Assembling)
            | (Self::GeneratingContent, Self::RoadmapCompleted)
            | (Self::Assembling, Self::Completed) => true,
            // Recovery from a failed run restarts the module loop.
            (Self::Error, Self::GeneratingContent | Self::RoadmapCompleted) => true,
            _ => false,
        }
    }

    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// The status of one module's generated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Generation has started but not finished.
    Pending,
    /// Content generated successfully.
    Completed,
    /// Generation failed permanently (skipped or exhausted).
    Error,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(ProjectStatus::RoadmapCompleted.to_string(), "roadmap_completed");
        assert_eq!(ModuleStatus::Error.to_string(), "error");
        assert_eq!(Complexity::Advanced.to_string(), "advanced");
    }

    #[test]
    fn test_happy_path_transitions() {
        assert!(ProjectStatus::Planning.can_transition(ProjectStatus::RoadmapCompleted));
        assert!(ProjectStatus::RoadmapCompleted.can_transition(ProjectStatus::GeneratingContent));
        assert!(ProjectStatus::GeneratingContent.can_transition(ProjectStatus::RoadmapCompleted));
        assert!(ProjectStatus::RoadmapCompleted.can_transition(ProjectStatus::Assembling));
        assert!(ProjectStatus::Assembling.can_transition(ProjectStatus::Completed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!ProjectStatus::Planning.can_transition(ProjectStatus::Completed));
        assert!(!ProjectStatus::Planning.can_transition(ProjectStatus::Assembling));
        assert!(!ProjectStatus::Completed.can_transition(ProjectStatus::GeneratingContent));
        assert!(!ProjectStatus::GeneratingContent.can_transition(ProjectStatus::Assembling));
    }

    #[test]
    fn test_any_state_can_fail() {
        for status in [
            ProjectStatus::Planning,
            ProjectStatus::RoadmapCompleted,
            ProjectStatus::GeneratingContent,
            ProjectStatus::Assembling,
            ProjectStatus::Completed,
        ] {
            assert!(status.can_transition(ProjectStatus::Error));
        }
    }

    #[test]
    fn test_self_transition_allowed() {
        assert!(ProjectStatus::GeneratingContent.can_transition(ProjectStatus::GeneratingContent));
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&ProjectStatus::GeneratingContent).unwrap();
        assert_eq!(json, "\"generating_content\"");
    }
}
