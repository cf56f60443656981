//! The project: one user-requested book end to end.

use super::{word_count, Complexity, ModuleResult, ProjectStatus, Roadmap};
use crate::errors::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User input captured when a project is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRequest {
    /// The learning goal, e.g. "understand async Rust".
    pub goal: String,
    /// Who the book is for.
    pub audience: String,
    /// Target complexity.
    pub complexity: Complexity,
    /// BCP-47-ish language tag, e.g. "en".
    pub language: String,
    /// Free-form category tag.
    pub category: String,
    /// Why the user wants this book.
    pub reasoning: String,
}

/// One user-requested book and everything generated for it.
///
/// Mutations always flow through the orchestrator; observers receive a
/// full-record clone on every change rather than field-level deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Opaque unique id, immutable after creation.
    pub id: Uuid,
    /// The original request.
    pub request: ProjectRequest,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Overall completion percentage, 0-100.
    pub progress: u8,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// Message for `Error` status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The assembled book, present once status is `Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_book: Option<String>,
    /// Aggregate word count of the final book.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_words: Option<usize>,
    /// The generation plan, once created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roadmap: Option<Roadmap>,
    /// Generated module results, ordered by creation.
    #[serde(default)]
    pub modules: Vec<ModuleResult>,
}

impl Project {
    /// Creates a project in `Planning` status from a user request.
    #[must_use]
    pub fn new(request: ProjectRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request,
            created_at: now,
            updated_at: now,
            progress: 0,
            status: ProjectStatus::Planning,
            error: None,
            final_book: None,
            total_words: None,
            roadmap: None,
            modules: Vec::new(),
        }
    }

    /// Bumps the update timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Transitions the project status, enforcing the state machine.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTransition`] for a forbidden move.
    pub fn set_status(&mut self, to: ProjectStatus) -> Result<(), PipelineError> {
        if !self.status.can_transition(to) {
            return Err(PipelineError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        if self.status != to {
            tracing::debug!(project_id = %self.id, from = %self.status, to = %to, "project status transition");
        }
        self.status = to;
        if to != ProjectStatus::Error {
            self.error = None;
        }
        self.touch();
        Ok(())
    }

    /// Moves the project to `Error` with a message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = ProjectStatus::Error;
        self.error = Some(message.into());
        self.touch();
    }

    /// Returns the result for a roadmap module id, if one exists.
    #[must_use]
    pub fn module_result(&self, module_id: &str) -> Option<&ModuleResult> {
        self.modules.iter().find(|m| m.module_id == module_id)
    }

    /// Inserts a result, replacing any prior result for the same
    /// roadmap module id. A retry never leaves an error+success pair.
    pub fn upsert_module_result(&mut self, result: ModuleResult) {
        match self
            .modules
            .iter_mut()
            .find(|m| m.module_id == result.module_id)
        {
            Some(existing) => *existing = result,
            None => self.modules.push(result),
        }
        self.touch();
    }

    /// Ids of roadmap modules with a completed result, in roadmap order.
    #[must_use]
    pub fn completed_module_ids(&self) -> Vec<String> {
        let Some(roadmap) = &self.roadmap else {
            return Vec::new();
        };
        roadmap
            .modules
            .iter()
            .filter(|m| self.module_result(&m.id).is_some_and(ModuleResult::is_completed))
            .map(|m| m.id.clone())
            .collect()
    }

    /// Returns true if every roadmap module has a completed result.
    #[must_use]
    pub fn all_modules_completed(&self) -> bool {
        match &self.roadmap {
            Some(roadmap) => {
                !roadmap.modules.is_empty()
                    && roadmap.modules.iter().all(|m| {
                        self.module_result(&m.id).is_some_and(ModuleResult::is_completed)
                    })
            }
            None => false,
        }
    }

    /// Completion percentage derived from completed modules.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        let Some(roadmap) = &self.roadmap else { return 0 };
        if roadmap.modules.is_empty() {
            return 0;
        }
        let done = self.completed_module_ids().len();
        let pct = done * 100 / roadmap.modules.len();
        u8::try_from(pct.min(100)).unwrap_or(100)
    }

    /// Sum of word counts across completed module results.
    #[must_use]
    pub fn generated_words(&self) -> usize {
        self.modules
            .iter()
            .filter(|m| m.is_completed())
            .map(|m| m.word_count)
            .sum()
    }

    /// Replaces the final book text and recomputes the aggregate word
    /// count. Also used when the user hand-edits the assembled text.
    pub fn set_final_book(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.total_words = Some(word_count(&text));
        self.final_book = Some(text);
        self.touch();
    }

    /// Recomputes `progress` and `total_words` from current state.
    pub fn recompute_totals(&mut self) {
        self.progress = self.progress_percent();
        if let Some(book) = &self.final_book {
            self.total_words = Some(word_count(book));
        }
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{ModuleStatus, RoadmapModule};
    use pretty_assertions::assert_eq;

    fn roadmap_module(id: &str) -> RoadmapModule {
        RoadmapModule {
            id: id.to_string(),
            title: format!("Module {id}"),
            objectives: vec!["an objective".to_string()],
            estimated_time: String::new(),
        }
    }

    fn project_with_roadmap(ids: &[&str]) -> Project {
        let mut project = Project::new(ProjectRequest {
            goal: "learn Rust".to_string(),
            ..ProjectRequest::default()
        });
        let modules = ids.iter().map(|id| roadmap_module(id)).collect();
        project.roadmap = Some(Roadmap::new(modules, Complexity::Beginner));
        project
    }

    #[test]
    fn test_new_project_defaults() {
        let project = Project::new(ProjectRequest::default());
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.progress, 0);
        assert!(project.roadmap.is_none());
        assert!(project.modules.is_empty());
    }

    #[test]
    fn test_set_status_enforces_machine() {
        let mut project = Project::new(ProjectRequest::default());
        assert!(project.set_status(ProjectStatus::Completed).is_err());
        assert!(project.set_status(ProjectStatus::RoadmapCompleted).is_ok());
        assert_eq!(project.status, ProjectStatus::RoadmapCompleted);
    }

    #[test]
    fn test_fail_records_message() {
        let mut project = Project::new(ProjectRequest::default());
        project.fail("provider exploded");
        assert_eq!(project.status, ProjectStatus::Error);
        assert_eq!(project.error.as_deref(), Some("provider exploded"));
    }

    #[test]
    fn test_upsert_replaces_by_module_id() {
        let mut project = project_with_roadmap(&["m1"]);
        let module = roadmap_module("m1");

        project.upsert_module_result(ModuleResult::failed(&module, "boom"));
        assert_eq!(project.modules.len(), 1);
        assert_eq!(project.modules[0].status, ModuleStatus::Error);

        project.upsert_module_result(ModuleResult::completed(&module, "all good"));
        assert_eq!(project.modules.len(), 1);
        assert_eq!(project.modules[0].status, ModuleStatus::Completed);
    }

    #[test]
    fn test_completed_ids_follow_roadmap_order() {
        let mut project = project_with_roadmap(&["m1", "m2", "m3"]);
        // Complete out of order.
        project.upsert_module_result(ModuleResult::completed(&roadmap_module("m3"), "c"));
        project.upsert_module_result(ModuleResult::completed(&roadmap_module("m1"), "a"));

        assert_eq!(project.completed_module_ids(), vec!["m1", "m3"]);
        assert!(!project.all_modules_completed());

        project.upsert_module_result(ModuleResult::completed(&roadmap_module("m2"), "b"));
        assert!(project.all_modules_completed());
    }

    #[test]
    fn test_progress_percent() {
        let mut project = project_with_roadmap(&["m1", "m2", "m3", "m4"]);
        assert_eq!(project.progress_percent(), 0);

        project.upsert_module_result(ModuleResult::completed(&roadmap_module("m1"), "x"));
        assert_eq!(project.progress_percent(), 25);

        for id in ["m2", "m3", "m4"] {
            project.upsert_module_result(ModuleResult::completed(&roadmap_module(id), "x"));
        }
        assert_eq!(project.progress_percent(), 100);
    }

    #[test]
    fn test_set_final_book_recomputes_words() {
        let mut project = project_with_roadmap(&["m1"]);
        project.set_final_book("five words are in here");
        assert_eq!(project.total_words, Some(5));

        // Hand-edit of the assembled text recomputes the aggregate.
        project.set_final_book("now only four words");
        assert_eq!(project.total_words, Some(4));
    }

    #[test]
    fn test_generated_words_sums_completed_only() {
        let mut project = project_with_roadmap(&["m1", "m2"]);
        project.upsert_module_result(ModuleResult::completed(&roadmap_module("m1"), "one two three"));
        project.upsert_module_result(ModuleResult::failed(&roadmap_module("m2"), "nope"));
        assert_eq!(project.generated_words(), 3);
    }
}
