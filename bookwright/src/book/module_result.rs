//! Generated content for one roadmap module.

use super::{ModuleStatus, RoadmapModule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counts whitespace-delimited non-empty tokens.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// The output of generating one roadmap module's content.
///
/// At most one result exists per roadmap module id on a project; a retry
/// replaces the prior result rather than appending a second one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleResult {
    /// Unique id of this result record.
    pub id: Uuid,
    /// Back-reference to the roadmap module.
    pub module_id: String,
    /// Title copied from the roadmap module.
    pub title: String,
    /// Generated text; empty while pending or after a failure.
    pub content: String,
    /// Derived from `content`; recomputed on every content change.
    pub word_count: usize,
    /// Result status.
    pub status: ModuleStatus,
    /// When this result was produced.
    pub generated_at: DateTime<Utc>,
    /// Error text for failed results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModuleResult {
    /// Creates a completed result from generated content.
    #[must_use]
    pub fn completed(module: &RoadmapModule, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: Uuid::new_v4(),
            module_id: module.id.clone(),
            title: module.title.clone(),
            word_count: word_count(&content),
            content,
            status: ModuleStatus::Completed,
            generated_at: Utc::now(),
            error: None,
        }
    }

    /// Creates a permanently failed result.
    #[must_use]
    pub fn failed(module: &RoadmapModule, error: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            module_id: module.id.clone(),
            title: module.title.clone(),
            content: String::new(),
            word_count: 0,
            status: ModuleStatus::Error,
            generated_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    /// Replaces the content, recomputing the word count.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.word_count = word_count(&self.content);
    }

    /// Returns true if this result completed successfully.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == ModuleStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> RoadmapModule {
        RoadmapModule {
            id: "m1".to_string(),
            title: "Introduction".to_string(),
            objectives: vec!["understand the basics".to_string()],
            estimated_time: "20 minutes".to_string(),
        }
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   "), 0);
        assert_eq!(word_count("one"), 1);
        assert_eq!(word_count("one  two\nthree\t four "), 4);
    }

    #[test]
    fn test_completed_result() {
        let result = ModuleResult::completed(&module(), "hello brave new world");
        assert_eq!(result.module_id, "m1");
        assert_eq!(result.title, "Introduction");
        assert_eq!(result.word_count, 4);
        assert!(result.is_completed());
        assert!(result.error.is_none());
    }

    #[test]
    fn test_failed_result() {
        let result = ModuleResult::failed(&module(), "rate limited");
        assert_eq!(result.status, ModuleStatus::Error);
        assert_eq!(result.word_count, 0);
        assert_eq!(result.error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn test_set_content_recomputes_word_count() {
        let mut result = ModuleResult::completed(&module(), "two words");
        assert_eq!(result.word_count, 2);

        result.set_content("now there are five words");
        assert_eq!(result.word_count, 5);
    }
}
