//! Prompt construction for the three generation stages.
//!
//! Prompts keep their size bounded: a module prompt carries only the
//! last few completed modules as context, each truncated, never the
//! full history.

use crate::book::{ModuleResult, Project, Roadmap, RoadmapModule};
use crate::pipeline::{GenerationSession, PipelineConfig};
use crate::provider::GenerationRequest;
use std::fmt::Write as _;

/// Truncates to a character budget on a char boundary.
fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Builds the roadmap-generation request.
#[must_use]
pub fn roadmap_request(project: &Project, session: &GenerationSession) -> GenerationRequest {
    let request = &project.request;
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Design a learning roadmap for a book that teaches: {}.",
        request.goal
    );
    let _ = writeln!(prompt, "Audience: {}.", request.audience);
    let _ = writeln!(prompt, "Complexity: {}.", request.complexity);
    if !request.category.is_empty() {
        let _ = writeln!(prompt, "Category: {}.", request.category);
    }
    if !request.reasoning.is_empty() {
        let _ = writeln!(prompt, "Motivation: {}.", request.reasoning);
    }
    let _ = writeln!(prompt, "Answer in {}.", session.language);
    prompt.push_str(
        "Respond with a single JSON object inside a ```json fence, shaped as:\n\
         {\"modules\": [{\"id\": \"module-1\", \"title\": \"...\", \"objectives\": [\"...\"], \
         \"estimated_time\": \"...\"}], \"estimated_reading_time\": \"...\", \
         \"difficulty\": \"beginner|intermediate|advanced\"}\n\
         Every module needs at least one objective. No text outside the fence.",
    );
    GenerationRequest::new(prompt)
        .with_max_tokens(session.max_tokens)
        .with_temperature(session.temperature)
}

/// Builds the content-generation request for one module.
///
/// `prior` is the bounded window of recently completed modules feeding
/// continuity; callers select it with [`context_window`].
#[must_use]
pub fn module_request(
    project: &Project,
    module: &RoadmapModule,
    prior: &[&ModuleResult],
    session: &GenerationSession,
    config: &PipelineConfig,
) -> GenerationRequest {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are writing one chapter of a book about: {}.",
        project.request.goal
    );
    let _ = writeln!(prompt, "Audience: {}.", project.request.audience);
    let _ = writeln!(prompt, "Chapter title: {}.", module.title);
    prompt.push_str("Learning objectives:\n");
    for objective in &module.objectives {
        let _ = writeln!(prompt, "- {objective}");
    }
    if !prior.is_empty() {
        prompt.push_str("\nFor continuity, the most recent completed chapters were:\n");
        for result in prior {
            let _ = writeln!(
                prompt,
                "\n### {}\n{}",
                result.title,
                truncate_chars(&result.content, config.context_chars_per_module)
            );
        }
    }
    let _ = writeln!(
        prompt,
        "\nWrite the full chapter in {}, in Markdown, covering every objective.",
        session.language
    );
    GenerationRequest::new(prompt)
        .with_max_tokens(session.max_tokens)
        .with_temperature(session.temperature)
}

/// Builds the final-summary request for assembly.
#[must_use]
pub fn summary_request(
    project: &Project,
    roadmap: &Roadmap,
    session: &GenerationSession,
) -> GenerationRequest {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Write a closing summary for a book about: {}.",
        project.request.goal
    );
    prompt.push_str("The book covered these chapters:\n");
    for module in &roadmap.modules {
        let _ = writeln!(prompt, "- {}", module.title);
    }
    let _ = writeln!(
        prompt,
        "Summarize the key takeaways in {}, in Markdown.",
        session.language
    );
    GenerationRequest::new(prompt)
        .with_max_tokens(session.max_tokens)
        .with_temperature(session.temperature)
}

/// Selects the bounded prior-context window for the module at
/// `index`: the last `config.context_window` completed results among
/// the roadmap modules before it, in roadmap order.
#[must_use]
pub fn context_window<'a>(
    project: &'a Project,
    roadmap: &Roadmap,
    index: usize,
    config: &PipelineConfig,
) -> Vec<&'a ModuleResult> {
    let mut window: Vec<&ModuleResult> = roadmap.modules[..index.min(roadmap.modules.len())]
        .iter()
        .filter_map(|m| project.module_result(&m.id))
        .filter(|r| r.is_completed())
        .collect();
    let keep = config.context_window.min(window.len());
    window.split_off(window.len() - keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{Complexity, ProjectRequest};
    use pretty_assertions::assert_eq;

    fn roadmap_module(id: &str) -> RoadmapModule {
        RoadmapModule {
            id: id.to_string(),
            title: format!("Chapter {id}"),
            objectives: vec!["objective one".to_string()],
            estimated_time: String::new(),
        }
    }

    fn project_with_completed(ids: &[&str]) -> (Project, Roadmap) {
        let mut project = Project::new(ProjectRequest {
            goal: "test-driven development".to_string(),
            audience: "working engineers".to_string(),
            ..ProjectRequest::default()
        });
        let roadmap = Roadmap::new(
            ids.iter().map(|id| roadmap_module(id)).collect(),
            Complexity::Beginner,
        );
        project.roadmap = Some(roadmap.clone());
        (project, roadmap)
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte safety.
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_roadmap_request_mentions_goal_and_shape() {
        let (project, _) = project_with_completed(&[]);
        let request = roadmap_request(&project, &GenerationSession::default());
        assert!(request.prompt.contains("test-driven development"));
        assert!(request.prompt.contains("```json"));
        assert!(request.prompt.contains("objectives"));
    }

    #[test]
    fn test_context_window_is_bounded_and_ordered() {
        let (mut project, roadmap) = project_with_completed(&["m1", "m2", "m3", "m4"]);
        for id in ["m1", "m2", "m3"] {
            project.upsert_module_result(crate::book::ModuleResult::completed(
                &roadmap_module(id),
                format!("content of {id}"),
            ));
        }
        let config = PipelineConfig::new().with_context_window(2);

        let window = context_window(&project, &roadmap, 3, &config);
        let titles: Vec<_> = window.iter().map(|r| r.module_id.as_str()).collect();
        assert_eq!(titles, vec!["m2", "m3"]);
    }

    #[test]
    fn test_context_window_skips_failed_and_later_modules() {
        let (mut project, roadmap) = project_with_completed(&["m1", "m2", "m3"]);
        project.upsert_module_result(crate::book::ModuleResult::completed(
            &roadmap_module("m1"),
            "good",
        ));
        project.upsert_module_result(crate::book::ModuleResult::failed(
            &roadmap_module("m2"),
            "bad",
        ));
        // m3 completed but sits after the target index; must not leak in.
        project.upsert_module_result(crate::book::ModuleResult::completed(
            &roadmap_module("m3"),
            "future",
        ));
        let config = PipelineConfig::default();

        let window = context_window(&project, &roadmap, 2, &config);
        let ids: Vec<_> = window.iter().map(|r| r.module_id.as_str()).collect();
        assert_eq!(ids, vec!["m1"]);
    }

    #[test]
    fn test_module_request_includes_context() {
        let (mut project, roadmap) = project_with_completed(&["m1", "m2"]);
        project.upsert_module_result(crate::book::ModuleResult::completed(
            &roadmap_module("m1"),
            "prior chapter text",
        ));
        let config = PipelineConfig::default();
        let window = context_window(&project, &roadmap, 1, &config);

        let request = module_request(
            &project,
            &roadmap.modules[1],
            &window,
            &GenerationSession::default(),
            &config,
        );
        assert!(request.prompt.contains("Chapter m2"));
        assert!(request.prompt.contains("prior chapter text"));
        assert!(request.prompt.contains("objective one"));
    }

    #[test]
    fn test_summary_request_lists_chapters() {
        let (project, roadmap) = project_with_completed(&["m1", "m2"]);
        let request = summary_request(&project, &roadmap, &GenerationSession::default());
        assert!(request.prompt.contains("Chapter m1"));
        assert!(request.prompt.contains("Chapter m2"));
    }
}
