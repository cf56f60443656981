//! Final book assembly: module contents in roadmap order plus the
//! generated summary.

use crate::book::{Project, Roadmap};
use std::fmt::Write as _;

/// Concatenates completed module content into the final artifact.
///
/// Modules appear strictly in roadmap order regardless of the order
/// their results were created; the summary is appended last. Callers
/// check completeness before assembling, so a missing result is simply
/// skipped here rather than treated as an error.
#[must_use]
pub fn assemble_book(project: &Project, roadmap: &Roadmap, summary: &str) -> String {
    let mut book = String::new();
    let _ = writeln!(book, "# {}\n", project.request.goal);

    for module in &roadmap.modules {
        let Some(result) = project.module_result(&module.id) else {
            continue;
        };
        if !result.is_completed() {
            continue;
        }
        let _ = writeln!(book, "## {}\n", result.title);
        book.push_str(result.content.trim_end());
        book.push_str("\n\n");
    }

    book.push_str("## Summary\n\n");
    book.push_str(summary.trim_end());
    book.push('\n');
    book
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{Complexity, ModuleResult, ProjectRequest, RoadmapModule};
    use pretty_assertions::assert_eq;

    fn roadmap_module(id: &str, title: &str) -> RoadmapModule {
        RoadmapModule {
            id: id.to_string(),
            title: title.to_string(),
            objectives: vec!["o".to_string()],
            estimated_time: String::new(),
        }
    }

    #[test]
    fn test_assembly_follows_roadmap_order() {
        let mut project = Project::new(ProjectRequest {
            goal: "Sourdough Baking".to_string(),
            ..ProjectRequest::default()
        });
        let roadmap = Roadmap::new(
            vec![
                roadmap_module("m1", "Starters"),
                roadmap_module("m2", "Dough"),
            ],
            Complexity::Beginner,
        );
        project.roadmap = Some(roadmap.clone());

        // Results created out of order.
        project.upsert_module_result(ModuleResult::completed(
            &roadmap_module("m2", "Dough"),
            "Knead gently.",
        ));
        project.upsert_module_result(ModuleResult::completed(
            &roadmap_module("m1", "Starters"),
            "Feed your starter.",
        ));

        let book = assemble_book(&project, &roadmap, "Bake well.");
        let starters = book.find("## Starters").unwrap();
        let dough = book.find("## Dough").unwrap();
        let summary = book.find("## Summary").unwrap();

        assert!(book.starts_with("# Sourdough Baking"));
        assert!(starters < dough);
        assert!(dough < summary);
        assert!(book.trim_end().ends_with("Bake well."));
    }

    #[test]
    fn test_assembly_skips_failed_modules() {
        let mut project = Project::new(ProjectRequest::default());
        let roadmap = Roadmap::new(
            vec![
                roadmap_module("m1", "Good"),
                roadmap_module("m2", "Bad"),
            ],
            Complexity::Beginner,
        );
        project.roadmap = Some(roadmap.clone());
        project.upsert_module_result(ModuleResult::completed(
            &roadmap_module("m1", "Good"),
            "kept",
        ));
        project.upsert_module_result(ModuleResult::failed(
            &roadmap_module("m2", "Bad"),
            "rate limited",
        ));

        let book = assemble_book(&project, &roadmap, "s");
        assert!(book.contains("## Good"));
        assert!(!book.contains("## Bad"));
    }

    #[test]
    fn test_assembly_word_count_matches_derivation() {
        let mut project = Project::new(ProjectRequest::default());
        let roadmap = Roadmap::new(vec![roadmap_module("m1", "Only")], Complexity::Beginner);
        project.roadmap = Some(roadmap.clone());
        project.upsert_module_result(ModuleResult::completed(
            &roadmap_module("m1", "Only"),
            "three words here",
        ));

        let book = assemble_book(&project, &roadmap, "done");
        project.set_final_book(book.clone());
        assert_eq!(
            project.total_words,
            Some(crate::book::word_count(&book))
        );
    }
}
