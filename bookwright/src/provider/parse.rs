//! Extraction of structured output from model responses.
//!
//! Models are asked to answer with a JSON object, usually inside a
//! fenced code block but sometimes bare or wrapped in prose. The parser
//! tries the fence first, then the outermost brace span.

use crate::book::{Complexity, Roadmap, RoadmapModule};
use crate::errors::GenerateError;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap()
    })
}

/// Extracts the most likely JSON object from a model response.
///
/// Returns the fenced block if present, otherwise the span from the
/// first `{` to the last `}`, otherwise `None`.
#[must_use]
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(captures) = fence_regex().captures(text) {
        return captures.get(1).map(|m| m.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Wire shape the roadmap prompt asks the model to produce.
#[derive(Debug, Deserialize)]
struct RoadmapPayload {
    modules: Vec<ModulePayload>,
    #[serde(default)]
    estimated_reading_time: String,
    #[serde(default)]
    difficulty: Option<Complexity>,
}

#[derive(Debug, Deserialize)]
struct ModulePayload {
    #[serde(default)]
    id: String,
    title: String,
    #[serde(default)]
    objectives: Vec<String>,
    #[serde(default)]
    estimated_time: String,
}

/// Parses a roadmap out of a raw model response.
///
/// # Errors
///
/// Returns [`GenerateError::MalformedResponse`] when no JSON object is
/// found, the JSON does not match the expected shape, or the resulting
/// roadmap fails validation (no modules, module without objectives).
pub fn parse_roadmap(text: &str, fallback_difficulty: Complexity) -> Result<Roadmap, GenerateError> {
    let block = extract_json_block(text).ok_or_else(|| {
        GenerateError::MalformedResponse("no JSON object found in response".to_string())
    })?;

    let payload: RoadmapPayload = serde_json::from_str(block)
        .map_err(|e| GenerateError::MalformedResponse(format!("roadmap JSON invalid: {e}")))?;

    let modules = payload
        .modules
        .into_iter()
        .enumerate()
        .map(|(i, m)| RoadmapModule {
            // Models occasionally omit ids; synthesize stable positional ones.
            id: if m.id.trim().is_empty() {
                format!("module-{}", i + 1)
            } else {
                m.id
            },
            title: m.title,
            objectives: m.objectives,
            estimated_time: m.estimated_time,
        })
        .collect();

    let mut roadmap = Roadmap::new(modules, payload.difficulty.unwrap_or(fallback_difficulty));
    roadmap.estimated_reading_time = payload.estimated_reading_time;

    roadmap
        .validate()
        .map_err(GenerateError::MalformedResponse)?;
    Ok(roadmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VALID: &str = r#"{
        "modules": [
            {"id": "m1", "title": "Intro", "objectives": ["o1"], "estimated_time": "20 minutes"},
            {"id": "m2", "title": "Basics", "objectives": ["o2", "o3"], "estimated_time": "40 minutes"}
        ],
        "estimated_reading_time": "1 hour",
        "difficulty": "intermediate"
    }"#;

    #[test]
    fn test_extract_from_fence() {
        let text = format!("Here is your roadmap:\n```json\n{VALID}\n```\nEnjoy!");
        let block = extract_json_block(&text).unwrap();
        assert!(block.starts_with('{'));
        assert!(block.contains("Basics"));
    }

    #[test]
    fn test_extract_bare_braces() {
        let text = format!("Sure thing. {VALID} Hope that helps.");
        assert!(extract_json_block(&text).is_some());
    }

    #[test]
    fn test_extract_none() {
        assert!(extract_json_block("no structure here").is_none());
    }

    #[test]
    fn test_parse_valid_roadmap() {
        let roadmap = parse_roadmap(VALID, Complexity::Beginner).unwrap();
        assert_eq!(roadmap.total_modules, 2);
        assert_eq!(roadmap.modules[0].id, "m1");
        assert_eq!(roadmap.modules[1].title, "Basics");
        assert_eq!(roadmap.estimated_reading_time, "1 hour");
        assert_eq!(roadmap.difficulty, Complexity::Intermediate);
    }

    #[test]
    fn test_parse_synthesizes_missing_ids() {
        let text = r#"{"modules": [{"title": "Intro", "objectives": ["o1"]}]}"#;
        let roadmap = parse_roadmap(text, Complexity::Beginner).unwrap();
        assert_eq!(roadmap.modules[0].id, "module-1");
        assert_eq!(roadmap.difficulty, Complexity::Beginner);
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_roadmap("I cannot help with that.", Complexity::Beginner).unwrap_err();
        assert!(matches!(err, GenerateError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = parse_roadmap(r#"{"chapters": []}"#, Complexity::Beginner).unwrap_err();
        assert!(matches!(err, GenerateError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_rejects_invalid_roadmap() {
        // A module without objectives fails validation.
        let text = r#"{"modules": [{"id": "m1", "title": "Intro", "objectives": []}]}"#;
        let err = parse_roadmap(text, Complexity::Beginner).unwrap_err();
        assert!(err.to_string().contains("no objectives"));
    }
}
