//! The roadmap: an ordered generation plan for one project.

use super::Complexity;
use serde::{Deserialize, Serialize};

/// One planned chapter-equivalent unit of the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapModule {
    /// Stable id referenced by module results.
    pub id: String,
    /// Chapter title.
    pub title: String,
    /// Learning objectives; never empty for a valid roadmap.
    pub objectives: Vec<String>,
    /// Display string such as "45 minutes".
    #[serde(default)]
    pub estimated_time: String,
}

/// The ordered curriculum plan for a project.
///
/// Created once by the roadmap-generation step and immutable thereafter;
/// the module order here is the canonical generation sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roadmap {
    /// Planned modules in generation order.
    pub modules: Vec<RoadmapModule>,
    /// Total module count.
    pub total_modules: usize,
    /// Display string for the whole book, e.g. "6 hours".
    #[serde(default)]
    pub estimated_reading_time: String,
    /// Difficulty the plan was generated for.
    #[serde(default)]
    pub difficulty: Complexity,
}

impl Roadmap {
    /// Builds a roadmap from its modules, deriving the count.
    #[must_use]
    pub fn new(modules: Vec<RoadmapModule>, difficulty: Complexity) -> Self {
        let total_modules = modules.len();
        Self {
            modules,
            total_modules,
            estimated_reading_time: String::new(),
            difficulty,
        }
    }

    /// Validates structural invariants.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found: no modules,
    /// a module without objectives, a blank title, or a duplicated id.
    pub fn validate(&self) -> Result<(), String> {
        if self.modules.is_empty() {
            return Err("roadmap contains no modules".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for module in &self.modules {
            if module.title.trim().is_empty() {
                return Err(format!("module '{}' has an empty title", module.id));
            }
            if module.objectives.is_empty() {
                return Err(format!("module '{}' has no objectives", module.title));
            }
            if !seen.insert(module.id.as_str()) {
                return Err(format!("duplicate module id '{}'", module.id));
            }
        }
        Ok(())
    }

    /// Looks up a module by its stable id.
    #[must_use]
    pub fn module_by_id(&self, id: &str) -> Option<&RoadmapModule> {
        self.modules.iter().find(|m| m.id == id)
    }
}
