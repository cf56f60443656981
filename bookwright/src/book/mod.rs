//! The book data model: projects, roadmaps, and generated module results.

mod module_result;
mod project;
mod roadmap;
mod status;

pub use module_result::{word_count, ModuleResult};
pub use project::{Project, ProjectRequest};
pub use roadmap::{Roadmap, RoadmapModule};
pub use status::{Complexity, ModuleStatus, ProjectStatus};
