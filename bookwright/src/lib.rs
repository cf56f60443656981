//! # Bookwright
//!
//! A resumable, multi-stage book-generation pipeline driven by
//! third-party large-language-model providers.
//!
//! Bookwright turns a learning goal into a multi-chapter book through
//! three stages (roadmap, per-module content, assembly) with support
//! for:
//!
//! - **Checkpointed resumability**: progress survives process restarts;
//!   a resume skips completed modules instead of regenerating them
//! - **Pause and cancel**: a durable pause flag honored between module
//!   iterations, and per-project cancellation tokens for in-flight calls
//! - **User-mediated recovery**: failures classify into rate-limit,
//!   network, and generic classes; the loop suspends for an explicit
//!   retry / switch / skip decision instead of silently re-billing a
//!   paid API
//! - **Event-driven observability**: full-record status snapshots on a
//!   multi-subscriber broadcast bus
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bookwright::prelude::*;
//! use std::sync::Arc;
//!
//! let pipeline = BookPipeline::new(generator, Arc::new(MemoryStore::new()));
//! let mut project = Project::new(request);
//! let session = GenerationSession::default();
//!
//! pipeline.create_roadmap(&mut project, &session).await?;
//! pipeline.generate_all_modules(&mut project, &session).await?;
//! pipeline.assemble_final_book(&mut project, &session).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod book;
pub mod cancellation;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod provider;
pub mod recovery;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::book::{
        Complexity, ModuleResult, ModuleStatus, Project, ProjectRequest, ProjectStatus,
        Roadmap, RoadmapModule,
    };
    pub use crate::cancellation::{CancellationToken, TokenRegistry};
    pub use crate::errors::{GenerateError, PipelineError, StorageError};
    pub use crate::events::{PipelineEvent, RunStatus, StatusBus, StatusSnapshot};
    pub use crate::pipeline::{
        BookPipeline, GenerationOutcome, GenerationSession, PipelineConfig,
    };
    pub use crate::provider::{GenerationRequest, TextGenerator};
    pub use crate::recovery::{RetryDecision, RetryInfo, RetryPolicy};
    pub use crate::store::{Checkpoint, CheckpointStore, KeyValueStore, MemoryStore};
}
