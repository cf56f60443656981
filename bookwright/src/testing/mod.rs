//! Testing utilities for the bookwright pipeline.
//!
//! Scriptable generators and canned model responses used by the unit
//! and integration tests, and useful to hosts testing their own glue.

pub mod mocks;

pub use mocks::{roadmap_json, BlockingGenerator, ChunkedGenerator, ScriptedGenerator};
