//! Durable persistence: a namespaced key-value abstraction and the
//! checkpoint/pause-flag store built on top of it.

mod checkpoint;
mod kv;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use kv::{KeyValueStore, MemoryStore};
