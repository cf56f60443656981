//! Mock text generators for tests.

use crate::cancellation::CancellationToken;
use crate::errors::GenerateError;
use crate::provider::{ChunkStream, GenerateResult, GenerationRequest, TextGenerator};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Builds a valid roadmap response with the given module ids.
#[must_use]
pub fn roadmap_json(ids: &[&str]) -> String {
    let modules: Vec<String> = ids
        .iter()
        .map(|id| {
            format!(
                r#"{{"id": "{id}", "title": "Chapter {id}", "objectives": ["objective for {id}"], "estimated_time": "30 minutes"}}"#
            )
        })
        .collect();
    format!(
        "```json\n{{\"modules\": [{}], \"estimated_reading_time\": \"2 hours\", \"difficulty\": \"beginner\"}}\n```",
        modules.join(", ")
    )
}

#[derive(Debug)]
enum ScriptEntry {
    Respond(GenerateResult<String>),
    BlockUntilCancelled,
}

/// A generator that replays a scripted sequence of results and records
/// every prompt it sees.
///
/// When the script is exhausted it answers with deterministic filler
/// text, which is enough for module-content calls whose text does not
/// matter to the test.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<ScriptEntry>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    /// Creates a generator with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn push_ok(&self, text: impl Into<String>) {
        self.script
            .lock()
            .push_back(ScriptEntry::Respond(Ok(text.into())));
    }

    /// Queues a failure.
    pub fn push_err(&self, error: GenerateError) {
        self.script
            .lock()
            .push_back(ScriptEntry::Respond(Err(error)));
    }

    /// Queues a call that hangs until its token is cancelled.
    pub fn push_blocking(&self) {
        self.script.lock().push_back(ScriptEntry::BlockUntilCancelled);
    }

    /// Returns how many calls were made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Returns the prompts from every call, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: Arc<CancellationToken>,
    ) -> GenerateResult<String> {
        if cancel.is_cancelled() {
            return Err(GenerateError::Cancelled(
                cancel.reason().unwrap_or_default(),
            ));
        }
        self.prompts.lock().push(request.prompt.clone());
        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(ScriptEntry::Respond(result)) => result,
            Some(ScriptEntry::BlockUntilCancelled) => {
                cancel.cancelled_wait().await;
                Err(GenerateError::Cancelled(
                    cancel.reason().unwrap_or_default(),
                ))
            }
            None => Ok(format!("generated text {}", self.call_count())),
        }
    }
}

/// A generator that never answers until its token is cancelled.
#[derive(Debug, Default)]
pub struct BlockingGenerator {
    calls: Mutex<usize>,
}

impl BlockingGenerator {
    /// Creates a blocking generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many calls were made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl TextGenerator for BlockingGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
        cancel: Arc<CancellationToken>,
    ) -> GenerateResult<String> {
        *self.calls.lock() += 1;
        cancel.cancelled_wait().await;
        Err(GenerateError::Cancelled(
            cancel.reason().unwrap_or_default(),
        ))
    }
}

/// A generator that streams a fixed chunk sequence.
#[derive(Debug)]
pub struct ChunkedGenerator {
    chunks: Vec<String>,
}

impl ChunkedGenerator {
    /// Creates a generator from its chunks.
    #[must_use]
    pub fn new(chunks: Vec<String>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl TextGenerator for ChunkedGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
        _cancel: Arc<CancellationToken>,
    ) -> GenerateResult<String> {
        Ok(self.chunks.concat())
    }

    async fn generate_stream(
        &self,
        _request: &GenerationRequest,
        _cancel: Arc<CancellationToken>,
    ) -> GenerateResult<ChunkStream> {
        let chunks: Vec<GenerateResult<String>> =
            self.chunks.iter().cloned().map(Ok).collect();
        Ok(futures::stream::iter(chunks).boxed())
    }
}
