//! The abstract text-generation capability.
//!
//! The orchestrator is agnostic to which vendor answers a prompt; it
//! only needs "generate text, optionally streaming chunks, cancellable
//! via a token". Concrete adapters implement [`TextGenerator`].

mod parse;

pub use parse::{extract_json_block, parse_roadmap};

use crate::cancellation::CancellationToken;
use crate::errors::GenerateError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;

/// Result alias for generation calls.
pub type GenerateResult<T> = Result<T, GenerateError>;

/// A stream of partial text chunks.
pub type ChunkStream = BoxStream<'static, GenerateResult<String>>;

/// A single generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The full prompt text.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl GenerationRequest {
    /// Creates a request with default sampling options.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    /// Sets the token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Abstract text-generation capability backed by some LLM provider.
///
/// Implementations must watch the cancellation token and return
/// [`GenerateError::Cancelled`] promptly once it fires.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates the full response text for a prompt.
    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: Arc<CancellationToken>,
    ) -> GenerateResult<String>;

    /// Generates a response as a stream of text chunks.
    ///
    /// The default implementation adapts [`generate`](Self::generate)
    /// into a single-chunk stream for providers without streaming.
    async fn generate_stream(
        &self,
        request: &GenerationRequest,
        cancel: Arc<CancellationToken>,
    ) -> GenerateResult<ChunkStream> {
        let text = self.generate(request, cancel).await?;
        Ok(futures::stream::once(async move { Ok(text) }).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(
            &self,
            request: &GenerationRequest,
            _cancel: Arc<CancellationToken>,
        ) -> GenerateResult<String> {
            Ok(format!("echo: {}", request.prompt))
        }
    }

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new("hi")
            .with_max_tokens(128)
            .with_temperature(0.2);
        assert_eq!(request.max_tokens, 128);
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_default_stream_adapts_generate() {
        let generator = EchoGenerator;
        let token = CancellationToken::new();
        let mut stream = generator
            .generate_stream(&GenerationRequest::new("hello"), token)
            .await
            .unwrap();

        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk, "echo: hello");
        assert!(stream.next().await.is_none());
    }
}
