//! LLM backends for the agent.
//!
//! The agent talks to its model through the [`LlmService`] trait so the
//! backend can be swapped (or stubbed in tests). [`AnthropicLlmService`]
//! speaks the Anthropic Messages API, with and without SSE streaming.

mod client;
mod error;
pub mod types;

use async_trait::async_trait;
use futures::stream::BoxStream;

pub use client::AnthropicLlmService;
pub use error::{ErrorBody, LlmError};
pub use types::{LlmEvent, LlmRequest, LlmResponse, Message, Role, StopReason, ToolSpec};

/// A chat-completion backend.
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Send a request and wait for the complete reply.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` if the backend cannot be reached or rejects the request.
    async fn send(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Send a request and receive the reply incrementally.
    ///
    /// The stream ends with [`LlmEvent::Done`] on success.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` if the request is rejected before streaming starts.
    async fn stream(
        &self,
        request: LlmRequest,
    ) -> Result<BoxStream<'static, Result<LlmEvent, LlmError>>, LlmError>;
}
