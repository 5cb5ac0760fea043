//! SQL agent wiring.
//!
//! The [`Agent`] bundles the collaborators a conversation needs: the LLM
//! backend, the tool registry, the user resolver and the memory store.
//! Each chat turn is a single model round trip; tool calls suggested by the
//! model are not dispatched.

pub mod memory;
pub mod resolver;
pub mod sql;
pub mod tools;

use std::sync::Arc;

use async_stream::try_stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use thiserror::Error;
use tracing::instrument;

use sqlagent_core::User;

use crate::llm::{LlmError, LlmEvent, LlmRequest, LlmService, Message, ToolSpec};

pub use memory::{MemoryError, MemoryKind, MemoryRecord, SqliteAgentMemory};
pub use resolver::{CookieUserResolver, RequestContext, ResolveError, UserResolver};
pub use sql::MySqlRunner;
pub use tools::ToolRegistry;

/// Agent behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentConfig {
    /// Stream chat replies as server-sent events.
    pub stream_responses: bool,
    /// Save every completed exchange to agent memory.
    pub auto_save_conversations: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            stream_responses: true,
            auto_save_conversations: true,
        }
    }
}

/// Errors from agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The user is not allowed to use the tool.
    #[error("tool not permitted: {0}")]
    ToolNotPermitted(String),

    /// The chat message was blank.
    #[error("message is empty")]
    EmptyMessage,

    /// The LLM backend failed.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The memory store failed.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}

/// The conversational SQL agent.
pub struct Agent {
    llm: Arc<dyn LlmService>,
    tools: ToolRegistry,
    resolver: Arc<dyn UserResolver>,
    memory: SqliteAgentMemory,
    config: AgentConfig,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("tools", &self.tools.len())
            .field("memory", &self.memory.path())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Assemble an agent from its collaborators.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmService>,
        tools: ToolRegistry,
        resolver: Arc<dyn UserResolver>,
        memory: SqliteAgentMemory,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm,
            tools,
            resolver,
            memory,
            config,
        }
    }

    /// Behavior switches.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The memory store.
    #[must_use]
    pub const fn memory(&self) -> &SqliteAgentMemory {
        &self.memory
    }

    /// Resolve the user an inbound request acts as.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::AuthRequired` if the request carries no identity.
    pub async fn resolve_user(&self, context: &RequestContext) -> Result<User, ResolveError> {
        self.resolver.resolve_user(context).await
    }

    /// Tools the user may use.
    #[must_use]
    pub fn tools_for(&self, user: &User) -> Vec<&ToolSpec> {
        self.tools.tools_for(user)
    }

    /// Require that the user may invoke the named tool.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::ToolNotPermitted` otherwise.
    pub fn authorize(&self, user: &User, tool_name: &str) -> Result<(), AgentError> {
        if self.tools.authorize(user, tool_name) {
            Ok(())
        } else {
            tracing::warn!(user = %user.email, tool = tool_name, "Tool access denied");
            Err(AgentError::ToolNotPermitted(tool_name.to_owned()))
        }
    }

    /// Answer a message with one LLM round trip.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::EmptyMessage` for a blank message and
    /// `AgentError::Llm` if the backend fails.
    #[instrument(skip(self, user, message), fields(user = %user.email))]
    pub async fn chat(&self, user: &User, message: &str) -> Result<String, AgentError> {
        let request = self.build_request(user, message)?;
        let reply = self.llm.send(request).await?.text;
        self.remember(user, message, &reply).await;
        Ok(reply)
    }

    /// Answer a message as a stream of text deltas.
    ///
    /// The stream ends after the final delta. The completed exchange is saved
    /// once the backend reports the reply is done.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::EmptyMessage` for a blank message and
    /// `AgentError::Llm` if the backend rejects the request. Failures after
    /// streaming starts are yielded as stream items.
    #[instrument(skip(self, user, message), fields(user = %user.email))]
    pub async fn chat_stream(
        self: Arc<Self>,
        user: User,
        message: String,
    ) -> Result<BoxStream<'static, Result<String, AgentError>>, AgentError> {
        let request = self.build_request(&user, &message)?;
        let mut events = self.llm.stream(request).await?;

        Ok(Box::pin(try_stream! {
            let mut reply = String::new();
            while let Some(event) = events.next().await {
                match event? {
                    LlmEvent::TextDelta(text) => {
                        reply.push_str(&text);
                        yield text;
                    }
                    LlmEvent::Done { .. } => {
                        self.remember(&user, &message, &reply).await;
                        break;
                    }
                }
            }
        }))
    }

    fn build_request(&self, user: &User, message: &str) -> Result<LlmRequest, AgentError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AgentError::EmptyMessage);
        }
        Ok(LlmRequest {
            system: Some(self.system_prompt(user)),
            messages: vec![Message::user(message)],
        })
    }

    fn system_prompt(&self, user: &User) -> String {
        let mut prompt = String::from(
            "You are a SQL analyst assistant. Answer questions about the business \
             database clearly and concisely. When a query would help, write the SQL \
             you would run.",
        );

        let tools = self.tools_for(user);
        if !tools.is_empty() {
            prompt.push_str("\n\nTools available to this user:\n");
            for tool in tools {
                prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
            }
        }
        prompt
    }

    /// Save an exchange if auto-save is on. Failures are logged, not returned.
    async fn remember(&self, user: &User, question: &str, answer: &str) {
        if !self.config.auto_save_conversations {
            return;
        }
        if let Err(e) = self
            .memory
            .save_conversation(&user.id, question.trim(), answer)
            .await
        {
            tracing::warn!(error = %e, "Failed to save conversation to agent memory");
        }
    }
}
