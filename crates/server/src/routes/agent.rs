//! Agent endpoints.
//!
//! Every handler resolves the user first through the agent's resolver, so a
//! request without a session is rejected with 401 before any work is done.

use std::sync::Arc;

use async_stream::stream;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agent::tools::names;
use crate::agent::{AgentError, MemoryRecord};
use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppQuery};
use crate::llm::ToolSpec;
use crate::middleware::CurrentUser;
use crate::state::AppState;

const DEFAULT_MEMORY_LIMIT: u32 = 20;
const MAX_MEMORY_LIMIT: u32 = 100;

/// Build the agent router (mounted under `/api/agent`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/chat", post(chat))
        .route("/memories", get(list_memories).post(save_memory))
}

// =============================================================================
// Tools
// =============================================================================

/// Tools visible to the current user.
#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    /// Resolved user email.
    pub user: String,
    /// Capability groups of the resolved user.
    pub groups: Vec<String>,
    /// Tools the user may use.
    pub tools: Vec<ToolSpec>,
}

/// GET /api/agent/tools
async fn list_tools(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<ToolsResponse> {
    let tools = state
        .agent()
        .tools_for(&user)
        .into_iter()
        .cloned()
        .collect();
    Json(ToolsResponse {
        user: user.email,
        groups: user.group_memberships,
        tools,
    })
}

// =============================================================================
// Chat
// =============================================================================

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's question.
    pub message: String,
}

/// Non-streamed chat reply.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// The agent's answer.
    pub reply: String,
}

/// POST /api/agent/chat
///
/// Streams `delta` events followed by `done` when streaming is enabled,
/// otherwise returns the whole reply as JSON.
async fn chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(request): AppJson<ChatRequest>,
) -> Result<Response> {
    let agent = Arc::clone(state.agent());

    if !agent.config().stream_responses {
        let reply = agent.chat(&user, &request.message).await?;
        return Ok(Json(ChatResponse { reply }).into_response());
    }

    let mut deltas = agent.chat_stream(user, request.message).await?;
    let events = stream! {
        while let Some(item) = deltas.next().await {
            match item {
                Ok(text) => yield Event::default().event("delta").json_data(json!({ "text": text })),
                Err(e) => {
                    yield Ok(error_event(e));
                    return;
                }
            }
        }
        yield Ok(Event::default().event("done").data("[DONE]"));
    };

    Ok(Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response())
}

/// Turn a mid-stream failure into a terminal `error` event.
fn error_event(err: AgentError) -> Event {
    let err = AppError::from(err);
    tracing::error!(error = %err, "Chat stream failed");
    Event::default().event("error").data(err.detail())
}

// =============================================================================
// Memories
// =============================================================================

/// Query parameters for listing memories.
#[derive(Debug, Deserialize)]
pub struct MemoryQuery {
    /// Maximum number of memories to return (1-100, default 20).
    pub limit: Option<u32>,
}

/// Body for saving a text memory.
#[derive(Debug, Deserialize)]
pub struct SaveMemoryRequest {
    /// Memory text.
    pub content: String,
    /// Optional grouping label.
    pub category: Option<String>,
}

/// GET /api/agent/memories
async fn list_memories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppQuery(query): AppQuery<MemoryQuery>,
) -> Result<Json<Vec<MemoryRecord>>> {
    let agent = state.agent();
    agent.authorize(&user, names::SEARCH_SAVED_CORRECT_TOOL_USES)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_MEMORY_LIMIT)
        .clamp(1, MAX_MEMORY_LIMIT);
    let memories = agent
        .memory()
        .list(None, limit)
        .await
        .map_err(AgentError::from)?;
    Ok(Json(memories))
}

/// POST /api/agent/memories
async fn save_memory(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(request): AppJson<SaveMemoryRequest>,
) -> Result<impl IntoResponse> {
    let agent = state.agent();
    agent.authorize(&user, names::SAVE_TEXT_MEMORY)?;

    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Memory content cannot be empty".to_string()));
    }
    let category = request
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let record = agent
        .memory()
        .save_text_memory(content, category)
        .await
        .map_err(AgentError::from)?;
    tracing::info!(user = %user.email, id = record.id, "Text memory saved");

    Ok((StatusCode::CREATED, Json(record)))
}
