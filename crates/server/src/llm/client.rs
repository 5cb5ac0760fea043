//! Anthropic Messages API client.
//!
//! Provides both streaming and non-streaming access behind [`LlmService`].

use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::LlmConfig;

use super::LlmService;
use super::error::LlmError;
use super::types::{ChatRequest, ChatResponse, LlmEvent, LlmRequest, LlmResponse, StreamEvent};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// LLM service backed by the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicLlmService {
    inner: Arc<AnthropicInner>,
}

struct AnthropicInner {
    client: reqwest::Client,
    model: String,
}

impl std::fmt::Debug for AnthropicLlmService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicLlmService")
            .field("model", &self.inner.model)
            .finish_non_exhaustive()
    }
}

impl AnthropicLlmService {
    /// Create a client for the configured model.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if the API key is not a valid header value
    /// or the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| LlmError::Config("API key contains invalid characters".to_string()))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(AnthropicInner {
                client,
                model: config.model.clone(),
            }),
        })
    }

    /// Model identifier requests are sent with.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    fn build_request(&self, request: LlmRequest, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.inner.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: request.messages,
            system: request.system,
            stream: stream.then_some(true),
        }
    }

    /// Map an error status code to an `LlmError`.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> LlmError {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        match response.text().await {
            Ok(body) => LlmError::from_status(status.as_u16(), retry_after.as_deref(), &body),
            Err(e) => LlmError::Http(e),
        }
    }
}

#[async_trait]
impl LlmService for AnthropicLlmService {
    #[instrument(skip(self, request), fields(model = %self.inner.model))]
    async fn send(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.build_request(request, false);
        let response = self
            .inner
            .client
            .post(ANTHROPIC_API_URL)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let text = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::Parse(format!("Failed to parse response: {e}")))?;
        tracing::debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "LLM reply received"
        );
        Ok(parsed.into())
    }

    #[instrument(skip(self, request), fields(model = %self.inner.model))]
    async fn stream(
        &self,
        request: LlmRequest,
    ) -> Result<BoxStream<'static, Result<LlmEvent, LlmError>>, LlmError> {
        let body = self.build_request(request, true);
        let response = self
            .inner
            .client
            .post(ANTHROPIC_API_URL)
            .json(&body)
            .send()
            .await?;

        // Errors arrive as a normal JSON body before any event is sent.
        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        Ok(Box::pin(stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut stop_reason = None;
            let mut byte_stream = response.bytes_stream();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmError::Stream(e.to_string()));
                        return;
                    }
                };

                // Chunks may split a multi-byte character; decode whole events only.
                buffer.extend_from_slice(&chunk);

                while let Some(event) = extract_sse_event(&mut buffer) {
                    match parse_sse_event(&event) {
                        None => {}
                        Some(Err(e)) => yield Err(e),
                        Some(Ok(StreamEvent::ContentBlockDelta { delta, .. })) => {
                            if let super::types::ContentBlockDelta::TextDelta { text } = delta {
                                yield Ok(LlmEvent::TextDelta(text));
                            }
                        }
                        Some(Ok(StreamEvent::MessageDelta { delta })) => {
                            stop_reason = delta.stop_reason;
                        }
                        Some(Ok(StreamEvent::MessageStop)) => {
                            yield Ok(LlmEvent::Done { stop_reason });
                            return;
                        }
                        Some(Ok(StreamEvent::Error { error })) => {
                            yield Err(LlmError::from(error));
                            return;
                        }
                        Some(Ok(_)) => {}
                    }
                }
            }

            yield Err(LlmError::Stream("stream ended before message_stop".to_string()));
        }))
    }
}

/// Extract a complete SSE event from the buffer.
///
/// Returns `Some(event)` if a complete event was found (and removes it from
/// the buffer), or `None` if no complete event is available yet.
fn extract_sse_event(buffer: &mut Vec<u8>) -> Option<String> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")? + 2;
    let event: Vec<u8> = buffer.drain(..end).collect();
    let event = event.strip_suffix(b"\n\n").unwrap_or(&event);
    Some(String::from_utf8_lossy(event).into_owned())
}

/// Parse an SSE event string into a `StreamEvent`.
fn parse_sse_event(event: &str) -> Option<Result<StreamEvent, LlmError>> {
    if event.trim().is_empty() {
        return None;
    }

    let data = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .next_back()?;

    Some(
        serde_json::from_str::<StreamEvent>(data)
            .map_err(|e| LlmError::Parse(format!("Failed to parse stream event: {e}"))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ContentBlockDelta;

    #[test]
    fn test_extract_sse_event() {
        let mut buffer = b"event: message_start\ndata: {}\n\nevent: ping\ndata: {}\n\n".to_vec();

        let first = extract_sse_event(&mut buffer).expect("first event");
        assert!(first.contains("message_start"));

        let second = extract_sse_event(&mut buffer).expect("second event");
        assert!(second.contains("ping"));

        assert!(extract_sse_event(&mut buffer).is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_extract_sse_event_incomplete() {
        let mut buffer = b"event: content_block_delta\ndata: {\"partial".to_vec();
        assert!(extract_sse_event(&mut buffer).is_none());
        assert_eq!(buffer, b"event: content_block_delta\ndata: {\"partial");
    }

    #[test]
    fn test_extract_sse_event_split_multibyte_character() {
        let full = "data: {\"text\":\"caf\u{e9}\"}\n\n".as_bytes();
        let split = full.len() - 5;
        let mut buffer = full[..split].to_vec();
        assert!(extract_sse_event(&mut buffer).is_none());
        buffer.extend_from_slice(&full[split..]);
        let event = extract_sse_event(&mut buffer).expect("event");
        assert!(event.contains("caf\u{e9}"));
    }

    #[test]
    fn test_parse_text_delta() {
        let event = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}";
        let parsed = parse_sse_event(event).expect("event").expect("parse");
        match parsed {
            StreamEvent::ContentBlockDelta {
                delta: ContentBlockDelta::TextDelta { text },
                ..
            } => assert_eq!(text, "Hi"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ping_and_empty() {
        let parsed = parse_sse_event("event: ping\ndata: {\"type\":\"ping\"}")
            .expect("event")
            .expect("parse");
        assert!(matches!(parsed, StreamEvent::Ping));
        assert!(parse_sse_event("").is_none());
        assert!(parse_sse_event("event: ping").is_none());
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let result = parse_sse_event("data: not json").expect("event");
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_new_rejects_bad_api_key() {
        let config = LlmConfig {
            api_key: "bad\nkey".to_string().into(),
            model: "claude-sonnet-4-20250514".to_string(),
        };
        assert!(matches!(
            AnthropicLlmService::new(&config),
            Err(LlmError::Config(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let config = LlmConfig {
            api_key: "sk-ant-supersecret".to_string().into(),
            model: "claude-sonnet-4-20250514".to_string(),
        };
        let service = AnthropicLlmService::new(&config).expect("client");
        let debug = format!("{service:?}");
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("claude-sonnet-4-20250514"));
    }

    #[test]
    fn test_service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<AnthropicLlmService>();
    }
}
