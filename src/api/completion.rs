//! Streaming chat completions with the assistant functions attached.

use crate::assistant::tool_definitions;
use futures::{Stream, StreamExt};
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Something worth forwarding to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    Content(String),
    ToolCall { name: String, arguments: String },
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Failed to open completion stream: {0}")]
    Connect(String),

    #[error("Completion stream failed: {0}")]
    Stream(String),

    #[error("Malformed completion chunk: {0}")]
    Chunk(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Reassembles tool calls that arrive as fragments keyed by `index`.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<usize, (String, String)>,
}

impl ToolCallAccumulator {
    fn push(&mut self, delta: &ToolCallDelta) {
        let entry = self.calls.entry(delta.index).or_default();
        if let Some(function) = &delta.function {
            if let Some(name) = &function.name {
                entry.0.push_str(name);
            }
            if let Some(arguments) = &function.arguments {
                entry.1.push_str(arguments);
            }
        }
    }

    /// Drain every complete call in index order. Nameless fragments are dropped.
    pub fn finish(&mut self) -> Vec<CompletionEvent> {
        std::mem::take(&mut self.calls)
            .into_values()
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, arguments)| CompletionEvent::ToolCall { name, arguments })
            .collect()
    }

    /// Feed one SSE `data` payload, returning what can be forwarded now.
    pub fn feed(&mut self, data: &str) -> Result<Vec<CompletionEvent>, CompletionError> {
        let chunk: Chunk = serde_json::from_str(data)?;
        let mut events = Vec::new();
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(events);
        };

        if let Some(delta) = choice.delta {
            if let Some(tool_calls) = &delta.tool_calls {
                for call in tool_calls {
                    self.push(call);
                }
            } else if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
                events.push(CompletionEvent::Content(content));
            }
        }
        if choice.finish_reason.is_some() {
            events.extend(self.finish());
        }
        Ok(events)
    }
}

/// Client for `{base}/chat/completions`.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl CompletionClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Stream a completion for `messages` on behalf of the `token` holder.
    pub fn stream(
        &self,
        token: &str,
        messages: Vec<Value>,
    ) -> impl Stream<Item = Result<CompletionEvent, CompletionError>> + Send + 'static {
        let request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(token)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "tools": tool_definitions(),
                "stream": true,
            }));

        async_stream::stream! {
            let mut source = match request.eventsource() {
                Ok(source) => source,
                Err(e) => {
                    yield Err(CompletionError::Connect(e.to_string()));
                    return;
                }
            };
            let mut calls = ToolCallAccumulator::default();

            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => continue,
                    Ok(Event::Message(message)) => {
                        if message.data.trim() == "[DONE]" {
                            break;
                        }
                        match calls.feed(&message.data) {
                            Ok(events) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            Err(e) => {
                                yield Err(e);
                                break;
                            }
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(e) => {
                        yield Err(CompletionError::Stream(e.to_string()));
                        break;
                    }
                }
            }
            source.close();

            for event in calls.finish() {
                yield Ok(event);
            }
        }
    }
}
