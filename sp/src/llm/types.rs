//! LLM request/response types
//!
//! The request body is the chat-completions shape:
//! `{ model, messages: [{role, content}], temperature, max_tokens }`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::prompts::Prompt;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A message in the request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Request body for one completion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Build the request body for a rendered prompt
    pub fn from_prompt(prompt: &Prompt) -> Self {
        Self {
            model: prompt.params.model.clone(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: prompt.system.clone(),
                },
                ChatMessage {
                    role: Role::User,
                    content: prompt.text.clone(),
                },
            ],
            temperature: prompt.params.temperature,
            max_tokens: prompt.params.max_tokens,
        }
    }
}

/// Text returned by a single successful attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// `choices[0].message.content`
    pub text: String,
    /// HTTP status of the response
    pub http_status: u16,
}

/// Unparsed model output plus attempt metadata
#[derive(Debug, Clone, PartialEq)]
pub struct RawCompletion {
    pub text: String,
    /// 1-based attempt that produced this text
    pub attempt: u32,
    pub latency: Duration,
    pub http_status: u16,
}
