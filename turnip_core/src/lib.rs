#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Turn-execution engine for multi-turn LLM conversations.
//!
//! The engine drives a caller-defined conversation state through repeated
//! render → call → cache → persist → update → stop cycles. Providers, caches
//! and result logs are capability traits; this crate ships in-memory
//! implementations of the stores and nothing that touches the network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod parameters;
pub mod record;
pub mod runner;
pub mod store;
mod util;

pub use parameters::ParameterBag;
pub use record::{Identity, TurnRecord};
pub use runner::{ConversationHooks, ConversationOutcome, ConversationRunner, RunnerError};
pub use store::{CompletionCache, MemoryCache, MemoryResultLog, ResultLog};
pub use util::{canonical_json, fingerprint};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A single completion returned by a provider.
///
/// `transcript` holds the messages that were sent to produce `content`.
/// Optional fields may be absent in persisted payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionResult {
    #[serde(default)]
    pub transcript: Vec<Message>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParameterBag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<serde_json::Value>>,
}

impl CompletionResult {
    #[must_use]
    pub fn new(transcript: Vec<Message>, content: impl Into<String>) -> Self {
        Self {
            transcript,
            content: content.into(),
            parameters: None,
            tool_calls: None,
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: ParameterBag) -> Self {
        self.parameters = Some(parameters);
        self
    }

    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<serde_json::Value>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Request one completion for `messages`.
    ///
    /// `parameters` is forwarded to the provider verbatim.
    async fn completion(
        &self,
        messages: &[Message],
        parameters: &ParameterBag,
    ) -> anyhow::Result<CompletionResult>;
}

#[async_trait]
impl<P> LLMProvider for std::sync::Arc<P>
where
    P: LLMProvider + ?Sized,
{
    async fn completion(
        &self,
        messages: &[Message],
        parameters: &ParameterBag,
    ) -> anyhow::Result<CompletionResult> {
        (**self).completion(messages, parameters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn completion_result_accepts_missing_optional_fields() {
        let result: CompletionResult = serde_json::from_str(r#"{"content":"ok"}"#).unwrap();
        assert!(result.transcript.is_empty());
        assert_eq!(result.content, "ok");
        assert!(result.parameters.is_none());
        assert!(result.tool_calls.is_none());
    }

    #[test]
    fn completion_result_omits_absent_options() {
        let result = CompletionResult::new(vec![Message::user("q")], "a");
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("parameters").is_none());
        assert!(value.get("tool_calls").is_none());
        assert_eq!(value["transcript"][0]["role"], "user");
    }
}
