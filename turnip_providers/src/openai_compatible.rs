use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;
use turnip_config::{ProviderConfig, ProviderKind, RetryConfig};
use turnip_core::{CompletionResult, LLMProvider, Message, ParameterBag};

use crate::retry::retry_with_backoff;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";
const VLLM_BASE_URL: &str = "http://localhost:8000";

const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const TOGETHER_DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// Provider for any endpoint speaking the `/chat/completions` protocol:
/// OpenAI, Together.ai and vLLM servers.
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OpenAiCompatibleProvider {
    fn new(base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn openai(api_key: String) -> Self {
        info!("Creating OpenAI provider");
        Self::new(OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL, Some(api_key))
    }

    pub fn together(api_key: String) -> Self {
        info!("Creating Together provider");
        Self::new(TOGETHER_BASE_URL, TOGETHER_DEFAULT_MODEL, Some(api_key))
    }

    /// A vLLM server at `url`; the `/v1` suffix is appended.
    pub fn vllm(url: &str) -> Self {
        info!("Creating vLLM provider for {url}");
        Self::new(&format!("{}/v1", url.trim_end_matches('/')), "", None)
    }

    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let api_key = config.api_key();
        let provider = match config.kind {
            ProviderKind::OpenAi | ProviderKind::Together => {
                let api_key = api_key.ok_or_else(|| {
                    anyhow::anyhow!(
                        "No API key for {}: set provider.api_key or {}",
                        config.kind.as_str(),
                        config.kind.api_key_env()
                    )
                })?;
                let provider = if config.kind == ProviderKind::OpenAi {
                    Self::openai(api_key)
                } else {
                    Self::together(api_key)
                };
                match &config.base_url {
                    Some(url) => provider.with_base_url(url),
                    None => provider,
                }
            }
            ProviderKind::Vllm => {
                let mut provider = Self::vllm(config.base_url.as_deref().unwrap_or(VLLM_BASE_URL));
                provider.api_key = api_key;
                provider
            }
        };

        let provider = match config.model() {
            Some(model) => provider.with_model(model),
            None => provider,
        };
        Ok(provider.with_retry(config.retry.clone()))
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Full API base, e.g. `https://api.openai.com/v1`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request body: model and messages, with every parameter merged in at
    /// the top level.
    fn build_request(&self, messages: &[Message], parameters: &ParameterBag) -> Value {
        let mut request = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(body) = request.as_object_mut() {
            for (key, value) in parameters {
                body.insert(key.clone(), value.clone());
            }
        }
        request
    }

    /// Helper method to send a single request
    async fn try_send(&self, request: &Value) -> anyhow::Result<Value> {
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        Ok(builder
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?)
    }
}

/// Extract the first choice of a chat completion payload.
///
/// A null `content` is accepted only when the message carries tool calls.
fn parse_completion(
    payload: &Value,
    messages: &[Message],
    parameters: &ParameterBag,
) -> anyhow::Result<CompletionResult> {
    let message = payload["choices"][0]["message"]
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing choices[0].message"))?;

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .filter(|calls| !calls.is_empty())
        .cloned();

    let content = match message.get("content") {
        Some(Value::String(content)) => content.clone(),
        Some(Value::Null) | None if tool_calls.is_some() => String::new(),
        _ => anyhow::bail!("Invalid response format: missing content"),
    };

    let mut result =
        CompletionResult::new(messages.to_vec(), content).with_parameters(parameters.clone());
    if let Some(tool_calls) = tool_calls {
        result = result.with_tool_calls(tool_calls);
    }
    Ok(result)
}

#[async_trait]
impl LLMProvider for OpenAiCompatibleProvider {
    async fn completion(
        &self,
        messages: &[Message],
        parameters: &ParameterBag,
    ) -> anyhow::Result<CompletionResult> {
        let request = self.build_request(messages, parameters);

        info!(
            "Sending request to {}: model={}, messages={}",
            self.base_url,
            self.model,
            messages.len()
        );

        let payload = retry_with_backoff(
            || self.try_send(&request),
            &self.retry.base_delays,
            self.retry.final_retries,
            self.retry.final_delay,
        )
        .await?;

        info!("Received response from {}", self.base_url);
        parse_completion(&payload, messages, parameters)
    }
}
