//! Turn loop driving one conversation from its initial state to `stop`.

use std::sync::Arc;

use tracing::{debug, info};

use super::{ConversationHooks, RunnerError};
use crate::{
    CompletionCache, CompletionResult, Identity, LLMProvider, Message, ParameterBag, ResultLog,
    TurnRecord, fingerprint,
};

/// What a finished conversation leaves behind.
#[derive(Debug, Clone)]
pub struct ConversationOutcome<S> {
    /// State for which `stop` first returned true.
    pub state: S,
    /// Every message exchanged, alternating user and assistant.
    pub transcript: Vec<Message>,
    /// Number of turns executed.
    pub turns: u32,
}

pub struct ConversationRunner<H, P = Arc<dyn LLMProvider>>
where
    H: ConversationHooks,
    P: LLMProvider,
{
    hooks: H,
    provider: P,
    cache: Option<Arc<dyn CompletionCache>>,
    result_log: Option<Arc<dyn ResultLog>>,
}

impl<H, P> ConversationRunner<H, P>
where
    H: ConversationHooks,
    P: LLMProvider,
{
    pub const fn new(hooks: H, provider: P) -> Self {
        Self {
            hooks,
            provider,
            cache: None,
            result_log: None,
        }
    }

    /// Serve repeated requests from `cache` instead of the provider.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CompletionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Record every turn in `result_log`.
    #[must_use]
    pub fn with_result_log(mut self, result_log: Arc<dyn ResultLog>) -> Self {
        self.result_log = Some(result_log);
        self
    }

    /// Drive a conversation and return its final state.
    ///
    /// An absent `parameters` bag is treated as an empty one, both when
    /// fingerprinting and when calling the provider.
    pub async fn process(
        &self,
        initial_state: H::State,
        identity: &Identity,
        parameters: Option<&ParameterBag>,
    ) -> Result<H::State, RunnerError> {
        self.run(initial_state, identity, parameters)
            .await
            .map(|outcome| outcome.state)
    }

    /// Like [`process`](Self::process), but also returns the transcript.
    pub async fn run(
        &self,
        initial_state: H::State,
        identity: &Identity,
        parameters: Option<&ParameterBag>,
    ) -> Result<ConversationOutcome<H::State>, RunnerError> {
        let parameters = parameters.cloned().unwrap_or_default();
        let mut transcript: Vec<Message> = Vec::new();
        let mut state = initial_state;
        let mut turn: u32 = 0;

        info!("Starting conversation {identity}");

        loop {
            let prompt = self
                .hooks
                .render_prompt(&state)
                .map_err(RunnerError::Hook)?;
            transcript.push(Message::user(prompt));

            let cache_key = fingerprint(&transcript, &parameters);
            debug!("Turn {turn} of {identity}: fingerprint {cache_key}");

            let result = self.complete(&transcript, &parameters, &cache_key).await?;
            let content = result.content.clone();
            self.log_turn(identity, turn, cache_key, result).await?;

            transcript.push(Message::assistant(content.clone()));

            state = self
                .hooks
                .update_state(state, &content)
                .map_err(RunnerError::Hook)?;

            let turns = next_turn(turn)?;
            if self.hooks.stop(&state).map_err(RunnerError::Hook)? {
                info!("Conversation {identity} finished after {turns} turns");
                return Ok(ConversationOutcome {
                    state,
                    transcript,
                    turns,
                });
            }

            turn = turns;
        }
    }

    /// Fetch the completion for `cache_key`, calling the provider on a miss.
    async fn complete(
        &self,
        transcript: &[Message],
        parameters: &ParameterBag,
        cache_key: &str,
    ) -> Result<CompletionResult, RunnerError> {
        let Some(cache) = &self.cache else {
            return self.call_provider(transcript, parameters).await;
        };

        if let Some(cached) = cache.fetch(cache_key).await.map_err(RunnerError::Cache)? {
            debug!("Cache hit for {cache_key}");
            return Ok(cached);
        }

        debug!("Cache miss for {cache_key}");
        let result = self.call_provider(transcript, parameters).await?;
        cache
            .insert(cache_key, &result)
            .await
            .map_err(RunnerError::Cache)?;
        Ok(result)
    }

    async fn call_provider(
        &self,
        transcript: &[Message],
        parameters: &ParameterBag,
    ) -> Result<CompletionResult, RunnerError> {
        info!(
            "Calling provider: messages={}, parameters={}",
            transcript.len(),
            parameters.len()
        );
        self.provider
            .completion(transcript, parameters)
            .await
            .map_err(RunnerError::Provider)
    }

    async fn log_turn(
        &self,
        identity: &Identity,
        turn: u32,
        cache_key: String,
        response: CompletionResult,
    ) -> Result<(), RunnerError> {
        let Some(result_log) = &self.result_log else {
            return Ok(());
        };

        let record = TurnRecord {
            identity: identity.clone(),
            turn,
            cache_key,
            response,
        };
        result_log
            .insert(&record)
            .await
            .map_err(RunnerError::ResultLog)?;
        debug!("Logged turn {turn} of {identity}");
        Ok(())
    }
}

/// Turn numbers never wrap; a wrapped number would collide in the result log.
fn next_turn(turn: u32) -> Result<u32, RunnerError> {
    turn.checked_add(1).ok_or(RunnerError::TurnLimit(turn))
}
