/// Domain logic of a conversation.
///
/// The runner never looks inside `State`; it only moves it between these
/// three calls. Any error returned here aborts the conversation and reaches
/// the caller as [`RunnerError::Hook`](super::RunnerError::Hook).
pub trait ConversationHooks: Send + Sync {
    type State: Send;

    /// Produce the next user prompt from the current state.
    fn render_prompt(&self, state: &Self::State) -> anyhow::Result<String>;

    /// Fold the assistant's response into the state.
    fn update_state(&self, state: Self::State, response: &str) -> anyhow::Result<Self::State>;

    /// Whether the conversation is finished.
    fn stop(&self, state: &Self::State) -> anyhow::Result<bool>;
}
