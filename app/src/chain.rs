//! Conversation driven from the command line: one opening prompt, then a
//! fixed follow-up until enough turns have run.

use turnip_core::ConversationHooks;

#[derive(Debug, Clone)]
pub struct ChainState {
    pub next_prompt: String,
    pub responses: Vec<String>,
}

impl ChainState {
    #[must_use]
    pub const fn new(prompt: String) -> Self {
        Self {
            next_prompt: prompt,
            responses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainConversation {
    follow_up: String,
    turns: usize,
}

impl ChainConversation {
    #[must_use]
    pub const fn new(follow_up: String, turns: usize) -> Self {
        Self { follow_up, turns }
    }
}

impl ConversationHooks for ChainConversation {
    type State = ChainState;

    fn render_prompt(&self, state: &ChainState) -> anyhow::Result<String> {
        Ok(state.next_prompt.clone())
    }

    fn update_state(&self, mut state: ChainState, response: &str) -> anyhow::Result<ChainState> {
        state.responses.push(response.to_string());
        state.next_prompt.clone_from(&self.follow_up);
        Ok(state)
    }

    fn stop(&self, state: &ChainState) -> anyhow::Result<bool> {
        Ok(state.responses.len() >= self.turns)
    }
}
