mod conversation_runner;
mod error;
mod hooks;

pub use conversation_runner::{ConversationOutcome, ConversationRunner};
pub use error::RunnerError;
pub use hooks::ConversationHooks;
