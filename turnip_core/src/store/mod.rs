mod memory;
mod repository;

pub use memory::{MemoryCache, MemoryResultLog};
pub use repository::{CompletionCache, ResultLog};
