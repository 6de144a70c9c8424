use thiserror::Error;

/// Failure of a conversation, tagged with the collaborator that raised it.
///
/// Collaborator variants wrap the error untouched: `Display` and `source`
/// forward to it and [`RunnerError::into_inner`] hands it back.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Provider(anyhow::Error),

    #[error(transparent)]
    Cache(anyhow::Error),

    #[error(transparent)]
    ResultLog(anyhow::Error),

    #[error(transparent)]
    Hook(anyhow::Error),

    #[error("turn counter exhausted after turn {0}")]
    TurnLimit(u32),
}

impl RunnerError {
    #[must_use]
    pub fn into_inner(self) -> anyhow::Error {
        match self {
            Self::Provider(e) | Self::Cache(e) | Self::ResultLog(e) | Self::Hook(e) => e,
            limit @ Self::TurnLimit(_) => limit.into(),
        }
    }
}
