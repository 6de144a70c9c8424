use serde::{Deserialize, Serialize};

use crate::CompletionResult;

/// Label used for any identity field the caller leaves unset.
pub const DEFAULT_LABEL: &str = "default";

/// Labels scoping a conversation's records in the result log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub project: String,
    pub experiment: String,
    pub run: String,
    pub instance: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            project: DEFAULT_LABEL.to_string(),
            experiment: DEFAULT_LABEL.to_string(),
            run: DEFAULT_LABEL.to_string(),
            instance: DEFAULT_LABEL.to_string(),
        }
    }
}

impl Identity {
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        experiment: impl Into<String>,
        run: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            experiment: experiment.into(),
            run: run.into(),
            instance: instance.into(),
        }
    }

    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    #[must_use]
    pub fn with_experiment(mut self, experiment: impl Into<String>) -> Self {
        self.experiment = experiment.into();
        self
    }

    #[must_use]
    pub fn with_run(mut self, run: impl Into<String>) -> Self {
        self.run = run.into();
        self
    }

    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.project, self.experiment, self.run, self.instance
        )
    }
}

/// One logged turn of a conversation.
///
/// Keyed by identity + `turn`; the result log keeps the first record written
/// for a key and ignores later inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    #[serde(flatten)]
    pub identity: Identity,
    pub turn: u32,
    pub cache_key: String,
    pub response: CompletionResult,
}
