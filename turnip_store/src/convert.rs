use turnip_core::{CompletionResult, Identity, TurnRecord};
use turnip_entities::{completion_cache, turn_records};

pub fn turn_record_from_model(m: turn_records::Model) -> anyhow::Result<TurnRecord> {
    Ok(TurnRecord {
        identity: Identity::new(m.project, m.experiment, m.run, m.instance),
        turn: u32::try_from(m.turn)?,
        cache_key: m.cache_key,
        response: serde_json::from_value(m.response)?,
    })
}

pub fn completion_from_model(m: completion_cache::Model) -> anyhow::Result<CompletionResult> {
    Ok(serde_json::from_value(m.response)?)
}
