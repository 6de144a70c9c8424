use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One logged conversation turn.
///
/// The composite primary key (project, experiment, run, instance, turn) is
/// what makes repeated inserts of the same turn collapse to one row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "turn_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub project: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub experiment: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub run: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub instance: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub turn: i64,
    pub cache_key: String,
    /// Serialized `CompletionResult`.
    pub response: Json,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
