use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info};
use turnip_core::{Identity, ResultLog, TurnRecord};
use turnip_entities::turn_records;

use crate::convert;
use crate::schema;

/// Result log stored in the `turn_records` table.
pub struct DatabaseResultLog {
    db: DatabaseConnection,
}

impl DatabaseResultLog {
    /// Connect to `database_url` and make sure the table exists.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let log = Self::from_connection(schema::connect(database_url).await?);
        log.init_schema().await?;
        Ok(log)
    }

    #[must_use]
    pub const fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn init_schema(&self) -> anyhow::Result<()> {
        schema::create_table(&self.db, turn_records::Entity).await?;
        info!("turn_records table ready");
        Ok(())
    }

    /// Every record of one conversation, ordered by turn.
    pub async fn list_run(&self, identity: &Identity) -> anyhow::Result<Vec<TurnRecord>> {
        turn_records::Entity::find()
            .filter(turn_records::Column::Project.eq(identity.project.as_str()))
            .filter(turn_records::Column::Experiment.eq(identity.experiment.as_str()))
            .filter(turn_records::Column::Run.eq(identity.run.as_str()))
            .filter(turn_records::Column::Instance.eq(identity.instance.as_str()))
            .order_by_asc(turn_records::Column::Turn)
            .all(&self.db)
            .await?
            .into_iter()
            .map(convert::turn_record_from_model)
            .collect()
    }
}

#[async_trait]
impl ResultLog for DatabaseResultLog {
    async fn fetch(&self, identity: &Identity, turn: u32) -> anyhow::Result<Option<TurnRecord>> {
        turn_records::Entity::find_by_id((
            identity.project.clone(),
            identity.experiment.clone(),
            identity.run.clone(),
            identity.instance.clone(),
            i64::from(turn),
        ))
        .one(&self.db)
        .await?
        .map(convert::turn_record_from_model)
        .transpose()
    }

    async fn insert(&self, record: &TurnRecord) -> anyhow::Result<()> {
        let model = turn_records::ActiveModel {
            project: Set(record.identity.project.clone()),
            experiment: Set(record.identity.experiment.clone()),
            run: Set(record.identity.run.clone()),
            instance: Set(record.identity.instance.clone()),
            turn: Set(i64::from(record.turn)),
            cache_key: Set(record.cache_key.clone()),
            response: Set(serde_json::to_value(&record.response)?),
            created_at: Set(Utc::now().into()),
        };

        let inserted = turn_records::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    turn_records::Column::Project,
                    turn_records::Column::Experiment,
                    turn_records::Column::Run,
                    turn_records::Column::Instance,
                    turn_records::Column::Turn,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if inserted == 0 {
            debug!(
                "Turn {} of {} already logged, keeping first",
                record.turn, record.identity
            );
        } else {
            debug!("Logged turn {} of {}", record.turn, record.identity);
        }
        Ok(())
    }
}
