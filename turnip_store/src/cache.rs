use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use tracing::{debug, info};
use turnip_core::{CompletionCache, CompletionResult};
use turnip_entities::completion_cache;

use crate::convert;
use crate::schema;

/// Completion cache stored in the `completion_cache` table.
pub struct DatabaseCache {
    db: DatabaseConnection,
}

impl DatabaseCache {
    /// Connect to `database_url` and make sure the table exists.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let cache = Self::from_connection(schema::connect(database_url).await?);
        cache.init_schema().await?;
        Ok(cache)
    }

    #[must_use]
    pub const fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn init_schema(&self) -> anyhow::Result<()> {
        schema::create_table(&self.db, completion_cache::Entity).await?;
        info!("completion_cache table ready");
        Ok(())
    }
}

#[async_trait]
impl CompletionCache for DatabaseCache {
    async fn fetch(&self, key: &str) -> anyhow::Result<Option<CompletionResult>> {
        completion_cache::Entity::find_by_id(key.to_owned())
            .one(&self.db)
            .await?
            .map(convert::completion_from_model)
            .transpose()
    }

    async fn insert(&self, key: &str, value: &CompletionResult) -> anyhow::Result<()> {
        let model = completion_cache::ActiveModel {
            cache_key: Set(key.to_owned()),
            response: Set(serde_json::to_value(value)?),
            created_at: Set(Utc::now().into()),
        };

        let inserted = completion_cache::Entity::insert(model)
            .on_conflict(
                OnConflict::column(completion_cache::Column::CacheKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if inserted == 0 {
            debug!("Cache entry {key} already present, keeping first");
        }
        Ok(())
    }
}
