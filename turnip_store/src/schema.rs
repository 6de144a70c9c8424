use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::info;

/// Open a connection pool to `database_url`.
pub async fn connect(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    info!("Connecting to database");
    let db = Database::connect(database_url).await?;
    info!("Database connection established");
    Ok(db)
}

/// `CREATE TABLE IF NOT EXISTS` for `entity`.
pub(crate) async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    entity: E,
) -> anyhow::Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();

    db.execute_unprepared(&backend.build(&stmt).to_string())
        .await?;
    Ok(())
}
