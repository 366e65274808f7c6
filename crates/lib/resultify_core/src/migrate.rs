//! Schema migrations embedded from `resultify_core/migrations/`.

use sqlx::PgPool;
use tracing::info;

/// Bring the schema up to date (users, admins, revoked tokens).
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    let migrator = sqlx::migrate!("./migrations");
    info!(count = migrator.iter().count(), "applying embedded migrations");
    migrator.run(pool).await
}
