use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Bootstraps the schema on startup. The compound unique constraint on
/// (resume_hash, jd_hash) must exist before the first request — it is the
/// only serialization point between concurrent writers.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS analyses (
            id UUID PRIMARY KEY,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            resume_hash TEXT NOT NULL,
            jd_hash TEXT NOT NULL,
            missing_skills TEXT[] NOT NULL,
            learning_steps JSONB NOT NULL,
            interview_questions TEXT[] NOT NULL,
            UNIQUE (resume_hash, jd_hash)
        )",
    )
    .execute(pool)
    .await?;

    info!("Database schema ready");
    Ok(())
}
