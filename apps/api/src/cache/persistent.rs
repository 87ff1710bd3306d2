//! Durable cache tier over the `analyses` table.
//!
//! The compound unique constraint on (resume_hash, jd_hash) is the only true
//! serialization point in the system: a duplicate insert from a racing writer
//! surfaces as `TierError::Conflict`, anything else (connectivity, storage
//! faults) as `TierError::Unavailable`.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::cache::key::CacheKey;
use crate::cache::tier::{CacheTier, TierError};
use crate::models::analysis::{AnalysisRow, CachedAnalysis};

pub struct PersistentTier {
    pool: PgPool,
}

impl PersistentTier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheTier for PersistentTier {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedAnalysis>, TierError> {
        let row: Option<AnalysisRow> = sqlx::query_as(
            "SELECT id, created_at, missing_skills, learning_steps, interview_questions
             FROM analyses
             WHERE resume_hash = $1 AND jd_hash = $2",
        )
        .bind(&key.resume_hash)
        .bind(&key.jd_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TierError::Unavailable(e.to_string()))?;

        Ok(row.map(CachedAnalysis::from))
    }

    async fn put(&self, key: &CacheKey, entry: &CachedAnalysis) -> Result<(), TierError> {
        sqlx::query(
            "INSERT INTO analyses
                (id, created_at, resume_hash, jd_hash, missing_skills, learning_steps, interview_questions)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.created_at)
        .bind(&key.resume_hash)
        .bind(&key.jd_hash)
        .bind(&entry.analysis.missing_skills)
        .bind(Json(&entry.analysis.learning_steps))
        .bind(&entry.analysis.interview_questions)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                TierError::Conflict
            } else {
                TierError::Unavailable(e.to_string())
            }
        })?;

        Ok(())
    }
}
