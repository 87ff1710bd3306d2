use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// One step of the generated learning roadmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStep {
    pub title: String,
    pub description: String,
}

/// The analyzer's output for one (resume, job description) pair:
/// missing skills, a 3-step learning roadmap, and 3 interview questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub missing_skills: Vec<String>,
    pub learning_steps: Vec<LearningStep>,
    pub interview_questions: Vec<String>,
}

/// A cache entry: the analysis payload plus the identity it was minted with.
/// Immutable once created — a cache hit never changes stored content, only
/// which tiers hold it.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAnalysis {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub analysis: GapAnalysis,
}

impl CachedAnalysis {
    /// Mints a new entry for a freshly computed analysis.
    pub fn new(analysis: GapAnalysis) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            analysis,
        }
    }
}

/// Durable row in the `analyses` table. One row per distinct input pair,
/// enforced by `UNIQUE (resume_hash, jd_hash)`.
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub missing_skills: Vec<String>,
    pub learning_steps: Json<Vec<LearningStep>>,
    pub interview_questions: Vec<String>,
}

impl From<AnalysisRow> for CachedAnalysis {
    fn from(row: AnalysisRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            analysis: GapAnalysis {
                missing_skills: row.missing_skills,
                learning_steps: row.learning_steps.0,
                interview_questions: row.interview_questions,
            },
        }
    }
}

/// Wire type returned by the analyze endpoints. Payload of the cache entry
/// plus the `cached` flag telling the caller whether a compute happened.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub missing_skills: Vec<String>,
    pub learning_steps: Vec<LearningStep>,
    pub interview_questions: Vec<String>,
    pub cached: bool,
}

impl AnalysisResponse {
    pub fn from_entry(entry: CachedAnalysis, cached: bool) -> Self {
        Self {
            id: entry.id,
            created_at: entry.created_at,
            missing_skills: entry.analysis.missing_skills,
            learning_steps: entry.analysis.learning_steps,
            interview_questions: entry.analysis.interview_questions,
            cached,
        }
    }
}
