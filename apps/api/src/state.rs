use std::sync::Arc;

use sqlx::PgPool;

use crate::analyzer::GapAnalyzer;
use crate::cache::coordinator::AnalysisCache;

/// Shared application state injected into all route handlers via Axum
/// extractors. The cache and analyzer are constructed once in `main` and
/// passed in here — no module-level globals.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// The two-tier cache coordinator fronting the analyzer.
    pub cache: Arc<AnalysisCache>,
    /// Pluggable gap analyzer. Production: ClaudeAnalyzer; tests swap in a
    /// deterministic stub.
    pub analyzer: Arc<dyn GapAnalyzer>,
}
