//! Port for consumers of pattern-analyzer insights.
//!
//! Observers are optional integration points; a pipeline without any is
//! fully functional and only warns about it.

use std::sync::Arc;
use toolwise_domain::PatternSnapshot;

/// Receives every pattern snapshot the analyzer publishes.
///
/// `on_patterns_published` is synchronous and non-fallible: observer
/// failures must not disrupt the analysis pass.
pub trait InsightObserver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn on_patterns_published(&self, snapshot: &Arc<PatternSnapshot>);
}

/// No-op observer for tests.
pub struct NoInsightObserver;

impl InsightObserver for NoInsightObserver {
    fn name(&self) -> &str {
        "none"
    }

    fn on_patterns_published(&self, _snapshot: &Arc<PatternSnapshot>) {}
}
