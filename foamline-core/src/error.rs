/// Engine-wide error taxonomy.
///
/// Every operation surfaces exactly one of these categories so callers can
/// distinguish bad input from conflicts, missing records, rejected evidence
/// and upstream outages. Evidence rejection is deliberately separate from
/// low-confidence extraction: the former is never persisted, the latter is.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("evidence rejected: {0}")]
    EvidenceRejected(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
