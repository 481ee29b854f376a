use thiserror::Error;

/// Rejection of a whole input batch.
///
/// Records are validated before any grouping or merging happens; a single
/// malformed record fails the batch rather than being coerced or dropped.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed annotation JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of records or an object with a 'rows' array")]
    UnexpectedShape,

    #[error("record {id}: confidence {value} is outside [0, 1]")]
    ConfidenceOutOfRange { id: i64, value: f64 },

    #[error("record {id}: top-k probability {value} for '{label}' is outside [0, 1]")]
    ProbabilityOutOfRange { id: i64, label: String, value: f64 },

    #[error("duplicate record id {0}")]
    DuplicateId(i64),
}
