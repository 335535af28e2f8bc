use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no raw comment batch for {title} #{episode}")]
    MissingInput { title: String, episode: i64 },

    #[error("sentiment scorer failed at comment {index}: {reason}")]
    ScorerFailure { index: usize, reason: String },

    #[error("comment {index} has an unparseable timestamp: {value:?}")]
    MalformedTimestamp { index: usize, value: String },

    #[error("field '{field}' is not numeric: {value:?}")]
    MalformedNumber { field: String, value: String },

    #[error("cannot classify an empty comment batch")]
    EmptyBatch,

    #[error("comment batch is not newest-first: comment {index} is newer than its predecessor")]
    OrderingViolation { index: usize },

    #[error("invalid episode key: {0}")]
    InvalidKey(String),

    #[error("upstream source error: {0:#}")]
    Source(anyhow::Error),

    #[error("episode store error: {0:#}")]
    Storage(anyhow::Error),
}

impl PipelineError {
    pub fn is_missing_input(&self) -> bool {
        matches!(self, PipelineError::MissingInput { .. })
    }
}
