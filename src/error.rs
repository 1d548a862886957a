use thiserror::Error;

use crate::criteria::{Criterion, Group};

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("malformed value for {field}: {reason}")]
    MalformedValue { field: String, reason: String },

    #[error("{field} expects {expected} values, got {actual}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("{0} weight vector must have a positive sum")]
    ZeroWeights(Group),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("segment {link_id} cannot be scored: {reason}")]
    InvalidSegment { link_id: u64, reason: String },

    #[error(
        "{criterion} fell through to grade 0 on {count} segment(s), first LINK_ID {first_link_id}"
    )]
    UndeterminedGrade {
        criterion: Criterion,
        count: usize,
        first_link_id: u64,
    },
}

pub type Result<T> = std::result::Result<T, ScoringError>;
