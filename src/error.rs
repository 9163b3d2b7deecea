use thiserror::Error;

/// Failures of the parse/aggregate core. Fetching, caching and export sit
/// above this and report through `anyhow` with URL context.
#[derive(Debug, Error)]
pub enum Error {
    #[error("payload not found: {0}")]
    Extraction(String),

    #[error("repaired payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected payload shape: {0}")]
    Shape(String),

    #[error("record {record}: field `{field}` is not a scalar")]
    NonScalar { record: usize, field: String },

    #[error("record {record}: missing field `{field}`")]
    MissingField { record: usize, field: String },

    #[error("record {record}: field `{field}` is not numeric")]
    NotNumeric { record: usize, field: String },
}

pub type Result<T> = std::result::Result<T, Error>;
