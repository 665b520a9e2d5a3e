use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("import error: {0}")]
    Import(#[from] ImportError),
}

/// Failures that reject an import payload as a whole.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImportError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}
