use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
}
