use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Invalid price series: {0}")]
    InvalidSeries(String),
}

impl EngineError {
    pub fn invalid_parameter<S: Into<String>>(name: &'static str, reason: S) -> Self {
        EngineError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
