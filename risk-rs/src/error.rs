use thiserror::Error;

pub type Result<T> = std::result::Result<T, RiskError>;

/// Errors raised by the risk engine.
///
/// Invalid parameters are fatal for the whole batch; nothing is retried and no
/// partial result is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("non-finite value {value} while evaluating {context}")]
    Numerical { context: &'static str, value: f64 },

    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("distribution error for `{name}`: {reason}")]
    Distribution { name: &'static str, reason: String },
}

impl RiskError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        RiskError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub fn numerical(context: &'static str, value: f64) -> Self {
        RiskError::Numerical { context, value }
    }

    pub fn distribution(name: &'static str, reason: impl ToString) -> Self {
        RiskError::Distribution {
            name,
            reason: reason.to_string(),
        }
    }

    /// Name of the offending parameter, if the error is about one.
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            RiskError::InvalidParameter { name, .. } | RiskError::Distribution { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}
