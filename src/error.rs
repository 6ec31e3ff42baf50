use thiserror::Error;

/// Failures raised by the model algebra. All of them are deterministic precondition
/// or algebra violations, detected synchronously; none of them is transient.
#[derive(Debug, Error)]
pub enum ModelError {

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Field '{0}' must have a singular domain to be conditioned out")]
    NotSingular(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDtype(String),

    #[error("Point has {found} coordinates, but the model has {expected} fields")]
    DimensionMismatch { expected : usize, found : usize },

    #[error("Covariance block is not invertible")]
    SingularCovariance,

    #[error("Field '{0}' has already been marginalized")]
    AlreadyMarginalized(String),

    #[error("No field named '{0}' in the model")]
    UnknownField(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Conditioning on an outcome with zero probability ({0})")]
    ZeroProbability(String),

    #[error("Cannot fit a model on an empty sample")]
    EmptySample,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error)

}

pub type Result<T> = std::result::Result<T, ModelError>;
