use accrual_client::AccrualApiError;
use accrual_engine::{OrderFlowError, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Could not queue orders for reconciliation. {0}")]
    OrderFlowError(#[from] OrderFlowError),
}

impl From<StorageError> for ServerError {
    fn from(e: StorageError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<AccrualApiError> for ServerError {
    fn from(e: AccrualApiError) -> Self {
        match e {
            AccrualApiError::Initialization(s) => {
                Self::InitializeError(format!("Could not create the accrual service client. {s}"))
            },
            e => Self::BackendError(e.to_string()),
        }
    }
}
