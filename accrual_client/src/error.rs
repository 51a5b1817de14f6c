use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccrualApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Accrual service unreachable after {attempts} attempts: {message}")]
    Network { attempts: usize, message: String },
}
