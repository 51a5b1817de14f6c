use async_trait::async_trait;

use crate::traits::{AccountManagement, AccrualLedger, OrderManagement, StorageError};

/// Explicit lifecycle control over a storage backend's resources.
#[async_trait]
pub trait Closeable {
    /// Releases the backend's connections. The backend must not be used afterwards.
    async fn close(&mut self) -> Result<(), StorageError>;
}

/// The full set of behaviour a storage backend must provide to support the loyalty gateway.
pub trait LoyaltyDatabase:
    AccrualLedger + OrderManagement + AccountManagement + Closeable + Clone + Send + Sync + 'static
{
    /// The URL of the database
    fn url(&self) -> &str;
}
