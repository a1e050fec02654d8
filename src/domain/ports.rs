use crate::domain::model::{
    CommuteQuery, Credentials, DirectionsResult, TransitRequest, TransitResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Source of provider API keys. Kept separate so tests can hand in fixed keys.
pub trait CredentialSource: Send + Sync {
    fn load(&self) -> Result<Credentials>;
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn directions(&self, query: &CommuteQuery) -> Result<DirectionsResult>;
}

#[async_trait]
pub trait TransitProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn departures(&self, request: &TransitRequest) -> Result<TransitResult>;
}
