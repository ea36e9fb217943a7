use async_trait::async_trait;
use shared::{
    error::ReportError,
    protocol::{QueryVariables, RawReport},
};

pub mod controller;
pub mod credentials;
pub mod transform;
pub mod transport;
pub mod view_model;

pub use controller::{
    ControllerError, ControllerOptions, FetchStatus, Navigation, NavigationRejected,
    PaginationController, ReportEvent, DEFAULT_PAGE_SIZE,
};
pub use credentials::{
    AccessToken, ClientCredentialsProvider, MissingCredentialProvider, StaticTokenProvider,
};
pub use transform::{coerce_cell, transform};
pub use transport::GraphqlQueryExecutor;
pub use view_model::ReportViewModel;

/// Source of the bearer token handed to the controller at construction.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, ReportError>;
}

/// Executes one report query against the analytics service.
///
/// Timeouts and retries of the underlying transport belong to the implementor.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(
        &self,
        query: &str,
        variables: &QueryVariables,
        token: &AccessToken,
    ) -> Result<RawReport, ReportError>;
}
