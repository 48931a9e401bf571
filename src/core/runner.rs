//! Operation runner abstraction.

use async_trait::async_trait;

/// Something able to perform a remote-data operation for a request.
///
/// The runner owns the transport (HTTP client, database pool, ...). The
/// scheduler only needs a deferred call that yields a value or an error,
/// so any type producing `Result<T, E>` for a request `R` fits.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_request_gate::core::{OperationRunner, RemoteError};
///
/// #[derive(Clone)]
/// struct HoursClient;
///
/// struct HoursQuery {
///     member_id: u64,
///     period: (String, String),
/// }
///
/// #[async_trait]
/// impl OperationRunner<HoursQuery, u64, RemoteError> for HoursClient {
///     async fn run(&self, query: HoursQuery) -> Result<u64, RemoteError> {
///         Ok(query.member_id * 3_600_000)
///     }
/// }
/// ```
#[async_trait]
pub trait OperationRunner<R, T, E>: Send + Sync + Clone + 'static
where
    R: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Perform the operation for `request`.
    async fn run(&self, request: R) -> Result<T, E>;
}
