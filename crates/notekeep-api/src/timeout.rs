use std::future::Future;

use notekeep_db::StoreError;
use notekeep_types::deadline::Deadline;

/// Run a store call under the request deadline. Expiry becomes
/// `StoreError::Timeout` and is never retried.
pub(crate) async fn store_call<T>(
    deadline: &Deadline,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    deadline
        .bound(call)
        .await
        .unwrap_or_else(|_| Err(StoreError::Timeout))
}
