//! Per-key registry of in-flight origin fetches

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::domain::DomainError;

type SharedFetch<E> = Shared<BoxFuture<'static, Result<E, DomainError>>>;

/// Lets concurrent callers for the same key await one fetch instead of each
/// issuing their own.
pub struct InFlightLoads<E>
where
    E: Clone + Send + Sync + 'static,
{
    pending: Mutex<HashMap<String, SharedFetch<E>>>,
}

impl<E> InFlightLoads<E>
where
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Joins the fetch already running for `key`, or starts one with `fetch`
    pub async fn join<F>(&self, key: &str, fetch: F) -> Result<E, DomainError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<E, DomainError>>,
    {
        let shared = {
            let mut pending = self
                .pending
                .lock()
                .map_err(|e| DomainError::internal(format!("In-flight registry poisoned: {}", e)))?;

            match pending.get(key) {
                Some(existing) => {
                    tracing::debug!(key = %key, "Joining in-flight origin fetch");
                    existing.clone()
                }
                None => {
                    let fetch = fetch().shared();
                    pending.insert(key.to_string(), fetch.clone());
                    fetch
                }
            }
        };

        let result = shared.clone().await;

        // whoever finishes first clears the slot, unless a newer fetch took it
        if let Ok(mut pending) = self.pending.lock() {
            if pending.get(key).is_some_and(|current| current.ptr_eq(&shared)) {
                pending.remove(key);
            }
        }

        result
    }

    /// Number of keys with a fetch in progress
    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for InFlightLoads<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for InFlightLoads<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightLoads")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_concurrent_joins_share_one_fetch() {
        let loads: Arc<InFlightLoads<String>> = Arc::new(InFlightLoads::new());
        let fetches = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());

        let mut handles = Vec::new();

        for _ in 0..4 {
            let loads = Arc::clone(&loads);
            let fetches = Arc::clone(&fetches);
            let release = Arc::clone(&release);

            handles.push(tokio::spawn(async move {
                loads
                    .join("k", move || {
                        async move {
                            fetches.fetch_add(1, Ordering::SeqCst);
                            release.notified().await;
                            Ok("value".to_string())
                        }
                        .boxed()
                    })
                    .await
            }));
        }

        // let every task register before the fetch completes
        while loads.is_empty() {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        release.notify_waiters();
        release.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "value");
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(loads.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_joins_fetch_again() {
        let loads: InFlightLoads<u32> = InFlightLoads::new();
        let fetches = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let fetches = Arc::clone(&fetches);
            let value = loads
                .join("k", move || {
                    async move { Ok(fetches.fetch_add(1, Ordering::SeqCst) as u32) }.boxed()
                })
                .await
                .unwrap();
            assert!(value < 2);
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert!(loads.is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_shared_and_cleared() {
        let loads: InFlightLoads<u32> = InFlightLoads::new();

        let result = loads
            .join("k", || async { Err(DomainError::storage("origin down")) }.boxed())
            .await;

        assert_eq!(result, Err(DomainError::storage("origin down")));
        assert!(loads.is_empty());
    }
}
