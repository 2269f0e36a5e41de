//! Loader Module
//!
//! The caller-supplied function that computes values for missing keys.

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by a [`Loader`].
pub type LoadFuture<V> = Pin<Box<dyn Future<Output = anyhow::Result<V>> + Send + 'static>>;

// == Loader Trait ==
/// Computes the value for a key the cache does not hold.
///
/// Implementations must tolerate concurrent calls for different keys. The
/// cache guarantees at most one in-flight call per key. Timeouts and
/// cancellation are the loader's business: a failed or timed-out load is
/// reported to every caller waiting on that key.
///
/// Any `Fn(K) -> impl Future<Output = anyhow::Result<V>>` closure is a loader.
pub trait Loader<K, V>: Send + Sync {
    fn load(&self, key: K) -> LoadFuture<V>;
}

impl<K, V, F, Fut> Loader<K, V> for F
where
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    fn load(&self, key: K) -> LoadFuture<V> {
        Box::pin(self(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_is_loader() {
        let loader = |key: u32| async move { Ok::<_, anyhow::Error>(key * 2) };
        let value = Loader::<u32, u32>::load(&loader, 21).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_loader_error_passes_through() {
        let loader =
            |key: String| async move { Err::<String, _>(anyhow::anyhow!("no subscription for {}", key)) };
        let err = Loader::<String, String>::load(&loader, "sub-9".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no subscription for sub-9");
    }
}
