//! Single-flight model registry
//!
//! Loads each model at most once per process. Concurrent first callers for
//! the same id wait on one load instead of starting their own; a failed load
//! leaves the slot empty so the next caller retries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info};

type Slot<T> = Arc<OnceCell<Arc<T>>>;

/// Lazily populated map from model id to loaded model
pub struct ModelRegistry<T> {
    slots: Mutex<HashMap<String, Slot<T>>>,
}

impl<T> Default for ModelRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ModelRegistry<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, model_id: &str) -> Slot<T> {
        // Only held for the map lookup, never across an await
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(model_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Return the model for `model_id`, running `loader` if it is not loaded yet
    pub async fn get_or_load<F, Fut, E>(&self, model_id: &str, loader: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = self.slot(model_id);
        if let Some(model) = slot.get() {
            return Ok(model.clone());
        }

        let model = slot
            .get_or_try_init(|| async move {
                info!(model_id, "Loading model");
                let model = loader().await?;
                debug!(model_id, "Model loaded");
                Ok::<_, E>(Arc::new(model))
            })
            .await?;

        Ok(model.clone())
    }

    /// True if `model_id` has been loaded successfully
    pub fn is_loaded(&self, model_id: &str) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(model_id)
            .map(|slot| slot.initialized())
            .unwrap_or(false)
    }

    /// Number of models loaded so far
    pub fn loaded_count(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.initialized()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_first_use_loads_once() {
        let registry = Arc::new(ModelRegistry::<String>::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let loads = loads.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .get_or_load("asr", || async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, anyhow::Error>("whisper".to_string())
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().as_str(), "whisper");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(registry.is_loaded("asr"));
    }

    #[tokio::test]
    async fn test_distinct_ids_load_separately() {
        let registry = ModelRegistry::<u32>::new();
        let a = registry.get_or_load("a", || async { Ok::<_, anyhow::Error>(1) }).await.unwrap();
        let b = registry.get_or_load("b", || async { Ok::<_, anyhow::Error>(2) }).await.unwrap();

        assert_eq!((*a, *b), (1, 2));
        assert_eq!(registry.loaded_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let registry = ModelRegistry::<u32>::new();

        let first = registry
            .get_or_load("tts", || async { Err::<u32, _>(anyhow::anyhow!("offline")) })
            .await;
        assert!(first.is_err());
        assert!(!registry.is_loaded("tts"));

        let second = registry.get_or_load("tts", || async { Ok::<_, anyhow::Error>(7) }).await;
        assert_eq!(*second.unwrap(), 7);
    }
}
