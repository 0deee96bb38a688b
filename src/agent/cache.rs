//! LLM Response Cache
//!
//! Re-running the crew on the same case text replays identical prompts;
//! this cache answers them without another model call.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agent::LLMProvider;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    model: String,
    prompt_hash: [u8; 32],
    system_hash: [u8; 32],
    /// Bit pattern of the sampling temperature, when one was requested
    temperature: Option<u32>,
}

impl CacheKey {
    fn new(model: &str, prompt: &str, system: Option<&str>, temperature: Option<f32>) -> Self {
        Self {
            model: model.to_string(),
            prompt_hash: LLMCache::hash(prompt),
            system_hash: LLMCache::hash(system.unwrap_or("")),
            temperature: temperature.map(f32::to_bits),
        }
    }
}

pub struct LLMCache {
    responses: RwLock<HashMap<CacheKey, String>>,
}

impl LLMCache {
    pub fn new() -> Self {
        Self { responses: RwLock::new(HashMap::new()) }
    }

    fn hash(text: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.finalize().into()
    }

    pub async fn get(&self, model: &str, prompt: &str, system: Option<&str>, temperature: Option<f32>) -> Option<String> {
        self.responses
            .read()
            .await
            .get(&CacheKey::new(model, prompt, system, temperature))
            .cloned()
    }

    pub async fn set(&self, model: &str, prompt: &str, system: Option<&str>, temperature: Option<f32>, response: String) {
        self.responses
            .write()
            .await
            .insert(CacheKey::new(model, prompt, system, temperature), response);
    }

    pub async fn clear(&self) {
        self.responses.write().await.clear();
    }
}

impl Default for LLMCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider that wraps another provider with a cache
pub struct CachedProvider {
    inner: Arc<dyn LLMProvider>,
    cache: Arc<LLMCache>,
}

impl CachedProvider {
    pub fn new(inner: Arc<dyn LLMProvider>, cache: Arc<LLMCache>) -> Self {
        Self { inner, cache }
    }

    async fn cached(
        &self,
        model: &str,
        prompt: String,
        system: Option<String>,
        temperature: Option<f32>,
    ) -> anyhow::Result<String> {
        if let Some(cached) = self.cache.get(model, &prompt, system.as_deref(), temperature).await {
            tracing::debug!("LLM Cache Hit for model {}", model);
            return Ok(cached);
        }

        let response = match temperature {
            Some(t) => self.inner.generate_with_temperature(model, prompt.clone(), system.clone(), t).await?,
            None => self.inner.generate(model, prompt.clone(), system.clone()).await?,
        };
        self.cache
            .set(model, &prompt, system.as_deref(), temperature, response.clone())
            .await;
        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for CachedProvider {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> anyhow::Result<String> {
        self.cached(model, prompt, system, None).await
    }

    async fn generate_with_temperature(
        &self,
        model: &str,
        prompt: String,
        system: Option<String>,
        temperature: f32,
    ) -> anyhow::Result<String> {
        self.cached(model, prompt, system, Some(temperature)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct EchoProvider {
        calls: AtomicUsize,
        temperatures: Mutex<Vec<Option<f32>>>,
    }

    impl EchoProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), temperatures: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn generate(&self, _model: &str, prompt: String, _system: Option<String>) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.temperatures.lock().await.push(None);
            Ok(format!("echo: {}", prompt))
        }

        async fn generate_with_temperature(
            &self,
            _model: &str,
            prompt: String,
            _system: Option<String>,
            temperature: f32,
        ) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.temperatures.lock().await.push(Some(temperature));
            Ok(format!("echo@{}: {}", temperature, prompt))
        }
    }

    #[tokio::test]
    async fn test_cache_get_set() {
        let cache = LLMCache::new();
        cache.set("m", "hello", Some("be precise"), None, "hi".into()).await;
        assert_eq!(cache.get("m", "hello", Some("be precise"), None).await.as_deref(), Some("hi"));
        assert!(cache.get("m", "hello", None, None).await.is_none());
        assert!(cache.get("other", "hello", Some("be precise"), None).await.is_none());
        assert!(cache.get("m", "hello", Some("be precise"), Some(0.2)).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let cache = LLMCache::new();
        cache.set("m", "p", None, Some(0.5), "r".into()).await;
        assert!(cache.get("m", "p", None, Some(0.5)).await.is_some());
        cache.clear().await;
        assert!(cache.get("m", "p", None, Some(0.5)).await.is_none());
    }

    #[tokio::test]
    async fn test_cached_provider_calls_inner_once() {
        let inner = EchoProvider::new();
        let provider = CachedProvider::new(inner.clone(), Arc::new(LLMCache::new()));

        let a = provider.generate("m", "case".into(), None).await.unwrap();
        let b = provider.generate("m", "case".into(), None).await.unwrap();
        assert_eq!(a, "echo: case");
        assert_eq!(a, b);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_provider_forwards_temperature() {
        let inner = EchoProvider::new();
        let provider = CachedProvider::new(inner.clone(), Arc::new(LLMCache::new()));

        let cold = provider.generate_with_temperature("m", "case".into(), None, 0.0).await.unwrap();
        let warm = provider.generate_with_temperature("m", "case".into(), None, 0.9).await.unwrap();
        provider.generate_with_temperature("m", "case".into(), None, 0.0).await.unwrap();

        assert_eq!(cold, "echo@0: case");
        assert_eq!(warm, "echo@0.9: case");
        assert_eq!(*inner.temperatures.lock().await, vec![Some(0.0), Some(0.9)]);
    }
}
