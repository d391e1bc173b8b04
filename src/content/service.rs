use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::common::errors::WatchError;
use crate::common::http::HttpClient;
use crate::common::types::ContentId;
use crate::configs::ApiConfig;
use crate::content::models::{ContentItem, Details};

/// The catalog API as the watch subsystem sees it.
///
/// The controller and view only ever talk to this trait; the HTTP
/// implementation below is one provider, tests supply stubs.
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn fetch_latest(&self, page: u32) -> Result<Vec<ContentItem>, WatchError>;

    async fn fetch_details(&self, id: &ContentId) -> Result<Details, WatchError>;

    async fn search(&self, query: &str) -> Result<Vec<ContentItem>, WatchError>;

    async fn fetch_by_category(&self, category: &str, page: u32)
    -> Result<Vec<ContentItem>, WatchError>;
}

struct CacheEntry {
    fetched_at: Instant,
    value: serde_json::Value,
}

/// HTTP implementation of [`ContentApi`] with a TTL-bounded in-memory cache.
pub struct HttpContentService {
    client: reqwest::Client,
    base_url: String,
    cache: DashMap<String, CacheEntry>,
    cache_ttl: Duration,
}

impl HttpContentService {
    pub fn new(config: &ApiConfig) -> Result<Self, WatchError> {
        let client = HttpClient::with_timeout(Duration::from_millis(config.request_timeout_ms))
            .map_err(|e| WatchError::ContentFetchFailure(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: DashMap::new(),
            cache_ttl: Duration::from_millis(config.cache_ttl_ms),
        })
    }

    fn cache_get(&self, key: &str) -> Option<serde_json::Value> {
        let entry = self.cache.get(key)?;
        if entry.fetched_at.elapsed() < self.cache_ttl {
            trace!("Cache hit: {}", key);
            return Some(entry.value.clone());
        }
        drop(entry);
        self.cache.remove(key);
        None
    }

    fn cache_put(&self, key: &str, value: serde_json::Value) {
        self.cache.insert(
            key.to_string(),
            CacheEntry {
                fetched_at: Instant::now(),
                value,
            },
        );
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        cache_key: &str,
        path: &str,
        cacheable: impl Fn(&serde_json::Value) -> bool,
    ) -> Result<T, WatchError> {
        if let Some(cached) = self.cache_get(cache_key) {
            return serde_json::from_value(cached)
                .map_err(|e| WatchError::ContentFetchFailure(e.to_string()));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Catalog API returned {} for {}", status, url);
            return Err(WatchError::ContentFetchFailure(format!(
                "upstream returned {}",
                status
            )));
        }

        let value: serde_json::Value = response.json().await.map_err(map_transport)?;

        // Soft-fail payloads are never cached; the whole point of the retry
        // button is to re-ask the upstream.
        if cacheable(&value) {
            self.cache_put(cache_key, value.clone());
        }

        serde_json::from_value(value).map_err(|e| WatchError::ContentFetchFailure(e.to_string()))
    }
}

fn map_transport(e: reqwest::Error) -> WatchError {
    if e.is_timeout() {
        WatchError::ContentFetchTimeout("catalog request timed out".to_string())
    } else {
        WatchError::ContentFetchFailure(e.to_string())
    }
}

fn has_no_error_marker(value: &serde_json::Value) -> bool {
    value.get("error").map_or(true, |e| e.is_null())
}

#[async_trait]
impl ContentApi for HttpContentService {
    async fn fetch_latest(&self, page: u32) -> Result<Vec<ContentItem>, WatchError> {
        self.get_json(
            &format!("latest_{}", page),
            &format!("/content/latest?page={}", page),
            |_| true,
        )
        .await
    }

    async fn fetch_details(&self, id: &ContentId) -> Result<Details, WatchError> {
        self.get_json(
            &format!("details_{}", id),
            &format!("/content/details/{}", urlencoding::encode(id)),
            has_no_error_marker,
        )
        .await
    }

    async fn search(&self, query: &str) -> Result<Vec<ContentItem>, WatchError> {
        self.get_json(
            &format!("search_{}", query),
            &format!("/content/search?q={}", urlencoding::encode(query)),
            |_| true,
        )
        .await
    }

    async fn fetch_by_category(
        &self,
        category: &str,
        page: u32,
    ) -> Result<Vec<ContentItem>, WatchError> {
        self.get_json(
            &format!("category_{}_{}", category, page),
            &format!(
                "/content/group/{}?page={}",
                urlencoding::encode(category),
                page
            ),
            |_| true,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_fail_payloads_are_not_cacheable() {
        let busy = serde_json::json!({"error": "timeout", "message": "busy"});
        let ok = serde_json::json!({"title": "Film", "servers": []});
        assert!(!has_no_error_marker(&busy));
        assert!(has_no_error_marker(&ok));
    }

    #[test]
    fn cache_entries_expire() {
        let service = HttpContentService::new(&ApiConfig {
            base_url: "http://localhost:8000".into(),
            request_timeout_ms: 1_000,
            cache_ttl_ms: 0,
        })
        .unwrap();

        service.cache_put("k", serde_json::json!(1));
        assert!(service.cache_get("k").is_none());

        let service = HttpContentService::new(&ApiConfig::default()).unwrap();
        service.cache_put("k", serde_json::json!(1));
        assert_eq!(service.cache_get("k"), Some(serde_json::json!(1)));
    }
}
