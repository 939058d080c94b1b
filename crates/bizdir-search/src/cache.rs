//! Read-through cache in front of a [`Directory`].
//!
//! Entries are immutable snapshots behind `Arc`; a stale entry is replaced
//! wholesale on the next read, never edited in place. Concurrent searches
//! share the cache safely.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bizdir_core::{Category, Location, Region};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::Directory;

#[derive(Debug)]
struct Snapshot<T> {
    value: Arc<T>,
    loaded_at: Instant,
}

impl<T> Snapshot<T> {
    fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
            loaded_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.loaded_at.elapsed() < ttl
    }
}

type Keyed<T> = RwLock<HashMap<String, Snapshot<Option<T>>>>;

pub struct CachedDirectory {
    inner: Arc<dyn Directory>,
    ttl: Duration,
    located: RwLock<Option<Snapshot<Vec<Location>>>>,
    locations: Keyed<Location>,
    categories: Keyed<Category>,
    regions: Keyed<Region>,
}

impl CachedDirectory {
    #[must_use]
    pub fn new(inner: Arc<dyn Directory>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            located: RwLock::new(None),
            locations: RwLock::new(HashMap::new()),
            categories: RwLock::new(HashMap::new()),
            regions: RwLock::new(HashMap::new()),
        }
    }

    /// Drop every snapshot; the next lookup of each kind goes to the inner directory.
    pub async fn invalidate(&self) {
        *self.located.write().await = None;
        self.locations.write().await.clear();
        self.categories.write().await.clear();
        self.regions.write().await.clear();
    }
}

async fn cached_lookup<T, F, Fut>(
    map: &Keyed<T>,
    key: &str,
    ttl: Duration,
    load: F,
) -> Result<Option<T>, StoreError>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, StoreError>>,
{
    if let Some(snapshot) = map.read().await.get(key) {
        if snapshot.is_fresh(ttl) {
            return Ok(snapshot.value.as_ref().clone());
        }
    }

    let loaded = load().await?;
    map.write()
        .await
        .insert(key.to_string(), Snapshot::new(loaded.clone()));
    Ok(loaded)
}

#[async_trait]
impl Directory for CachedDirectory {
    async fn location_by_name(&self, name: &str) -> Result<Option<Location>, StoreError> {
        cached_lookup(&self.locations, name, self.ttl, || {
            self.inner.location_by_name(name)
        })
        .await
    }

    async fn located_locations(&self) -> Result<Vec<Location>, StoreError> {
        if let Some(snapshot) = self.located.read().await.as_ref() {
            if snapshot.is_fresh(self.ttl) {
                return Ok(snapshot.value.as_ref().clone());
            }
        }

        let loaded = self.inner.located_locations().await?;
        tracing::debug!(count = loaded.len(), "refreshed located-locations snapshot");
        *self.located.write().await = Some(Snapshot::new(loaded.clone()));
        Ok(loaded)
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        cached_lookup(&self.categories, slug, self.ttl, || {
            self.inner.category_by_slug(slug)
        })
        .await
    }

    async fn region_by_code(&self, code: &str) -> Result<Option<Region>, StoreError> {
        let key = code.to_ascii_uppercase();
        cached_lookup(&self.regions, &key, self.ttl, || {
            self.inner.region_by_code(code)
        })
        .await
    }
}
