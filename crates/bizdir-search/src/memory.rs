//! In-process store that evaluates predicates directly.
//!
//! Serves tests and demos, and pins down the meaning of a [`Predicate`]
//! independently of any SQL rendering.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use bizdir_core::{BusinessRecord, Category, Location, Region};

use crate::error::StoreError;
use crate::predicate::Predicate;
use crate::store::{BusinessQuery, Directory, Include, RecordStore, SortDirection, SortKey};

#[derive(Debug, Default)]
pub struct MemoryStore {
    locations: Vec<Location>,
    categories: Vec<Category>,
    regions: Vec<Region>,
    businesses: Vec<BusinessRecord>,
    fail_records: AtomicBool,
    fail_count: AtomicBool,
    fail_directory: AtomicBool,
    query_delay: Option<Duration>,
    directory_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: Region) -> Self {
        self.regions.push(region);
        self
    }

    /// Add a business, embedding its category, location and region from
    /// records added earlier.
    #[must_use]
    pub fn with_business(mut self, mut business: BusinessRecord) -> Self {
        business.category = business
            .category_id
            .and_then(|id| self.categories.iter().find(|c| c.id == id).cloned());
        business.location = business
            .location_id
            .and_then(|id| self.locations.iter().find(|l| l.id == id).cloned());
        business.region = business
            .region_id
            .and_then(|id| self.regions.iter().find(|r| r.id == id).cloned());
        self.businesses.push(business);
        self
    }

    /// Delay every business query, to exercise timeouts and cancellation.
    #[must_use]
    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    pub fn fail_records(&self, fail: bool) {
        self.fail_records.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn fail_count(&self, fail: bool) {
        self.fail_count.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn fail_directory(&self, fail: bool) {
        self.fail_directory.store(fail, AtomicOrdering::SeqCst);
    }

    /// Number of directory lookups served so far.
    pub fn directory_calls(&self) -> usize {
        self.directory_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of business queries served so far.
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(AtomicOrdering::SeqCst)
    }

    #[must_use]
    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }

    fn check_directory(&self) -> Result<(), StoreError> {
        self.directory_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_directory.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::unavailable("directory offline"));
        }
        Ok(())
    }
}

fn compare(a: &BusinessRecord, b: &BusinessRecord, keys: &[SortKey]) -> Ordering {
    keys.iter()
        .map(|key| match *key {
            SortKey::Promoted(dir) => directed(a.is_promoted().cmp(&b.is_promoted()), dir),
            SortKey::CreatedAt(dir) => directed(a.created_at.cmp(&b.created_at), dir),
            SortKey::Id(dir) => directed(a.id.cmp(&b.id), dir),
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

fn project(mut record: BusinessRecord, include: Include) -> BusinessRecord {
    if !include.category {
        record.category = None;
    }
    if !include.location {
        record.location = None;
    }
    if !include.region {
        record.region = None;
    }
    if !include.ratings {
        record.ratings.clear();
    }
    record
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query_businesses(
        &self,
        query: &BusinessQuery,
    ) -> Result<Vec<BusinessRecord>, StoreError> {
        self.query_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_records.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::unavailable("records offline"));
        }

        let mut matched: Vec<&BusinessRecord> = self
            .businesses
            .iter()
            .filter(|b| query.predicate.matches(b))
            .collect();
        matched.sort_by(|a, b| compare(a, b, &query.order_by));

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|b| project(b.clone(), query.include))
            .collect())
    }

    async fn count_businesses(&self, predicate: &Predicate) -> Result<u64, StoreError> {
        if self.fail_count.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::unavailable("count offline"));
        }
        let n = self.businesses.iter().filter(|b| predicate.matches(b)).count();
        Ok(n as u64)
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn location_by_name(&self, name: &str) -> Result<Option<Location>, StoreError> {
        self.check_directory()?;
        Ok(self.location(name).cloned())
    }

    async fn located_locations(&self) -> Result<Vec<Location>, StoreError> {
        self.check_directory()?;
        Ok(self
            .locations
            .iter()
            .filter(|l| l.coordinates().is_some())
            .cloned()
            .collect())
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        self.check_directory()?;
        Ok(self.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn region_by_code(&self, code: &str) -> Result<Option<Region>, StoreError> {
        self.check_directory()?;
        Ok(self
            .regions
            .iter()
            .find(|r| r.code.eq_ignore_ascii_case(code))
            .cloned())
    }
}
