//! Seams to the external record store.
//!
//! The search core only reads. Any backend (Postgres, an HTTP data service,
//! the in-memory [`crate::MemoryStore`]) can serve a search by implementing
//! [`RecordStore`] and [`Directory`].

use async_trait::async_trait;
use bizdir_core::{BusinessRecord, Category, Location, Region};

use crate::error::StoreError;
use crate::predicate::Predicate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort keys understood by the store, in precedence order within a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// `premium OR sponsored`.
    Promoted(SortDirection),
    CreatedAt(SortDirection),
    Id(SortDirection),
}

/// Related records embedded into each returned business.
///
/// Eager loading replaces per-row follow-up lookups: one query returns the
/// business together with its category, location, region and ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Include {
    pub category: bool,
    pub location: bool,
    pub region: bool,
    pub ratings: bool,
}

impl Include {
    #[must_use]
    pub fn all() -> Self {
        Self {
            category: true,
            location: true,
            region: true,
            ratings: true,
        }
    }

    #[must_use]
    pub fn none() -> Self {
        Self {
            category: false,
            location: false,
            region: false,
            ratings: false,
        }
    }
}

impl Default for Include {
    fn default() -> Self {
        Self::all()
    }
}

/// A single filtered, sorted, windowed read of the `businesses` collection.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessQuery {
    pub predicate: Predicate,
    pub order_by: Vec<SortKey>,
    /// `None` returns every match.
    pub limit: Option<u64>,
    pub offset: u64,
    pub include: Include,
}

impl BusinessQuery {
    #[must_use]
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            order_by: Vec::new(),
            limit: None,
            offset: 0,
            include: Include::all(),
        }
    }

    #[must_use]
    pub fn order_by(mut self, keys: impl IntoIterator<Item = SortKey>) -> Self {
        self.order_by = keys.into_iter().collect();
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn include(mut self, include: Include) -> Self {
        self.include = include;
        self
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Return businesses matching `query.predicate`, sorted and windowed as asked.
    async fn query_businesses(
        &self,
        query: &BusinessQuery,
    ) -> Result<Vec<BusinessRecord>, StoreError>;

    /// Count every business matching `predicate`, ignoring any window.
    async fn count_businesses(&self, predicate: &Predicate) -> Result<u64, StoreError>;
}

/// Slug/name lookups for the reference collections.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Exact-name lookup.
    async fn location_by_name(&self, name: &str) -> Result<Option<Location>, StoreError>;

    /// Every location that has both latitude and longitude.
    async fn located_locations(&self) -> Result<Vec<Location>, StoreError>;

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;

    async fn region_by_code(&self, code: &str) -> Result<Option<Region>, StoreError>;
}
