//! Postgres implementation of the search storage seams.

use async_trait::async_trait;
use bizdir_core::{BusinessRecord, Category, Location, Region};
use bizdir_search::{BusinessQuery, Directory, Predicate, RecordStore, StoreError};
use sqlx::PgPool;

use crate::{businesses, directory, DbError};

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::unavailable(err.to_string())
    }
}

/// Serves searches from a Postgres pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn query_businesses(
        &self,
        query: &BusinessQuery,
    ) -> Result<Vec<BusinessRecord>, StoreError> {
        Ok(businesses::query_businesses(&self.pool, query).await?)
    }

    async fn count_businesses(&self, predicate: &Predicate) -> Result<u64, StoreError> {
        Ok(businesses::count_businesses(&self.pool, predicate).await?)
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn location_by_name(&self, name: &str) -> Result<Option<Location>, StoreError> {
        let row = directory::get_location_by_name(&self.pool, name).await?;
        Ok(row.map(Location::from))
    }

    async fn located_locations(&self) -> Result<Vec<Location>, StoreError> {
        let rows = directory::list_located_locations(&self.pool).await?;
        Ok(rows.into_iter().map(Location::from).collect())
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let row = directory::get_category_by_slug(&self.pool, slug).await?;
        Ok(row.map(Category::from))
    }

    async fn region_by_code(&self, code: &str) -> Result<Option<Region>, StoreError> {
        let row = directory::get_region_by_code(&self.pool, code).await?;
        Ok(row.map(Region::from))
    }
}
