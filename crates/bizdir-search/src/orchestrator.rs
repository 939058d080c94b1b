//! Drives one search request from validation to a ranked page.
//!
//! ```text
//! Idle -> [ResolvingNeighborhood] -> ComposingFilter -> Querying
//!      -> Aggregating -> Ranking -> Done
//! ```
//!
//! Any state may move to `Failed`. `ResolvingNeighborhood` only runs when the
//! request names a location. The only suspension points are the directory and
//! record-store calls, each bounded by [`SearchOptions::store_timeout`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bizdir_core::{AppConfig, BusinessRecord, SearchRequest};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CachedDirectory;
use crate::compose::{FilterComposer, Lookup, Resolved};
use crate::error::{SearchError, StoreError};
use crate::neighborhood::{Neighborhood, NeighborhoodResolver};
use crate::rank::{rank, Rankable};
use crate::rating::{RatingAggregator, RatingPolicy, RatingSummary};
use crate::store::{BusinessQuery, Directory, Include, RecordStore, SortDirection, SortKey};

/// Ordering asked of the store. Matches [`rank`] with `id` as a final
/// tie-break so consecutive pages never overlap or skip rows.
const STORE_ORDER: [SortKey; 3] = [
    SortKey::Promoted(SortDirection::Desc),
    SortKey::CreatedAt(SortDirection::Desc),
    SortKey::Id(SortDirection::Asc),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    ResolvingNeighborhood,
    ComposingFilter,
    Querying,
    Aggregating,
    Ranking,
    Done,
    Failed,
}

impl SearchState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SearchState::Idle => "idle",
            SearchState::ResolvingNeighborhood => "resolving_neighborhood",
            SearchState::ComposingFilter => "composing_filter",
            SearchState::Querying => "querying",
            SearchState::Aggregating => "aggregating",
            SearchState::Ranking => "ranking",
            SearchState::Done => "done",
            SearchState::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SearchState::Done | SearchState::Failed)
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Upper bound on every directory and record-store call.
    pub store_timeout: Duration,
    pub max_page_size: u32,
    pub rating_policy: RatingPolicy,
    /// `None` reads the directory directly on every search.
    pub directory_cache_ttl: Option<Duration>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            max_page_size: 100,
            rating_policy: RatingPolicy::ApprovedOnly,
            directory_cache_ttl: None,
        }
    }
}

impl SearchOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            store_timeout: Duration::from_millis(config.store_timeout_ms),
            max_page_size: config.max_page_size,
            rating_policy: RatingPolicy::from_approved_only(config.ratings_approved_only),
            directory_cache_ttl: (config.directory_cache_ttl_secs > 0)
                .then(|| Duration::from_secs(config.directory_cache_ttl_secs)),
        }
    }
}

/// A business together with its aggregated rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBusiness {
    #[serde(flatten)]
    pub business: BusinessRecord,
    pub rating: RatingSummary,
}

impl Rankable for RankedBusiness {
    fn promoted(&self) -> bool {
        self.business.is_promoted()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.business.created_at
    }
}

/// Matching-record count. Advisory when `exact` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotalCount {
    pub value: u64,
    pub exact: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub items: Vec<RankedBusiness>,
    pub total: TotalCount,
    pub page: u32,
    pub page_size: u32,
    /// Location names the search was widened to, nearest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
}

impl SearchResult {
    fn empty(request: &SearchRequest, locations: Option<Vec<String>>) -> Self {
        Self {
            items: Vec::new(),
            total: TotalCount {
                value: 0,
                exact: true,
            },
            page: request.page,
            page_size: request.page_size,
            locations,
        }
    }
}

/// Outcome of a search plus every state it passed through, in order.
#[derive(Debug)]
pub struct SearchRun {
    pub outcome: Result<SearchResult, SearchError>,
    pub states: Vec<SearchState>,
}

struct StateTrace {
    states: Vec<SearchState>,
}

impl StateTrace {
    fn new() -> Self {
        Self {
            states: vec![SearchState::Idle],
        }
    }

    fn enter(&mut self, next: SearchState) {
        let from = self.states.last().copied().unwrap_or(SearchState::Idle);
        tracing::debug!(from = %from, to = %next, "search state transition");
        self.states.push(next);
    }
}

pub struct SearchOrchestrator {
    records: Arc<dyn RecordStore>,
    directory: Arc<dyn Directory>,
    composer: FilterComposer,
    aggregator: RatingAggregator,
    options: SearchOptions,
}

impl SearchOrchestrator {
    /// Wraps `directory` in a [`CachedDirectory`] when the options ask for one.
    #[must_use]
    pub fn new(
        records: Arc<dyn RecordStore>,
        directory: Arc<dyn Directory>,
        options: SearchOptions,
    ) -> Self {
        let directory: Arc<dyn Directory> = match options.directory_cache_ttl {
            Some(ttl) => Arc::new(CachedDirectory::new(directory, ttl)),
            None => directory,
        };
        Self {
            records,
            directory,
            composer: FilterComposer,
            aggregator: RatingAggregator::new(options.rating_policy),
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Run a search to completion.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::MalformedRequest`] before any store access for
    /// an invalid request, and [`SearchError::StoreUnavailable`] when a
    /// directory or record-store call fails or times out. No matches is an
    /// empty result, not an error.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult, SearchError> {
        self.run(request).await.outcome
    }

    /// Like [`Self::search`], abandoning the run as soon as `cancelled`
    /// completes.
    ///
    /// # Errors
    ///
    /// As [`Self::search`], plus [`SearchError::Cancelled`].
    pub async fn search_until<C>(
        &self,
        request: &SearchRequest,
        cancelled: C,
    ) -> Result<SearchResult, SearchError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            () = cancelled => {
                tracing::info!("search cancelled by caller");
                Err(SearchError::Cancelled)
            }
            result = self.search(request) => result,
        }
    }

    /// Run a search and keep the state trace.
    pub async fn run(&self, request: &SearchRequest) -> SearchRun {
        let mut trace = StateTrace::new();
        let outcome = self.execute(request, &mut trace).await;
        match &outcome {
            Ok(result) => {
                trace.enter(SearchState::Done);
                tracing::info!(
                    term = ?request.term,
                    location = ?request.location,
                    category = ?request.category,
                    page = request.page,
                    returned = result.items.len(),
                    total = result.total.value,
                    total_exact = result.total.exact,
                    "search completed"
                );
            }
            Err(err) => {
                trace.enter(SearchState::Failed);
                tracing::warn!(error = %err, "search failed");
            }
        }
        SearchRun {
            outcome,
            states: trace.states,
        }
    }

    async fn execute(
        &self,
        request: &SearchRequest,
        trace: &mut StateTrace,
    ) -> Result<SearchResult, SearchError> {
        request.validate(self.options.max_page_size)?;

        let neighborhood = match request.location_name() {
            Some(center) => {
                trace.enter(SearchState::ResolvingNeighborhood);
                Some(self.resolve_neighborhood(center, request.radius_km()).await?)
            }
            None => None,
        };
        let locations = neighborhood.as_ref().map(|hood| hood.members.clone());

        trace.enter(SearchState::ComposingFilter);
        let resolved = Resolved {
            category_id: self.resolve_category(request.category_slug()).await?,
            region_id: self.resolve_region(request.region_code()).await?,
            neighborhood,
        };
        let predicate = self.composer.compose(request, &resolved);
        tracing::debug!(predicate = %predicate, "composed filter");

        trace.enter(SearchState::Querying);
        if predicate.is_unsatisfiable() {
            tracing::debug!("filter matches nothing; skipping record store");
            trace.enter(SearchState::Aggregating);
            trace.enter(SearchState::Ranking);
            return Ok(SearchResult::empty(request, locations));
        }

        // The store sorts by a refinement of `rank`'s order, so the requested
        // page can be cut out store-side.
        let query = BusinessQuery::new(predicate.clone())
            .order_by(STORE_ORDER)
            .offset(request.offset())
            .limit(u64::from(request.page_size))
            .include(Include::all());
        let (rows, count) = tokio::join!(
            self.bounded("business query", self.records.query_businesses(&query)),
            self.bounded("business count", self.records.count_businesses(&predicate)),
        );
        let rows = rows?;
        let total = match count {
            Ok(value) => TotalCount { value, exact: true },
            Err(err) => {
                tracing::warn!(error = %err, "count query failed; reporting page length as total");
                TotalCount {
                    value: rows.len() as u64,
                    exact: false,
                }
            }
        };

        trace.enter(SearchState::Aggregating);
        let rated: Vec<RankedBusiness> = rows
            .into_iter()
            .map(|business| RankedBusiness {
                rating: self.aggregator.summarize(&business),
                business,
            })
            .collect();

        trace.enter(SearchState::Ranking);
        let items = rank(rated);

        Ok(SearchResult {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
            locations,
        })
    }

    async fn resolve_neighborhood(
        &self,
        center: &str,
        radius_km: f64,
    ) -> Result<Neighborhood, SearchError> {
        let resolver = NeighborhoodResolver::new(self.directory.as_ref());
        self.bounded("neighborhood lookup", resolver.resolve(center, radius_km))
            .await
    }

    async fn resolve_category(&self, slug: Option<&str>) -> Result<Lookup<i64>, SearchError> {
        let Some(slug) = slug else {
            return Ok(Lookup::Absent);
        };
        let found = self
            .bounded("category lookup", self.directory.category_by_slug(slug))
            .await?;
        if found.is_none() {
            tracing::debug!(slug, "category not found");
        }
        Ok(Lookup::from_option(found.map(|c| c.id)))
    }

    async fn resolve_region(&self, code: Option<&str>) -> Result<Lookup<i64>, SearchError> {
        let Some(code) = code else {
            return Ok(Lookup::Absent);
        };
        let found = self
            .bounded("region lookup", self.directory.region_by_code(code))
            .await?;
        if found.is_none() {
            tracing::debug!(code, "region not found");
        }
        Ok(Lookup::from_option(found.map(|r| r.id)))
    }

    /// Apply the store timeout and tag failures with the operation name.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, SearchError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let timeout = self.options.store_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(SearchError::StoreUnavailable { operation, source }),
            Err(_) => Err(SearchError::StoreUnavailable {
                operation,
                source: StoreError::Timeout {
                    after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                },
            }),
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
