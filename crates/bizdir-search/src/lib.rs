//! Proximity-aware business search: neighborhood resolution, filter
//! composition, rating aggregation and ranking over an external record store.

pub mod cache;
pub mod compose;
pub mod error;
pub mod geo;
pub mod memory;
pub mod neighborhood;
pub mod orchestrator;
pub mod predicate;
pub mod rank;
pub mod rating;
pub mod store;

pub use cache::CachedDirectory;
pub use compose::{sanitize_term, FilterComposer, Lookup, Resolved};
pub use error::{SearchError, StoreError};
pub use geo::distance_km;
pub use memory::MemoryStore;
pub use neighborhood::{Neighborhood, NeighborhoodResolver, Resolution};
pub use orchestrator::{
    RankedBusiness, SearchOptions, SearchOrchestrator, SearchResult, SearchRun, SearchState,
    TotalCount,
};
pub use predicate::{Clause, Field, Predicate, Value};
pub use rank::{paginate, rank, Rankable};
pub use rating::{RatingAggregator, RatingPolicy, RatingSummary};
pub use store::{BusinessQuery, Directory, Include, RecordStore, SortDirection, SortKey};
