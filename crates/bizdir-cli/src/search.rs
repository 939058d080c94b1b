//! `search` command: run one search and print the ranked page.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bizdir_core::{AppConfig, AttributeFilters, SearchRequest, DEFAULT_PAGE_SIZE};
use bizdir_search::{SearchOptions, SearchOrchestrator, SearchResult};
use clap::Args;

#[derive(Debug, Args)]
pub(crate) struct SearchArgs {
    /// Free-text term matched against name, description, address and website
    pub term: Option<String>,
    /// Category slug (e.g. cafes)
    #[arg(long)]
    pub category: Option<String>,
    /// Location name; results widen to nearby locations
    #[arg(long)]
    pub location: Option<String>,
    /// Region code (e.g. RW)
    #[arg(long)]
    pub region: Option<String>,
    /// Neighborhood radius in kilometres
    #[arg(long)]
    pub radius_km: Option<f64>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,
    #[arg(long)]
    pub verified: bool,
    #[arg(long)]
    pub premium: bool,
    #[arg(long)]
    pub has_coupons: bool,
    #[arg(long)]
    pub online_orders: bool,
    #[arg(long)]
    pub kid_friendly: bool,
    #[arg(long)]
    pub sponsored: bool,
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
    /// Search a directory fixture in memory instead of the database
    #[arg(long)]
    pub fixture: Option<PathBuf>,
}

impl SearchArgs {
    pub(crate) fn to_request(&self) -> SearchRequest {
        SearchRequest {
            term: self.term.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            region: self.region.clone(),
            radius_km: self.radius_km,
            attributes: AttributeFilters {
                verified: self.verified,
                premium: self.premium,
                has_coupons: self.has_coupons,
                accepts_online_orders: self.online_orders,
                kid_friendly: self.kid_friendly,
                sponsored: self.sponsored,
            },
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Search the configured database.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the search fails.
pub(crate) async fn run_search(config: &AppConfig, args: &SearchArgs) -> anyhow::Result<()> {
    let pool_config = bizdir_db::PoolConfig::from_app_config(config);
    let pool = bizdir_db::connect_pool(&config.database_url, pool_config).await?;
    let store = Arc::new(bizdir_db::PgStore::new(pool));

    let search = SearchOrchestrator::new(store.clone(), store, SearchOptions::from_config(config));
    execute(&search, args).await
}

/// Search a fixture file loaded into memory.
///
/// # Errors
///
/// Returns an error if the fixture fails to load or the search fails.
pub(crate) async fn run_fixture_search(path: &Path, args: &SearchArgs) -> anyhow::Result<()> {
    let file = bizdir_core::load_directory(path)?;
    let store = Arc::new(crate::offline::memory_store(&file, chrono::Utc::now()));

    let search = SearchOrchestrator::new(store.clone(), store, SearchOptions::default());
    execute(&search, args).await
}

pub(crate) async fn execute(search: &SearchOrchestrator, args: &SearchArgs) -> anyhow::Result<()> {
    let request = args.to_request();
    let result = search.search(&request).await.inspect_err(|e| {
        tracing::warn!(
            term = ?request.term,
            location = ?request.location,
            page = request.page,
            error = %e,
            "search failed"
        );
    })?;
    tracing::debug!(
        items = result.items.len(),
        total = result.total.value,
        exact = result.total.exact,
        "search completed"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render(&result));
    }
    Ok(())
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() > width {
        format!("{}...", value.chars().take(width - 3).collect::<String>())
    } else {
        value.to_string()
    }
}

/// Plain-text table of one result page.
pub(crate) fn render(result: &SearchResult) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    if let Some(locations) = &result.locations {
        let _ = writeln!(out, "near: {}", locations.join(", "));
    }

    if result.items.is_empty() {
        out.push_str("no matching businesses\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<4}{:<32}{:<16}{:<12}{:<9}RATING",
        "#", "NAME", "LOCATION", "CATEGORY", "PROMO"
    );
    let first = u64::from(result.page.saturating_sub(1)) * u64::from(result.page_size);
    for (rank, item) in (first + 1..).zip(&result.items) {
        let business = &item.business;
        let location = business.location.as_ref().map_or("-", |l| l.name.as_str());
        let category = business.category.as_ref().map_or("-", |c| c.slug.as_str());
        let promo = if business.is_promoted() { "yes" } else { "" };
        let rating = if item.rating.count == 0 {
            "-".to_string()
        } else {
            format!("{:.1} ({})", item.rating.rounded_average(), item.rating.count)
        };
        let _ = writeln!(
            out,
            "{:<4}{:<32}{:<16}{:<12}{:<9}{}",
            rank,
            truncate(&business.name, 30),
            truncate(location, 14),
            truncate(category, 10),
            promo,
            rating
        );
    }

    let qualifier = if result.total.exact { "" } else { "at least " };
    let _ = writeln!(
        out,
        "page {} ({} per page), {qualifier}{} total",
        result.page, result.page_size, result.total.value
    );
    out
}
