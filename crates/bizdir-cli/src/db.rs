//! `db` command handlers.

use std::path::Path;

use bizdir_core::AppConfig;

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = bizdir_db::PoolConfig::from_app_config(config);
    let pool = bizdir_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

pub(crate) async fn run_ping(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    bizdir_db::ping(&pool).await?;
    tracing::debug!(env = %config.env, "database ping succeeded");
    println!("database reachable ({})", config.env);
    Ok(())
}

pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let applied = bizdir_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations applied");
    println!("migrations up to date ({applied} applied)");
    Ok(())
}

/// Seed the database from a directory fixture.
///
/// Migrations are applied first so a fresh database can be seeded in one step.
///
/// # Errors
///
/// Returns an error if the fixture fails to load or validate, or if any
/// database operation fails. A failed seed leaves the database unchanged.
pub(crate) async fn run_seed(config: &AppConfig, path: Option<&Path>) -> anyhow::Result<()> {
    let path = path.unwrap_or(&config.directory_path);
    let file = bizdir_core::load_directory(path)?;

    let pool = connect(config).await?;
    bizdir_db::run_migrations(&pool).await?;
    let summary = bizdir_db::seed_directory(&pool, &file).await?;
    tracing::info!(
        path = %path.display(),
        regions = summary.regions,
        locations = summary.locations,
        categories = summary.categories,
        businesses = summary.businesses,
        ratings = summary.ratings,
        "directory seeded"
    );

    println!(
        "seeded {} regions, {} locations, {} categories, {} businesses, {} ratings from {}",
        summary.regions,
        summary.locations,
        summary.categories,
        summary.businesses,
        summary.ratings,
        path.display()
    );
    Ok(())
}
