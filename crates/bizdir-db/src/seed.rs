use std::collections::HashMap;

use bizdir_core::directory::{BusinessConfig, LocationConfig};
use bizdir_core::{DirectoryFile, ModerationStatus};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::DbError;

/// Rows written by [`seed_directory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub regions: usize,
    pub locations: usize,
    pub categories: usize,
    pub businesses: usize,
    pub ratings: usize,
}

/// Upsert a directory fixture: regions, locations, categories, businesses
/// and their rating events.
///
/// All upserts run inside a single transaction; if any operation fails the
/// entire batch is rolled back. Re-seeding replaces each seeded business's
/// rating events and leaves rows absent from the fixture untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_directory(pool: &PgPool, file: &DirectoryFile) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    let mut region_ids: HashMap<&str, i64> = HashMap::new();
    for region in &file.regions {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO regions (code, name) VALUES ($1, $2) \
             ON CONFLICT (code) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(&region.code)
        .bind(&region.name)
        .fetch_one(&mut *tx)
        .await?;
        region_ids.insert(region.code.as_str(), id);
        summary.regions += 1;
    }

    let mut location_ids: HashMap<&str, (i64, Option<i64>)> = HashMap::new();
    for location in &file.locations {
        let region_id = location
            .region
            .as_deref()
            .and_then(|code| region_ids.get(code).copied());
        let id = upsert_location(&mut tx, location, region_id).await?;
        location_ids.insert(location.name.as_str(), (id, region_id));
        summary.locations += 1;
    }

    let mut category_ids: HashMap<String, i64> = HashMap::new();
    for category in &file.categories {
        let slug = category.slug();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO categories (slug, name) VALUES ($1, $2) \
             ON CONFLICT (slug) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(&slug)
        .bind(&category.name)
        .fetch_one(&mut *tx)
        .await?;
        category_ids.insert(slug, id);
        summary.categories += 1;
    }

    for business in &file.businesses {
        let category_id = business
            .category
            .as_deref()
            .and_then(|slug| category_ids.get(slug).copied());
        let location = business
            .location
            .as_deref()
            .and_then(|name| location_ids.get(name).copied());
        // An explicit region wins; otherwise inherit the location's region.
        let region_id = business
            .region
            .as_deref()
            .and_then(|code| region_ids.get(code).copied())
            .or_else(|| location.and_then(|(_, region)| region));

        let ids = BusinessIds {
            category_id,
            location_id: location.map(|(id, _)| id),
            region_id,
        };
        let business_id = upsert_business(&mut tx, business, ids).await?;
        summary.ratings += replace_ratings(&mut tx, business_id, business).await?;
        summary.businesses += 1;
    }

    tx.commit().await?;
    tracing::info!(
        regions = summary.regions,
        locations = summary.locations,
        categories = summary.categories,
        businesses = summary.businesses,
        ratings = summary.ratings,
        "directory seeded"
    );
    Ok(summary)
}

fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value
        .and_then(Decimal::from_f64_retain)
        .map(|d| d.round_dp(6))
}

async fn upsert_location(
    tx: &mut Transaction<'_, Postgres>,
    location: &LocationConfig,
    region_id: Option<i64>,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO locations (name, latitude, longitude, population, region_id) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (name) DO UPDATE SET \
             latitude = EXCLUDED.latitude, \
             longitude = EXCLUDED.longitude, \
             population = EXCLUDED.population, \
             region_id = EXCLUDED.region_id, \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(&location.name)
    .bind(to_decimal(location.latitude))
    .bind(to_decimal(location.longitude))
    .bind(location.population)
    .bind(region_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

#[derive(Debug, Clone, Copy)]
struct BusinessIds {
    category_id: Option<i64>,
    location_id: Option<i64>,
    region_id: Option<i64>,
}

async fn upsert_business(
    tx: &mut Transaction<'_, Postgres>,
    business: &BusinessConfig,
    ids: BusinessIds,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO businesses (slug, name, description, category_id, location_id, region_id, \
             address, phone, email, website, verified, premium, sponsored, \
             accepts_online_orders, kid_friendly, has_coupons, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
             COALESCE($18, NOW())) \
         ON CONFLICT (slug) DO UPDATE SET \
             name = EXCLUDED.name, \
             description = EXCLUDED.description, \
             category_id = EXCLUDED.category_id, \
             location_id = EXCLUDED.location_id, \
             region_id = EXCLUDED.region_id, \
             address = EXCLUDED.address, \
             phone = EXCLUDED.phone, \
             email = EXCLUDED.email, \
             website = EXCLUDED.website, \
             verified = EXCLUDED.verified, \
             premium = EXCLUDED.premium, \
             sponsored = EXCLUDED.sponsored, \
             accepts_online_orders = EXCLUDED.accepts_online_orders, \
             kid_friendly = EXCLUDED.kid_friendly, \
             has_coupons = EXCLUDED.has_coupons, \
             status = EXCLUDED.status, \
             created_at = COALESCE($18, businesses.created_at), \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(business.slug())
    .bind(&business.name)
    .bind(&business.description)
    .bind(ids.category_id)
    .bind(ids.location_id)
    .bind(ids.region_id)
    .bind(&business.address)
    .bind(&business.phone)
    .bind(&business.email)
    .bind(&business.website)
    .bind(business.verified)
    .bind(business.premium)
    .bind(business.sponsored)
    .bind(business.accepts_online_orders)
    .bind(business.kid_friendly)
    .bind(business.has_coupons)
    .bind(business.status.as_str())
    .bind(business.created_at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

async fn replace_ratings(
    tx: &mut Transaction<'_, Postgres>,
    business_id: i64,
    business: &BusinessConfig,
) -> Result<usize, DbError> {
    sqlx::query("DELETE FROM rating_events WHERE business_id = $1")
        .bind(business_id)
        .execute(&mut **tx)
        .await?;

    for rating in &business.ratings {
        sqlx::query(
            "INSERT INTO rating_events (business_id, rating, content, moderation, created_at) \
             VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))",
        )
        .bind(business_id)
        .bind(rating.rating)
        .bind(&rating.content)
        .bind(rating.moderation.map(ModerationStatus::as_str))
        .bind(rating.created_at)
        .execute(&mut **tx)
        .await?;
    }

    Ok(business.ratings.len())
}
