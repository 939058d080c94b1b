//! Lookups against the `locations`, `categories` and `regions` tables.

use bizdir_core::{Category, Location, Region};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `locations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LocationRow {
    pub id: i64,
    pub name: String,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub population: Option<i64>,
    pub region_id: Option<i64>,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Location {
            id: row.id,
            name: row.name,
            latitude: row.latitude.and_then(|d| d.to_f64()),
            longitude: row.longitude.and_then(|d| d.to_f64()),
            population: row.population,
            region_id: row.region_id,
        }
    }
}

/// A row from the `categories` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            slug: row.slug,
            name: row.name,
        }
    }
}

/// A row from the `regions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegionRow {
    pub id: i64,
    pub code: String,
    pub name: String,
}

impl From<RegionRow> for Region {
    fn from(row: RegionRow) -> Self {
        Region {
            id: row.id,
            code: row.code,
            name: row.name,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the location with exactly this name, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_location_by_name(
    pool: &PgPool,
    name: &str,
) -> Result<Option<LocationRow>, DbError> {
    let row = sqlx::query_as::<_, LocationRow>(
        "SELECT id, name, latitude, longitude, population, region_id \
         FROM locations \
         WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns every location with both coordinates populated, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_located_locations(pool: &PgPool) -> Result<Vec<LocationRow>, DbError> {
    let rows = sqlx::query_as::<_, LocationRow>(
        "SELECT id, name, latitude, longitude, population, region_id \
         FROM locations \
         WHERE latitude IS NOT NULL AND longitude IS NOT NULL \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the category with this slug, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_category_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<CategoryRow>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, slug, name FROM categories WHERE slug = $1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the region with this code (case-insensitive), or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_region_by_code(pool: &PgPool, code: &str) -> Result<Option<RegionRow>, DbError> {
    let row = sqlx::query_as::<_, RegionRow>(
        "SELECT id, code, name FROM regions WHERE UPPER(code) = UPPER($1)",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn location_row_converts_decimal_coordinates() {
        let row = LocationRow {
            id: 1,
            name: "Kigali".to_string(),
            latitude: Some(Decimal::from_str("-1.944100").unwrap()),
            longitude: Some(Decimal::from_str("30.061900").unwrap()),
            population: Some(1_132_686),
            region_id: Some(1),
        };
        let (lat, lon) = Location::from(row).coordinates().expect("coordinates");
        assert!((lat + 1.9441).abs() < 1e-9);
        assert!((lon - 30.0619).abs() < 1e-9);
    }

    #[test]
    fn location_row_without_coordinates() {
        let row = LocationRow {
            id: 2,
            name: "Gisenyi".to_string(),
            latitude: None,
            longitude: None,
            population: None,
            region_id: None,
        };
        assert!(Location::from(row).coordinates().is_none());
    }
}
