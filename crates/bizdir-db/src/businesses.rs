//! Eager-loaded reads of the `businesses` table.
//!
//! One statement returns each business joined to its category, location and
//! region, with rating events aggregated into a JSON array, so a search
//! never issues per-row follow-up lookups.

use bizdir_core::{
    BusinessRecord, BusinessStatus, Category, Location, ModerationStatus, RatingEvent, Region,
};
use bizdir_search::{BusinessQuery, Include, Predicate};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::filter::{push_order_by, push_where};
use crate::DbError;

const BUSINESS_COLUMNS: &str = "SELECT b.id, b.public_id, b.name, b.description, \
        b.category_id, b.location_id, b.region_id, \
        b.address, b.phone, b.email, b.website, \
        b.verified, b.premium, b.sponsored, b.accepts_online_orders, b.kid_friendly, \
        b.has_coupons, b.view_count, b.click_count, b.status, b.created_at, b.updated_at, \
        c.slug AS category_slug, c.name AS category_name, \
        l.name AS location_name, l.latitude AS location_latitude, \
        l.longitude AS location_longitude, l.population AS location_population, \
        l.region_id AS location_region_id, \
        r.code AS region_code, r.name AS region_name, ";

const RATINGS_SUBQUERY: &str = "COALESCE((\
        SELECT json_agg(json_build_object(\
            'rating', e.rating, 'content', e.content, \
            'moderation', e.moderation, 'created_at', e.created_at) \
            ORDER BY e.created_at, e.id) \
        FROM rating_events e WHERE e.business_id = b.id), '[]'::json) AS ratings";

const NO_RATINGS: &str = "'[]'::json AS ratings";

const BUSINESS_JOINS: &str = " FROM businesses b \
        LEFT JOIN categories c ON c.id = b.category_id \
        LEFT JOIN locations l ON l.id = b.location_id \
        LEFT JOIN regions r ON r.id = b.region_id";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// One rating event as aggregated by [`RATINGS_SUBQUERY`].
#[derive(Debug, Clone, Deserialize)]
pub struct RatingJson {
    pub rating: i16,
    pub content: Option<String>,
    pub moderation: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A `businesses` row with its joined reference columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusinessRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    pub region_id: Option<i64>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub verified: bool,
    pub premium: bool,
    pub sponsored: bool,
    pub accepts_online_orders: bool,
    pub kid_friendly: bool,
    pub has_coupons: bool,
    pub view_count: i64,
    pub click_count: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_slug: Option<String>,
    pub category_name: Option<String>,
    pub location_name: Option<String>,
    pub location_latitude: Option<Decimal>,
    pub location_longitude: Option<Decimal>,
    pub location_population: Option<i64>,
    pub location_region_id: Option<i64>,
    pub region_code: Option<String>,
    pub region_name: Option<String>,
    pub ratings: Json<Vec<RatingJson>>,
}

impl BusinessRow {
    /// Build the domain record, embedding only what `include` asks for.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] when `status` or a rating's moderation
    /// value is outside the known set.
    pub fn into_record(self, include: Include) -> Result<BusinessRecord, DbError> {
        let id = self.id;
        let status: BusinessStatus = self.status.parse().map_err(|e: bizdir_core::CoreError| {
            DbError::InvalidRow {
                id,
                column: "status",
                reason: e.to_string(),
            }
        })?;

        let category = match (include.category, self.category_id, self.category_slug) {
            (true, Some(cid), Some(slug)) => Some(Category {
                id: cid,
                slug,
                name: self.category_name.unwrap_or_default(),
            }),
            _ => None,
        };
        let location = match (include.location, self.location_id, self.location_name) {
            (true, Some(lid), Some(name)) => Some(Location {
                id: lid,
                name,
                latitude: self.location_latitude.and_then(|d| d.to_f64()),
                longitude: self.location_longitude.and_then(|d| d.to_f64()),
                population: self.location_population,
                region_id: self.location_region_id,
            }),
            _ => None,
        };
        let region = match (include.region, self.region_id, self.region_code) {
            (true, Some(rid), Some(code)) => Some(Region {
                id: rid,
                code,
                name: self.region_name.unwrap_or_default(),
            }),
            _ => None,
        };

        let ratings = if include.ratings {
            self.ratings
                .0
                .into_iter()
                .map(|event| rating_event(id, event))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        Ok(BusinessRecord {
            id,
            public_id: self.public_id,
            name: self.name,
            description: self.description,
            category_id: self.category_id,
            location_id: self.location_id,
            region_id: self.region_id,
            category,
            location,
            region,
            address: self.address,
            phone: self.phone,
            email: self.email,
            website: self.website,
            verified: self.verified,
            premium: self.premium,
            sponsored: self.sponsored,
            accepts_online_orders: self.accepts_online_orders,
            kid_friendly: self.kid_friendly,
            has_coupons: self.has_coupons,
            view_count: self.view_count,
            click_count: self.click_count,
            status,
            ratings,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn rating_event(business_id: i64, event: RatingJson) -> Result<RatingEvent, DbError> {
    let moderation = event
        .moderation
        .map(|m| {
            m.parse::<ModerationStatus>()
                .map_err(|e| DbError::InvalidRow {
                    id: business_id,
                    column: "rating_events.moderation",
                    reason: e.to_string(),
                })
        })
        .transpose()?;
    Ok(RatingEvent {
        rating: event.rating,
        content: event.content,
        moderation,
        created_at: event.created_at,
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Build the eager-loaded business statement for `query`.
#[must_use]
pub fn business_query_sql(query: &BusinessQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(BUSINESS_COLUMNS);
    qb.push(if query.include.ratings {
        RATINGS_SUBQUERY
    } else {
        NO_RATINGS
    });
    qb.push(BUSINESS_JOINS);
    push_where(&mut qb, &query.predicate);
    push_order_by(&mut qb, &query.order_by);
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    if query.offset > 0 {
        qb.push(" OFFSET ")
            .push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));
    }
    qb
}

/// Run a filtered, sorted, windowed business read.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a row carries an unknown status.
pub async fn query_businesses(
    pool: &PgPool,
    query: &BusinessQuery,
) -> Result<Vec<BusinessRecord>, DbError> {
    let mut qb = business_query_sql(query);
    tracing::debug!(sql = qb.sql(), "querying businesses");
    let rows = qb.build_query_as::<BusinessRow>().fetch_all(pool).await?;

    rows.into_iter()
        .map(|row| row.into_record(query.include))
        .collect()
}

/// Count businesses matching `predicate`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_businesses(pool: &PgPool, predicate: &Predicate) -> Result<u64, DbError> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM businesses b LEFT JOIN locations l ON l.id = b.location_id",
    );
    push_where(&mut qb, predicate);
    let count: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(u64::try_from(count).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use bizdir_search::{Clause, Field, SortDirection, SortKey, Value};

    use super::*;

    fn row() -> BusinessRow {
        BusinessRow {
            id: 9,
            public_id: Uuid::new_v4(),
            name: "Bourbon Cafe".to_string(),
            description: None,
            category_id: Some(1),
            location_id: Some(2),
            region_id: Some(3),
            address: None,
            phone: None,
            email: None,
            website: None,
            verified: true,
            premium: true,
            sponsored: false,
            accepts_online_orders: false,
            kid_friendly: false,
            has_coupons: false,
            view_count: 0,
            click_count: 0,
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            category_slug: Some("cafes".to_string()),
            category_name: Some("Cafes".to_string()),
            location_name: Some("Kigali".to_string()),
            location_latitude: None,
            location_longitude: None,
            location_population: None,
            location_region_id: Some(3),
            region_code: Some("RW".to_string()),
            region_name: Some("Rwanda".to_string()),
            ratings: Json(vec![RatingJson {
                rating: 5,
                content: Some("Great espresso".to_string()),
                moderation: Some("approved".to_string()),
                created_at: Utc::now(),
            }]),
        }
    }

    #[test]
    fn row_embeds_everything_by_default() {
        let record = row().into_record(Include::all()).unwrap();
        assert_eq!(record.category.map(|c| c.slug), Some("cafes".to_string()));
        assert_eq!(record.location.map(|l| l.name), Some("Kigali".to_string()));
        assert_eq!(record.region.map(|r| r.code), Some("RW".to_string()));
        assert_eq!(record.ratings.len(), 1);
        assert_eq!(record.ratings[0].moderation, Some(ModerationStatus::Approved));
    }

    #[test]
    fn row_respects_include() {
        let record = row().into_record(Include::none()).unwrap();
        assert!(record.category.is_none());
        assert!(record.location.is_none());
        assert!(record.ratings.is_empty());
        assert_eq!(record.location_id, Some(2));
    }

    #[test]
    fn unknown_status_is_invalid_row() {
        let mut bad = row();
        bad.status = "archived".to_string();
        let err = bad.into_record(Include::all()).unwrap_err();
        assert!(matches!(err, DbError::InvalidRow { id: 9, column: "status", .. }));
    }

    #[test]
    fn rating_json_parses_postgres_timestamps() {
        let json = r#"[{"rating": 4, "content": null, "moderation": null,
                        "created_at": "2025-03-01T09:00:00.123456+00:00"}]"#;
        let events: Vec<RatingJson> = serde_json::from_str(json).unwrap();
        assert_eq!(events[0].rating, 4);
        assert!(events[0].moderation.is_none());
    }

    #[test]
    fn query_sql_with_window_and_ratings() {
        let query = BusinessQuery::new(
            Predicate::all().and(Clause::Eq(Field::LocationName, Value::Text("Kigali".into()))),
        )
        .order_by([SortKey::CreatedAt(SortDirection::Desc)])
        .limit(20)
        .offset(5);
        let qb = business_query_sql(&query);
        let sql = qb.sql();
        assert!(sql.contains("json_agg"));
        assert!(sql.contains("LEFT JOIN locations l ON l.id = b.location_id"));
        assert!(sql.ends_with("WHERE l.name = $1 ORDER BY b.created_at DESC LIMIT $2 OFFSET $3"));
    }

    #[test]
    fn query_sql_without_ratings_skips_subquery() {
        let query = BusinessQuery::new(Predicate::all()).include(Include::none());
        let qb = business_query_sql(&query);
        assert!(!qb.sql().contains("json_agg"));
        assert!(qb.sql().ends_with("WHERE TRUE"));
    }
}
