//! In-memory copy of a directory fixture, for searching without a database.

use std::collections::HashMap;

use bizdir_core::{BusinessRecord, Category, DirectoryFile, Location, RatingEvent, Region};
use bizdir_search::MemoryStore;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Load every fixture row into a [`MemoryStore`], assigning ids in file order.
///
/// Mirrors what `db seed` writes: a business without an explicit region
/// inherits its location's region, and a missing `created_at` is `now`.
pub(crate) fn memory_store(file: &DirectoryFile, now: DateTime<Utc>) -> MemoryStore {
    let mut store = MemoryStore::new();

    let mut region_ids: HashMap<&str, i64> = HashMap::new();
    for (id, region) in (1..).zip(&file.regions) {
        region_ids.insert(region.code.as_str(), id);
        store = store.with_region(Region {
            id,
            code: region.code.clone(),
            name: region.name.clone(),
        });
    }

    let mut location_ids: HashMap<&str, (i64, Option<i64>)> = HashMap::new();
    for (id, location) in (1..).zip(&file.locations) {
        let region_id = location
            .region
            .as_deref()
            .and_then(|code| region_ids.get(code).copied());
        location_ids.insert(location.name.as_str(), (id, region_id));
        store = store.with_location(Location {
            id,
            name: location.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            population: location.population,
            region_id,
        });
    }

    let mut category_ids: HashMap<String, i64> = HashMap::new();
    for (id, category) in (1..).zip(&file.categories) {
        let slug = category.slug();
        category_ids.insert(slug.clone(), id);
        store = store.with_category(Category {
            id,
            slug,
            name: category.name.clone(),
        });
    }

    for (id, business) in (1..).zip(&file.businesses) {
        let location = business
            .location
            .as_deref()
            .and_then(|name| location_ids.get(name).copied());
        let region_id = business
            .region
            .as_deref()
            .and_then(|code| region_ids.get(code).copied())
            .or_else(|| location.and_then(|(_, region)| region));
        let created_at = business.created_at.unwrap_or(now);

        store = store.with_business(BusinessRecord {
            id,
            public_id: Uuid::new_v4(),
            name: business.name.clone(),
            description: business.description.clone(),
            category_id: business
                .category
                .as_deref()
                .and_then(|slug| category_ids.get(slug).copied()),
            location_id: location.map(|(id, _)| id),
            region_id,
            category: None,
            location: None,
            region: None,
            address: business.address.clone(),
            phone: business.phone.clone(),
            email: business.email.clone(),
            website: business.website.clone(),
            verified: business.verified,
            premium: business.premium,
            sponsored: business.sponsored,
            accepts_online_orders: business.accepts_online_orders,
            kid_friendly: business.kid_friendly,
            has_coupons: business.has_coupons,
            view_count: 0,
            click_count: 0,
            status: business.status,
            ratings: business
                .ratings
                .iter()
                .map(|r| RatingEvent {
                    rating: r.rating,
                    content: r.content.clone(),
                    moderation: r.moderation,
                    created_at: r.created_at.unwrap_or(now),
                })
                .collect(),
            created_at,
            updated_at: created_at,
        });
    }

    store
}
