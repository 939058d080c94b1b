//! Directory entities as read by the search core.
//!
//! The core never writes these; they are owned by the record store and
//! maintained by administrative processes outside this workspace.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// A named place (usually a city) businesses are attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub population: Option<i64>,
    pub region_id: Option<i64>,
}

impl Location {
    /// Both coordinates, or `None` when either is missing.
    ///
    /// A location without coordinates only ever matches by exact name.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// Country or top-level administrative region, addressed by a short code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessStatus {
    Pending,
    Active,
    Suspended,
    Premium,
}

impl BusinessStatus {
    /// Statuses eligible to appear in search results.
    pub const LISTABLE: [BusinessStatus; 2] = [BusinessStatus::Active, BusinessStatus::Premium];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BusinessStatus::Pending => "pending",
            BusinessStatus::Active => "active",
            BusinessStatus::Suspended => "suspended",
            BusinessStatus::Premium => "premium",
        }
    }

    /// `premium` is the paid variant of `active` and is listed the same way.
    #[must_use]
    pub fn is_listable(self) -> bool {
        Self::LISTABLE.contains(&self)
    }
}

impl std::fmt::Display for BusinessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BusinessStatus::Pending),
            "active" => Ok(BusinessStatus::Active),
            "suspended" => Ok(BusinessStatus::Suspended),
            "premium" => Ok(BusinessStatus::Premium),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ModerationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "rejected" => Ok(ModerationStatus::Rejected),
            other => Err(CoreError::InvalidModerationStatus(other.to_string())),
        }
    }
}

/// A single review left on a business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEvent {
    pub rating: i16,
    pub content: Option<String>,
    /// `None` for rows written before moderation existed.
    pub moderation: Option<ModerationStatus>,
    pub created_at: DateTime<Utc>,
}

/// Boolean feature flags a search can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Verified,
    Premium,
    HasCoupons,
    AcceptsOnlineOrders,
    KidFriendly,
    Sponsored,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Verified,
        Attribute::Premium,
        Attribute::HasCoupons,
        Attribute::AcceptsOnlineOrders,
        Attribute::KidFriendly,
        Attribute::Sponsored,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Verified => "verified",
            Attribute::Premium => "premium",
            Attribute::HasCoupons => "has_coupons",
            Attribute::AcceptsOnlineOrders => "accepts_online_orders",
            Attribute::KidFriendly => "kid_friendly",
            Attribute::Sponsored => "sponsored",
        }
    }
}

/// A business listing with its related records eagerly embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    pub region_id: Option<i64>,
    pub category: Option<Category>,
    pub location: Option<Location>,
    pub region: Option<Region>,
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
    pub status: BusinessStatus,
    pub ratings: Vec<RatingEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessRecord {
    /// Whether the listing is in the paid placement tier.
    #[must_use]
    pub fn is_promoted(&self) -> bool {
        self.premium || self.sponsored
    }

    #[must_use]
    pub fn has(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Verified => self.verified,
            Attribute::Premium => self.premium,
            Attribute::HasCoupons => self.has_coupons,
            Attribute::AcceptsOnlineOrders => self.accepts_online_orders,
            Attribute::KidFriendly => self.kid_friendly,
            Attribute::Sponsored => self.sponsored,
        }
    }
}
