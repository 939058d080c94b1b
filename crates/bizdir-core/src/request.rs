//! Structured search input.

use serde::{Deserialize, Serialize};

use crate::model::Attribute;
use crate::CoreError;

/// Radius used to widen a location-scoped search when the caller gives none.
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Feature flags the caller requires. `false` means "don't care", never "must be false".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeFilters {
    pub verified: bool,
    pub premium: bool,
    pub has_coupons: bool,
    pub accepts_online_orders: bool,
    pub kid_friendly: bool,
    pub sponsored: bool,
}

impl AttributeFilters {
    /// Attributes requested as `true`, in a fixed order.
    #[must_use]
    pub fn required(&self) -> Vec<Attribute> {
        Attribute::ALL
            .into_iter()
            .filter(|attr| self.is_required(*attr))
            .collect()
    }

    #[must_use]
    pub fn is_required(&self, attribute: Attribute) -> bool {
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

/// One search call. Every optional field maps to exactly one filter rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub term: Option<String>,
    /// Human-readable category slug, resolved to an id before filtering.
    pub category: Option<String>,
    /// Location display name; the search widens to its neighborhood.
    pub location: Option<String>,
    /// Region (country) code.
    pub region: Option<String>,
    /// Neighborhood radius override in kilometres.
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub attributes: AttributeFilters,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            term: None,
            category: None,
            location: None,
            region: None,
            radius_km: None,
            attributes: AttributeFilters::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchRequest {
    /// Reject requests that cannot be served before touching any store.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRequest`] for a zero page, a page size of
    /// zero or above `max_page_size`, or a negative/non-finite radius.
    pub fn validate(&self, max_page_size: u32) -> Result<(), CoreError> {
        if self.page == 0 {
            return Err(CoreError::InvalidRequest(
                "page must be 1 or greater".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(CoreError::InvalidRequest(
                "page_size must be 1 or greater".to_string(),
            ));
        }
        if self.page_size > max_page_size {
            return Err(CoreError::InvalidRequest(format!(
                "page_size {} exceeds maximum of {max_page_size}",
                self.page_size
            )));
        }
        if let Some(radius) = self.radius_km {
            if !radius.is_finite() || radius < 0.0 {
                return Err(CoreError::InvalidRequest(format!(
                    "radius_km must be a non-negative number, got {radius}"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn radius_km(&self) -> f64 {
        self.radius_km.unwrap_or(DEFAULT_RADIUS_KM)
    }

    /// Zero-based index of the first row on the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// The location field with surrounding whitespace removed; blank counts as absent.
    #[must_use]
    pub fn location_name(&self) -> Option<&str> {
        non_blank(self.location.as_deref())
    }

    #[must_use]
    pub fn category_slug(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    #[must_use]
    pub fn region_code(&self) -> Option<&str> {
        non_blank(self.region.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
