//! YAML directory fixture: regions, locations, categories and listings used to
//! seed a database for local development and demos.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{BusinessStatus, ModerationStatus};
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub name: String,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub population: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    /// Defaults to [`slugify`] of the name.
    pub slug: Option<String>,
}

impl CategoryConfig {
    #[must_use]
    pub fn slug(&self) -> String {
        self.slug.clone().unwrap_or_else(|| slugify(&self.name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingConfig {
    pub rating: i16,
    pub content: Option<String>,
    pub moderation: Option<ModerationStatus>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessConfig {
    pub name: String,
    /// Category slug.
    pub category: Option<String>,
    /// Location name.
    pub location: Option<String>,
    /// Region code.
    pub region: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    #[serde(default = "default_status")]
    pub status: BusinessStatus,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub sponsored: bool,
    #[serde(default)]
    pub accepts_online_orders: bool,
    #[serde(default)]
    pub kid_friendly: bool,
    #[serde(default)]
    pub has_coupons: bool,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ratings: Vec<RatingConfig>,
}

impl BusinessConfig {
    /// Stable seed key: the slug of the name plus the location name.
    #[must_use]
    pub fn slug(&self) -> String {
        match &self.location {
            Some(location) => slugify(&format!("{} {location}", self.name)),
            None => slugify(&self.name),
        }
    }
}

fn default_status() -> BusinessStatus {
    BusinessStatus::Active
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryFile {
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub businesses: Vec<BusinessConfig>,
}

/// Generate a URL-safe slug from a display name.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' || c == '&' || c == '/' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Load and validate a directory fixture from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_directory(path: &Path) -> Result<DirectoryFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::DirectoryFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let directory: DirectoryFile =
        serde_yaml::from_str(&content).map_err(ConfigError::DirectoryFileParse)?;

    validate_directory(&directory)?;

    Ok(directory)
}

fn validate_directory(directory: &DirectoryFile) -> Result<(), ConfigError> {
    let mut region_codes = HashSet::new();
    for region in &directory.regions {
        if region.code.trim().is_empty() {
            return Err(ConfigError::Validation(
                "region code must be non-empty".to_string(),
            ));
        }
        if !region_codes.insert(region.code.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate region code: '{}'",
                region.code
            )));
        }
    }

    let mut location_names = HashSet::new();
    for location in &directory.locations {
        if location.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "location name must be non-empty".to_string(),
            ));
        }
        if !location_names.insert(location.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate location name: '{}'",
                location.name
            )));
        }
        check_reference(
            "location",
            &location.name,
            "region",
            location.region.as_deref(),
            &region_codes,
        )?;
        validate_coordinates(location)?;
    }

    let mut category_slugs = HashSet::new();
    for category in &directory.categories {
        let slug = category.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "category '{}' produces an empty slug",
                category.name
            )));
        }
        if !category_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category slug: '{slug}' (from category '{}')",
                category.name
            )));
        }
    }
    let category_slugs: HashSet<&str> = category_slugs.iter().map(String::as_str).collect();

    let mut business_slugs = HashSet::new();
    for business in &directory.businesses {
        if business.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "business name must be non-empty".to_string(),
            ));
        }
        let slug = business.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "business '{}' produces an empty slug",
                business.name
            )));
        }
        if !business_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate business '{}' in the same location (slug '{slug}')",
                business.name
            )));
        }
        check_reference(
            "business",
            &business.name,
            "category",
            business.category.as_deref(),
            &category_slugs,
        )?;
        check_reference(
            "business",
            &business.name,
            "location",
            business.location.as_deref(),
            &location_names,
        )?;
        check_reference(
            "business",
            &business.name,
            "region",
            business.region.as_deref(),
            &region_codes,
        )?;

        if let Some(bad) = business.ratings.iter().find(|r| !(1..=5).contains(&r.rating)) {
            return Err(ConfigError::Validation(format!(
                "business '{}' has rating {} outside 1-5",
                business.name, bad.rating
            )));
        }
    }

    Ok(())
}

fn check_reference(
    kind: &str,
    owner: &str,
    field: &str,
    value: Option<&str>,
    known: &HashSet<&str>,
) -> Result<(), ConfigError> {
    match value {
        Some(v) if !known.contains(v) => Err(ConfigError::Validation(format!(
            "{kind} '{owner}' references unknown {field} '{v}'"
        ))),
        _ => Ok(()),
    }
}

fn validate_coordinates(location: &LocationConfig) -> Result<(), ConfigError> {
    match (location.latitude, location.longitude) {
        (None, None) => Ok(()),
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(ConfigError::Validation(format!(
                    "location '{}' has out-of-range coordinates ({lat}, {lon})",
                    location.name
                )));
            }
            Ok(())
        }
        _ => Err(ConfigError::Validation(format!(
            "location '{}' must set both latitude and longitude or neither",
            location.name
        ))),
    }
}
