//! Widen a location-scoped search to every location within a radius.

use std::collections::HashSet;

use crate::error::StoreError;
use crate::geo::distance_km;
use crate::store::Directory;

/// How the center location was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Center found with coordinates; members come from the radius scan.
    Proximity,
    /// Center found but has no coordinates; only the exact name matches.
    ExactName,
    /// No location with that name exists.
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood {
    pub center: String,
    pub radius_km: f64,
    /// Member location names, nearest first. Always contains `center`.
    pub members: Vec<String>,
    pub resolution: Resolution,
}

impl Neighborhood {
    fn singleton(center: &str, radius_km: f64, resolution: Resolution) -> Self {
        Self {
            center: center.to_string(),
            radius_km,
            members: vec![center.to_string()],
            resolution,
        }
    }

    #[must_use]
    pub fn names(&self) -> HashSet<String> {
        self.members.iter().cloned().collect()
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        self.resolution != Resolution::Unknown
    }
}

pub struct NeighborhoodResolver<'a> {
    directory: &'a dyn Directory,
}

impl<'a> NeighborhoodResolver<'a> {
    #[must_use]
    pub fn new(directory: &'a dyn Directory) -> Self {
        Self { directory }
    }

    /// Resolve the locations within `radius_km` of `center`.
    ///
    /// An unknown center, or one without coordinates, degrades to the
    /// singleton `{center}` rather than failing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory cannot be reached.
    pub async fn resolve(&self, center: &str, radius_km: f64) -> Result<Neighborhood, StoreError> {
        let Some(center_location) = self.directory.location_by_name(center).await? else {
            tracing::debug!(center, "neighborhood center not found");
            return Ok(Neighborhood::singleton(center, radius_km, Resolution::Unknown));
        };

        let Some((center_lat, center_lon)) = center_location.coordinates() else {
            tracing::debug!(center, "neighborhood center has no coordinates");
            return Ok(Neighborhood::singleton(
                center,
                radius_km,
                Resolution::ExactName,
            ));
        };

        let mut in_range: Vec<(f64, String)> = self
            .directory
            .located_locations()
            .await?
            .into_iter()
            .filter_map(|loc| {
                let (lat, lon) = loc.coordinates()?;
                let distance = distance_km(center_lat, center_lon, lat, lon);
                (distance <= radius_km).then_some((distance, loc.name))
            })
            .collect();
        in_range.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut seen = HashSet::new();
        let mut members: Vec<String> = in_range
            .into_iter()
            .map(|(_, name)| name)
            .filter(|name| seen.insert(name.clone()))
            .collect();

        // The center is always within range of itself, even if the located
        // listing is stale or missed it.
        if !seen.contains(center) {
            members.insert(0, center.to_string());
        }

        tracing::debug!(center, radius_km, members = members.len(), "resolved neighborhood");

        Ok(Neighborhood {
            center: center.to_string(),
            radius_km,
            members,
            resolution: Resolution::Proximity,
        })
    }

    /// The neighborhood as a plain set of location names.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory cannot be reached.
    pub async fn nearby_locations(
        &self,
        center: &str,
        radius_km: f64,
    ) -> Result<HashSet<String>, StoreError> {
        Ok(self.resolve(center, radius_km).await?.names())
    }
}

#[cfg(test)]
mod tests {
    use bizdir_core::Location;

    use super::*;
    use crate::memory::MemoryStore;

    fn location(id: i64, name: &str, coords: Option<(f64, f64)>) -> Location {
        Location {
            id,
            name: name.to_string(),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            population: None,
            region_id: None,
        }
    }

    fn rwanda() -> MemoryStore {
        MemoryStore::new()
            .with_location(location(1, "Kigali", Some((-1.9441, 30.0619))))
            .with_location(location(2, "Nyamata", Some((-2.1489, 30.0935))))
            .with_location(location(3, "Musanze", Some((-1.4998, 29.6344))))
            .with_location(location(4, "Huye", Some((-2.5967, 29.7394))))
            .with_location(location(5, "Gisenyi", None))
    }

    #[tokio::test]
    async fn includes_center_and_nearby_only() {
        let store = rwanda();
        let resolver = NeighborhoodResolver::new(&store);
        let names = resolver.nearby_locations("Kigali", 50.0).await.unwrap();
        let expected: HashSet<String> = ["Kigali", "Nyamata"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn every_member_is_within_radius() {
        let store = rwanda();
        let resolver = NeighborhoodResolver::new(&store);
        for radius in [0.0, 10.0, 50.0, 75.0, 200.0] {
            let hood = resolver.resolve("Kigali", radius).await.unwrap();
            assert!(hood.members.contains(&"Kigali".to_string()));
            for name in &hood.members {
                let loc = store.location(name).expect("member exists");
                let (lat, lon) = loc.coordinates().expect("member has coordinates");
                let d = distance_km(-1.9441, 30.0619, lat, lon);
                assert!(d <= radius + 1e-9, "{name} at {d}km exceeds {radius}km");
            }
        }
    }

    #[tokio::test]
    async fn members_are_nearest_first() {
        let store = rwanda();
        let resolver = NeighborhoodResolver::new(&store);
        let hood = resolver.resolve("Kigali", 500.0).await.unwrap();
        assert_eq!(hood.members.first().map(String::as_str), Some("Kigali"));
        assert_eq!(hood.members.len(), 4);
    }

    #[tokio::test]
    async fn center_without_coordinates_is_singleton() {
        let store = rwanda();
        let resolver = NeighborhoodResolver::new(&store);
        let hood = resolver.resolve("Gisenyi", 500.0).await.unwrap();
        assert_eq!(hood.members, vec!["Gisenyi".to_string()]);
        assert_eq!(hood.resolution, Resolution::ExactName);
    }

    #[tokio::test]
    async fn unknown_center_is_singleton() {
        let store = rwanda();
        let resolver = NeighborhoodResolver::new(&store);
        let hood = resolver.resolve("Atlantis", 50.0).await.unwrap();
        assert_eq!(hood.members, vec!["Atlantis".to_string()]);
        assert!(!hood.is_known());
    }

    #[tokio::test]
    async fn directory_failure_propagates() {
        let store = rwanda();
        store.fail_directory(true);
        let resolver = NeighborhoodResolver::new(&store);
        assert!(resolver.resolve("Kigali", 50.0).await.is_err());
    }
}
