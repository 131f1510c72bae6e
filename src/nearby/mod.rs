//! Proximity aggregation: turn a raw coordinate into a deduplicated,
//! distance-filtered, building-grouped set of nearby commercial tenants.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::geo;
use crate::models::{BuildingGroup, GeoPoint, NearbyBuildings, StoreInfo};
use crate::providers::{Geocoder, PlaceSearch};

/// A search item that survived conversion and the radius filter.
struct PlaceHit {
    name: String,
    category: String,
    address: String,
    location: GeoPoint,
}

pub struct NearbyService {
    geocoder: Arc<dyn Geocoder>,
    search: Arc<dyn PlaceSearch>,
    categories: Vec<String>,
    default_radius: f64,
    per_call_timeout: Duration,
    tag_pattern: Regex,
}

impl NearbyService {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        search: Arc<dyn PlaceSearch>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            geocoder,
            search,
            categories: config.categories.clone(),
            default_radius: config.radius_meter,
            per_call_timeout: config.per_call_timeout(),
            tag_pattern: Regex::new("<[^<]+?>").expect("valid tag pattern"),
        }
    }

    /// Find commercial buildings within `radius` meters of the position,
    /// grouped by resolved street address.
    ///
    /// One search per configured category runs concurrently; a category that
    /// fails or times out contributes zero results instead of failing the
    /// call. Only an unresolvable position is terminal.
    pub async fn find_nearby_buildings(
        &self,
        lat: f64,
        lon: f64,
        radius: Option<f64>,
    ) -> Result<NearbyBuildings> {
        let radius = radius.unwrap_or(self.default_radius);

        if !GeoPoint::new(lat, lon).is_valid() {
            return Err(Error::InvalidCoordinate { lat, lon });
        }

        let label = match self.geocoder.reverse_geocode(lat, lon).await {
            Ok(Some(label)) => label,
            Ok(None) => return Err(Error::LocationResolution { lat, lon }),
            Err(e) => {
                warn!("Reverse geocoding failed for ({}, {}): {}", lat, lon, e);
                return Err(Error::LocationResolution { lat, lon });
            }
        };
        debug!("Resolved ({}, {}) to '{}'", lat, lon, label);

        // Fan out one search per category and join on all of them; siblings
        // are never cancelled by one failure.
        let searches = self.categories.iter().map(|category| {
            let query = format!("{} {}", label, category);
            async move {
                match tokio::time::timeout(self.per_call_timeout, self.search.search(&query)).await
                {
                    Ok(Ok(items)) => items,
                    Ok(Err(e)) => {
                        warn!("Search '{}' failed: {}", query, e);
                        Vec::new()
                    }
                    Err(_) => {
                        warn!("Search '{}' timed out", query);
                        Vec::new()
                    }
                }
            }
        });
        let results = futures::future::join_all(searches).await;

        let mut hits = Vec::new();
        for item in results.into_iter().flatten() {
            let name = self.strip_markup(&item.title);

            let Some((place_lon, place_lat)) =
                geo::provider_scaled_to_geographic(Some(&item.map_x), Some(&item.map_y))
            else {
                warn!(
                    "Dropping '{}': unparsable map coordinates (mapx={}, mapy={})",
                    name, item.map_x, item.map_y
                );
                continue;
            };

            let distance = geo::haversine_distance_meters(lat, lon, place_lat, place_lon);
            if distance > radius {
                continue;
            }

            hits.push(PlaceHit {
                name,
                category: item.category.clone(),
                address: item.display_address().to_string(),
                location: GeoPoint::new(place_lat, place_lon),
            });
        }

        let buildings = group_by_address(hits);
        Ok(NearbyBuildings {
            count: buildings.len(),
            radius_meter: radius,
            buildings,
        })
    }

    fn strip_markup(&self, title: &str) -> String {
        self.tag_pattern.replace_all(title, "").into_owned()
    }
}

/// Group filtered hits by display address, preserving insertion order.
/// The first hit of a group seeds its location; later hits only append to
/// the store list.
fn group_by_address(hits: Vec<PlaceHit>) -> Vec<BuildingGroup> {
    let mut index: hashbrown::HashMap<String, usize> = hashbrown::HashMap::new();
    let mut groups: Vec<BuildingGroup> = Vec::new();

    for hit in hits {
        let slot = match index.get(&hit.address) {
            Some(&slot) => slot,
            None => {
                groups.push(BuildingGroup {
                    building_address: hit.address.clone(),
                    location: hit.location,
                    stores: Vec::new(),
                });
                index.insert(hit.address.clone(), groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].stores.push(StoreInfo {
            name: hit.name,
            category: hit.category,
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchItem;
    use async_trait::async_trait;

    struct FixedGeocoder(Option<String>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn reverse_geocode(&self, _lat: f64, _lon: f64) -> Result<Option<String>> {
            Ok(self.0.clone())
        }

        async fn forward_geocode(&self, _address: &str) -> Result<Option<(f64, f64)>> {
            Ok(None)
        }
    }

    struct FixedSearch(Vec<SearchItem>);

    #[async_trait]
    impl PlaceSearch for FixedSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchItem>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl PlaceSearch for FailingSearch {
        async fn search(&self, query: &str) -> Result<Vec<SearchItem>> {
            Err(Error::Provider(format!("boom: {}", query)))
        }
    }

    fn config_with_categories(categories: &[&str]) -> SearchConfig {
        SearchConfig {
            categories: categories.iter().map(|s| s.to_string()).collect(),
            ..SearchConfig::default()
        }
    }

    fn gangnam_item() -> SearchItem {
        SearchItem {
            title: "<b>세븐일레븐</b> 강남점".to_string(),
            category: "편의점".to_string(),
            road_address: "서울특별시 강남구 강남대로 390".to_string(),
            address: "서울특별시 강남구 역삼동 825".to_string(),
            map_x: "1270284390".to_string(),
            map_y: "374977110".to_string(),
        }
    }

    #[tokio::test]
    async fn test_gangnam_scenario() {
        let service = NearbyService::new(
            Arc::new(FixedGeocoder(Some("서울특별시 강남구 역삼동".to_string()))),
            Arc::new(FixedSearch(vec![gangnam_item()])),
            &config_with_categories(&["편의점"]),
        );

        let result = service
            .find_nearby_buildings(37.498095, 127.027610, Some(50.0))
            .await
            .unwrap();

        assert_eq!(result.count, 1);
        assert_eq!(result.radius_meter, 50.0);
        let building = &result.buildings[0];
        assert_eq!(building.building_address, "서울특별시 강남구 강남대로 390");
        assert_eq!(building.stores.len(), 1);
        assert_eq!(building.stores[0].name, "세븐일레븐 강남점");
    }

    #[tokio::test]
    async fn test_unresolvable_location_is_terminal() {
        let service = NearbyService::new(
            Arc::new(FixedGeocoder(None)),
            Arc::new(FixedSearch(vec![gangnam_item()])),
            &config_with_categories(&["편의점"]),
        );

        let err = service
            .find_nearby_buildings(37.498095, 127.027610, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LocationResolution { .. }));
    }

    #[tokio::test]
    async fn test_sentinel_point_rejected() {
        let service = NearbyService::new(
            Arc::new(FixedGeocoder(Some("somewhere".to_string()))),
            Arc::new(FixedSearch(Vec::new())),
            &config_with_categories(&["편의점"]),
        );

        let err = service.find_nearby_buildings(-1.0, -1.0, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidCoordinate { .. }));
    }

    #[tokio::test]
    async fn test_zero_categories_yields_empty_result() {
        let service = NearbyService::new(
            Arc::new(FixedGeocoder(Some("서울특별시 강남구 역삼동".to_string()))),
            Arc::new(FixedSearch(vec![gangnam_item()])),
            &config_with_categories(&[]),
        );

        let result = service
            .find_nearby_buildings(37.498095, 127.027610, None)
            .await
            .unwrap();
        assert_eq!(result.count, 0);
        assert!(result.buildings.is_empty());
        assert_eq!(result.radius_meter, 50.0);
    }

    #[tokio::test]
    async fn test_failed_search_degrades_to_empty() {
        let service = NearbyService::new(
            Arc::new(FixedGeocoder(Some("서울특별시 강남구 역삼동".to_string()))),
            Arc::new(FailingSearch),
            &config_with_categories(&["편의점", "카페"]),
        );

        let result = service
            .find_nearby_buildings(37.498095, 127.027610, None)
            .await
            .unwrap();
        assert_eq!(result.count, 0);
    }

    #[tokio::test]
    async fn test_out_of_radius_item_dropped() {
        // Seoul City Hall is ~8.5 km from the query point
        let far_item = SearchItem {
            map_x: "1269780000".to_string(),
            map_y: "375665000".to_string(),
            ..gangnam_item()
        };
        let service = NearbyService::new(
            Arc::new(FixedGeocoder(Some("서울특별시 강남구 역삼동".to_string()))),
            Arc::new(FixedSearch(vec![far_item])),
            &config_with_categories(&["편의점"]),
        );

        let result = service
            .find_nearby_buildings(37.498095, 127.027610, Some(50.0))
            .await
            .unwrap();
        assert_eq!(result.count, 0);
    }

    #[tokio::test]
    async fn test_unparsable_coordinates_dropped_not_fatal() {
        let bad_item = SearchItem {
            map_x: "not-a-number".to_string(),
            ..gangnam_item()
        };
        let service = NearbyService::new(
            Arc::new(FixedGeocoder(Some("서울특별시 강남구 역삼동".to_string()))),
            Arc::new(FixedSearch(vec![bad_item, gangnam_item()])),
            &config_with_categories(&["편의점"]),
        );

        let result = service
            .find_nearby_buildings(37.498095, 127.027610, None)
            .await
            .unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.buildings[0].stores.len(), 1);
    }

    #[test]
    fn test_grouping_accumulates_by_address_in_order() {
        let hits = vec![
            PlaceHit {
                name: "세븐일레븐".to_string(),
                category: "편의점".to_string(),
                address: "강남대로 390".to_string(),
                location: GeoPoint::new(37.4977, 127.0284),
            },
            PlaceHit {
                name: "별다방".to_string(),
                category: "카페".to_string(),
                address: "테헤란로 1".to_string(),
                location: GeoPoint::new(37.4980, 127.0280),
            },
            PlaceHit {
                name: "알파약국".to_string(),
                category: "약국".to_string(),
                address: "강남대로 390".to_string(),
                location: GeoPoint::new(37.4999, 127.0299),
            },
        ];

        let groups = group_by_address(hits);
        assert_eq!(groups.len(), 2);

        // First-seen order, first hit seeds the location
        assert_eq!(groups[0].building_address, "강남대로 390");
        assert_eq!(groups[0].location, GeoPoint::new(37.4977, 127.0284));
        assert_eq!(groups[0].stores.len(), 2);
        assert_eq!(groups[0].stores[0].name, "세븐일레븐");
        assert_eq!(groups[0].stores[1].name, "알파약국");

        assert_eq!(groups[1].building_address, "테헤란로 1");
        assert_eq!(groups[1].stores.len(), 1);
    }
}
