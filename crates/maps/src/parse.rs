//! Response decoding for the Geoapify GeoJSON payloads.
//!
//! Both endpoints answer with a `FeatureCollection`; only `properties` of
//! each feature is read.

use rideflow_core::routing::{PlaceSuggestion, RouteSummary};
use serde::Deserialize;

use crate::api::MapsApiError;

#[derive(Debug, Deserialize)]
struct FeatureCollection<P> {
    #[serde(default = "Vec::new")]
    features: Vec<Feature<P>>,
}

#[derive(Debug, Deserialize)]
struct Feature<P> {
    properties: P,
}

#[derive(Debug, Deserialize)]
struct RouteProperties {
    /// Meters.
    distance: f64,
    /// Seconds.
    time: f64,
}

#[derive(Debug, Deserialize)]
struct PlaceProperties {
    formatted: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Decode a `/routing` response into the first route's distance and time.
pub fn parse_route(body: &str) -> Result<RouteSummary, MapsApiError> {
    let collection: FeatureCollection<RouteProperties> =
        serde_json::from_str(body).map_err(|e| MapsApiError::Malformed(e.to_string()))?;

    let route = collection
        .features
        .into_iter()
        .next()
        .ok_or(MapsApiError::NoRoute)?
        .properties;

    if !route.distance.is_finite()
        || !route.time.is_finite()
        || route.distance < 0.0
        || route.time < 0.0
    {
        return Err(MapsApiError::Malformed(format!(
            "route has invalid distance {} or time {}",
            route.distance, route.time
        )));
    }

    Ok(RouteSummary {
        distance_meters: route.distance,
        duration_seconds: route.time,
    })
}

/// Decode a `/geocode/autocomplete` response.
///
/// Features missing a label or coordinates are skipped.
pub fn parse_suggestions(body: &str) -> Result<Vec<PlaceSuggestion>, MapsApiError> {
    let collection: FeatureCollection<PlaceProperties> =
        serde_json::from_str(body).map_err(|e| MapsApiError::Malformed(e.to_string()))?;

    Ok(collection
        .features
        .into_iter()
        .filter_map(|f| {
            let p = f.properties;
            Some(PlaceSuggestion {
                description: p.formatted?,
                lat: p.lat?,
                lng: p.lon?,
            })
        })
        .collect())
}
