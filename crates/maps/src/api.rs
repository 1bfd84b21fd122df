//! HTTP client for the Geoapify routing and autocomplete endpoints.

use std::time::Duration;

use async_trait::async_trait;
use rideflow_core::error::CoreError;
use rideflow_core::geo::Coordinates;
use rideflow_core::routing::{
    validate_query, GeocodeProvider, PlaceSuggestion, RouteProvider, RouteSummary,
};

use crate::parse::{parse_route, parse_suggestions};

/// Public Geoapify API root.
pub const DEFAULT_BASE_URL: &str = "https://api.geoapify.com/v1";

/// Errors from the Geoapify client layer.
#[derive(Debug, thiserror::Error)]
pub enum MapsApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Geoapify returned a non-2xx status code.
    #[error("Geoapify API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// The body did not have the expected shape.
    #[error("Malformed Geoapify response: {0}")]
    Malformed(String),

    #[error("No route found")]
    NoRoute,
}

impl From<MapsApiError> for CoreError {
    fn from(err: MapsApiError) -> Self {
        CoreError::Upstream(err.to_string())
    }
}

/// Geoapify client. Every request is bounded by the timeout given at
/// construction.
pub struct GeoapifyClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeoapifyClient {
    /// * `base_url` - API root without trailing slash, e.g.
    ///   [`DEFAULT_BASE_URL`].
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MapsApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Driving route between two points.
    ///
    /// `GET /routing?waypoints=lat,lng|lat,lng&mode=drive`
    pub async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteSummary, MapsApiError> {
        let waypoints = format!(
            "{},{}|{},{}",
            origin.lat, origin.lng, destination.lat, destination.lng
        );
        let response = self
            .client
            .get(format!("{}/routing", self.base_url))
            .query(&[
                ("waypoints", waypoints.as_str()),
                ("mode", "drive"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        parse_route(&body)
    }

    /// Place suggestions for free text.
    ///
    /// `GET /geocode/autocomplete?text=...`
    pub async fn autocomplete(&self, text: &str) -> Result<Vec<PlaceSuggestion>, MapsApiError> {
        let response = self
            .client
            .get(format!("{}/geocode/autocomplete", self.base_url))
            .query(&[("text", text), ("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        parse_suggestions(&body)
    }

    // ---- private helpers ----

    /// Return the body text of a 2xx response, or [`MapsApiError::ApiError`].
    async fn read_body(response: reqwest::Response) -> Result<String, MapsApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
        if !status.is_success() {
            return Err(MapsApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl RouteProvider for GeoapifyClient {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteSummary, CoreError> {
        origin.validate("origin")?;
        destination.validate("destination")?;
        GeoapifyClient::route(self, origin, destination)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Geoapify routing failed");
                e.into()
            })
    }
}

#[async_trait]
impl GeocodeProvider for GeoapifyClient {
    async fn autocomplete(&self, text: &str) -> Result<Vec<PlaceSuggestion>, CoreError> {
        let text = validate_query(text)?;
        GeoapifyClient::autocomplete(self, text).await.map_err(|e| {
            tracing::warn!(error = %e, "Geoapify autocomplete failed");
            e.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GeoapifyClient::with_client(
            reqwest::Client::new(),
            "https://api.geoapify.com/v1/",
            "key",
        );
        assert_eq!(client.base_url, "https://api.geoapify.com/v1");
    }

    #[test]
    fn errors_convert_to_upstream() {
        let err: CoreError = MapsApiError::ApiError {
            status: 401,
            body: "Invalid apiKey".into(),
        }
        .into();
        assert_matches!(err, CoreError::Upstream(msg) if msg.contains("401"));
        assert_matches!(CoreError::from(MapsApiError::NoRoute), CoreError::Upstream(_));
    }

    #[tokio::test]
    async fn short_query_is_rejected_before_any_request() {
        // Port 9 (discard) is never contacted because validation fails first.
        let client = GeoapifyClient::new("http://127.0.0.1:9", "key", Duration::from_secs(1))
            .unwrap();
        let result = GeocodeProvider::autocomplete(&client, "ab").await;
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_upstream_error() {
        let client = GeoapifyClient::new("http://127.0.0.1:9", "key", Duration::from_secs(2))
            .unwrap();
        let result = RouteProvider::route(
            &client,
            Coordinates::new(28.61, 77.20),
            Coordinates::new(28.70, 77.10),
        )
        .await;
        assert_matches!(result, Err(CoreError::Upstream(_)));
    }
}
