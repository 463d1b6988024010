//! HERE Geocoding v1 client

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::Coordinates;

/// HERE geocode response
#[derive(Debug, Deserialize)]
pub struct HereGeocodeResponse {
    #[serde(default)]
    pub items: Vec<HereItem>,
}

#[derive(Debug, Deserialize)]
pub struct HereItem {
    #[serde(default)]
    pub title: String,
    pub position: HerePosition,
}

#[derive(Debug, Deserialize)]
pub struct HerePosition {
    pub lat: f64,
    pub lng: f64,
}

/// Best match of a forward geocode
#[derive(Debug, Clone)]
pub struct HereMatch {
    pub coordinates: Coordinates,
    pub title: String,
}

/// HERE geocoding client
pub struct HereClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HereClient {
    /// Create a new client
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("concrete-dispatch/0.1")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn search_url(&self, address: &str) -> String {
        format!(
            "{}/v1/geocode?q={}&apiKey={}",
            self.base_url,
            urlencoding::encode(address),
            urlencoding::encode(&self.api_key)
        )
    }

    /// Geocode a free-form address to coordinates
    pub async fn geocode(&self, address: &str) -> Result<Option<HereMatch>> {
        let response = self.client
            .get(self.search_url(address))
            .send()
            .await
            .context("Failed to send geocoding request")?;

        if !accepts_status(response.status())? {
            return Ok(None);
        }

        let body: HereGeocodeResponse = response
            .json()
            .await
            .context("Failed to parse geocoding response")?;

        Ok(body.items.into_iter().next().map(|item| HereMatch {
            coordinates: Coordinates::new(item.position.lat, item.position.lng),
            title: item.title,
        }))
    }
}

/// `Ok(true)` to read the body, `Ok(false)` for an unknown address,
/// `Err` for anything the circuit breaker should count
fn accepts_status(status: reqwest::StatusCode) -> Result<bool> {
    if status.is_success() {
        Ok(true)
    } else if status == reqwest::StatusCode::NOT_FOUND {
        Ok(false)
    } else {
        Err(anyhow::anyhow!("HERE geocoding returned HTTP {}", status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_query_and_key() {
        let client = HereClient::new("https://geocode.example.com/", "k&y").unwrap();
        let url = client.search_url("Rua Geral 100, Navegantes");
        assert_eq!(
            url,
            "https://geocode.example.com/v1/geocode?q=Rua%20Geral%20100%2C%20Navegantes&apiKey=k%26y"
        );
    }

    #[test]
    fn test_parse_response_takes_first_item() {
        let json = r#"{"items":[
            {"title":"Rua Geral, Navegantes","position":{"lat":-26.89,"lng":-48.65}},
            {"title":"Other","position":{"lat":0.0,"lng":0.0}}
        ]}"#;
        let body: HereGeocodeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.items.len(), 2);
        assert_eq!(body.items[0].position.lat, -26.89);
    }

    #[test]
    fn test_parse_empty_response() {
        let body: HereGeocodeResponse = serde_json::from_str("{}").unwrap();
        assert!(body.items.is_empty());
    }

    #[test]
    fn test_status_handling() {
        use reqwest::StatusCode;

        assert!(accepts_status(StatusCode::OK).unwrap());
        assert!(!accepts_status(StatusCode::NOT_FOUND).unwrap());

        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let err = accepts_status(status).unwrap_err();
            assert!(err.to_string().contains(status.as_str()), "{}", err);
        }
    }

    // Requires network access and a valid HERE_API_KEY
    #[tokio::test]
    #[ignore]
    async fn test_geocode_navegantes() {
        let key = std::env::var("HERE_API_KEY").unwrap();
        let client = HereClient::new("https://geocode.search.hereapi.com", &key).unwrap();

        let result = client.geocode("Navegantes, SC, Brasil").await.unwrap().unwrap();

        assert!((result.coordinates.lat + 26.89).abs() < 0.2);
        assert!((result.coordinates.lng + 48.65).abs() < 0.2);
    }
}
