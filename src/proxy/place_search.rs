use crate::core::{JournalError, Result};
use async_trait::async_trait;
use aws_sdk_location::error::DisplayErrorContext;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{Level, event};

pub const PLACE_RESULT_COUNT: u8 = 10;

/// A point of interest returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub place_id: Option<String>,
    pub name: String,
    pub address: String,
    /// `[lon, lat]`, GeoJSON order.
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaceQuery {
    Text(String),
    Position { lat: f64, lon: f64 },
}

impl PlaceQuery {
    /// Text search wins when present; otherwise both coordinates are required.
    pub fn from_params(
        query: Option<&str>,
        lat: Option<&str>,
        lon: Option<&str>,
    ) -> Result<Self> {
        if let Some(text) = query.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(Self::Text(text.to_string()));
        }

        let lat = lat.map(str::trim).filter(|v| !v.is_empty());
        let lon = lon.map(str::trim).filter(|v| !v.is_empty());
        let (Some(lat), Some(lon)) = (lat, lon) else {
            return Err(JournalError::Validation(
                "Missing \"query\" or \"lat/lon\" parameters.".to_string(),
            ));
        };

        let lat = parse_coordinate("lat", lat, 90.0)?;
        let lon = parse_coordinate("lon", lon, 180.0)?;
        Ok(Self::Position { lat, lon })
    }
}

fn parse_coordinate(name: &str, raw: &str, bound: f64) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .map_err(|_| JournalError::Validation(format!("\"{name}\" must be a number")))?;
    if !value.is_finite() || value.abs() > bound {
        return Err(JournalError::Validation(format!(
            "\"{name}\" must be within ±{bound}"
        )));
    }
    Ok(value)
}

#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Fails when the place index is not set up on this server.
    fn ensure_configured(&self) -> Result<()> {
        Ok(())
    }

    async fn search(&self, query: &PlaceQuery) -> Result<Vec<Place>>;
}

fn require_index(index: &Option<String>) -> Result<&str> {
    index.as_deref().ok_or_else(|| {
        JournalError::Configuration("Place index is not configured on the server.".to_string())
    })
}

/// Place index queried through the Location Service SDK.
pub struct LocationServicePlaceSearch {
    client: aws_sdk_location::Client,
    index: Option<String>,
}

impl LocationServicePlaceSearch {
    pub fn new(client: aws_sdk_location::Client, index: Option<String>) -> Self {
        Self { client, index }
    }
}

fn sdk_failure<E>(err: E) -> JournalError
where
    E: std::error::Error,
{
    let detail = DisplayErrorContext(&err).to_string();
    event!(Level::ERROR, error = %detail, "place index rejected the query");
    JournalError::Upstream(format!("place search failed: {detail}"))
}

fn from_sdk(place_id: Option<&str>, place: Option<&aws_sdk_location::types::Place>) -> Option<Place> {
    let place = place?;
    let point = match place.geometry()?.point() {
        [lon, lat, ..] => [*lon, *lat],
        _ => return None,
    };
    let place = IndexPlace {
        label: place.label().map(str::to_string),
        municipality: place.municipality().map(str::to_string),
        region: place.region().map(str::to_string),
        country: place.country().map(str::to_string),
        geometry: IndexGeometry { point },
        place_id: None,
    };
    Some(place.into_place(place_id.map(str::to_string)))
}

#[async_trait]
impl PlaceSearch for LocationServicePlaceSearch {
    fn ensure_configured(&self) -> Result<()> {
        require_index(&self.index).map(|_| ())
    }

    async fn search(&self, query: &PlaceQuery) -> Result<Vec<Place>> {
        let index = require_index(&self.index)?;
        let max_results = i32::from(PLACE_RESULT_COUNT);

        let places: Vec<Place> = match query {
            PlaceQuery::Text(text) => self
                .client
                .search_place_index_for_text()
                .index_name(index)
                .text(text)
                .max_results(max_results)
                .send()
                .await
                .map_err(sdk_failure)?
                .results()
                .iter()
                .filter_map(|r| from_sdk(r.place_id(), r.place()))
                .collect(),
            PlaceQuery::Position { lat, lon } => self
                .client
                .search_place_index_for_position()
                .index_name(index)
                .position(*lon)
                .position(*lat)
                .max_results(max_results)
                .language("en")
                .send()
                .await
                .map_err(sdk_failure)?
                .results()
                .iter()
                .filter_map(|r| from_sdk(r.place_id(), r.place()))
                .collect(),
        };
        Ok(places)
    }
}

/// Place index reached over its plain REST API.
///
/// Used when an explicit endpoint is configured, e.g. a local emulator or a
/// gateway that signs requests on the way out.
pub struct RestPlaceSearch {
    client: reqwest::Client,
    endpoint: String,
    index: Option<String>,
}

impl RestPlaceSearch {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, index: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            index,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IndexResponse {
    #[serde(default)]
    results: Vec<IndexResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IndexResult {
    place: IndexPlace,
    place_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IndexPlace {
    label: Option<String>,
    municipality: Option<String>,
    region: Option<String>,
    country: Option<String>,
    geometry: IndexGeometry,
    place_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IndexGeometry {
    point: [f64; 2],
}

/// `"{Municipality}, {Region}"` when a municipality is known, else
/// `"{Region}, {Country}"`; missing parts are skipped.
fn format_address(place: &IndexPlace) -> String {
    let parts = if place.municipality.is_some() {
        [&place.municipality, &place.region]
    } else {
        [&place.region, &place.country]
    };
    parts
        .iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

impl IndexPlace {
    fn into_place(self, result_id: Option<String>) -> Place {
        let address = format_address(&self);
        Place {
            place_id: result_id.or(self.place_id),
            name: self.label.unwrap_or_default(),
            address,
            coordinates: self.geometry.point,
        }
    }
}

#[async_trait]
impl PlaceSearch for RestPlaceSearch {
    fn ensure_configured(&self) -> Result<()> {
        require_index(&self.index).map(|_| ())
    }

    async fn search(&self, query: &PlaceQuery) -> Result<Vec<Place>> {
        let index = require_index(&self.index)?;

        let (path, body) = match query {
            PlaceQuery::Text(text) => (
                "text",
                json!({ "Text": text, "MaxResults": PLACE_RESULT_COUNT }),
            ),
            PlaceQuery::Position { lat, lon } => (
                "position",
                json!({
                    "Position": [lon, lat],
                    "MaxResults": PLACE_RESULT_COUNT,
                    "Language": "en",
                }),
            ),
        };
        let url = format!(
            "{}/places/v0/indexes/{}/search/{}",
            self.endpoint, index, path
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| JournalError::Upstream(format!("place search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            event!(Level::ERROR, %status, body = %body, "place index rejected the query");
            return Err(JournalError::Upstream(format!(
                "place search returned status {status}"
            )));
        }

        let parsed: IndexResponse = response
            .json()
            .await
            .map_err(|e| JournalError::Upstream(format!("place search response unreadable: {e}")))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|result| result.place.into_place(result.place_id))
            .collect())
    }
}
