//! STAC item search.
//!
//! Builds the search body for a Sentinel-2 tile and time range, posts it to
//! the catalog's `/search` endpoint and follows `next` links until the
//! result set is exhausted.

use geo::Polygon;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::http::HttpClient;
use super::types::{CatalogError, ItemCollection, StacItem};
use crate::dates::DateRange;
use crate::grid::GridId;

/// Planetary Computer STAC API root.
pub const PLANETARY_COMPUTER_STAC_URL: &str = "https://planetarycomputer.microsoft.com/api/stac/v1";

/// Sentinel-2 Level-2A collection identifier.
pub const SENTINEL_2_L2A: &str = "sentinel-2-l2a";

/// Items requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Hard stop for runaway pagination.
const MAX_PAGES: usize = 200;

/// Parameters of a tile search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub collection: String,
    pub grid: GridId,
    pub intersects: Polygon<f64>,
    pub range: DateRange,
    /// Extra `query` extension terms, e.g. `{"eo:cloud_cover": {"lt": 50}}`.
    pub additional_query: Map<String, Value>,
    pub page_size: usize,
}

impl SearchRequest {
    pub fn new(grid: GridId, intersects: Polygon<f64>, range: DateRange) -> Self {
        Self {
            collection: SENTINEL_2_L2A.to_string(),
            grid,
            intersects,
            range,
            additional_query: Map::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_additional_query(mut self, query: Map<String, Value>) -> Self {
        self.additional_query = query;
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// JSON body for the `/search` endpoint.
    pub fn to_body(&self) -> Value {
        let mut query = Map::new();
        query.insert(
            "s2:mgrs_tile".to_string(),
            json!({ "eq": self.grid.to_string() }),
        );
        for (key, value) in &self.additional_query {
            query.insert(key.clone(), value.clone());
        }

        json!({
            "collections": [self.collection],
            "intersects": polygon_to_geojson(&self.intersects),
            "datetime": self.range.to_stac_interval(),
            "query": query,
            "limit": self.page_size,
        })
    }
}

/// GeoJSON representation of a polygon.
pub fn polygon_to_geojson(polygon: &Polygon<f64>) -> Value {
    let ring = |line: &geo::LineString<f64>| -> Vec<[f64; 2]> {
        line.coords().map(|c| [c.x, c.y]).collect()
    };
    let mut rings = vec![ring(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring));
    json!({ "type": "Polygon", "coordinates": rings })
}

/// Client for a STAC API.
pub struct StacClient<C: HttpClient> {
    http: C,
    api_url: String,
}

impl<C: HttpClient> StacClient<C> {
    /// Creates a client for the Planetary Computer catalog.
    pub fn new(http: C) -> Self {
        Self::with_api_url(http, PLANETARY_COMPUTER_STAC_URL)
    }

    /// Creates a client for an arbitrary STAC API root.
    pub fn with_api_url(http: C, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { http, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Runs a search and collects every page of results.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<StacItem>, CatalogError> {
        let search_url = format!("{}/search", self.api_url);
        let base_body = request.to_body();

        info!(
            grid = %request.grid,
            range = %request.range,
            "Searching {} for scenes",
            request.collection
        );

        let mut items = Vec::new();
        let mut page = self.fetch_page(&search_url, Some(&base_body))?;

        for page_number in 1.. {
            debug!(page = page_number, items = page.features.len(), "Received page");
            let next = page.next_link().cloned();
            items.extend(page.features);

            let Some(link) = next else {
                break;
            };
            if page_number >= MAX_PAGES {
                warn!("Stopping after {} result pages", MAX_PAGES);
                break;
            }

            let is_post = link
                .method
                .as_deref()
                .map(|m| m.eq_ignore_ascii_case("POST"))
                .unwrap_or(false);

            page = if is_post {
                let body = merge_body(&base_body, &link);
                self.fetch_page(&link.href, Some(&body))?
            } else {
                self.fetch_page(&link.href, None)?
            };
        }

        info!(grid = %request.grid, count = items.len(), "Catalog search complete");
        Ok(items)
    }

    fn fetch_page(&self, url: &str, body: Option<&Value>) -> Result<ItemCollection, CatalogError> {
        let bytes = match body {
            Some(body) => self.http.post_json(url, body)?,
            None => self.http.get(url)?,
        };
        serde_json::from_slice(&bytes).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

/// Request body for a POST `next` link.
///
/// With `merge: true` the link body is laid over the original request;
/// otherwise the link body replaces it. A link without a body repeats the
/// original request.
fn merge_body(base: &Value, link: &super::types::Link) -> Value {
    match (&link.body, link.merge.unwrap_or(true)) {
        (None, _) => base.clone(),
        (Some(body), false) => Value::Object(body.clone()),
        (Some(body), true) => {
            let mut merged = base.as_object().cloned().unwrap_or_default();
            for (key, value) in body {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::http::tests::MockHttpClient;
    use crate::dates::Period;

    fn request() -> SearchRequest {
        let grid = GridId::parse("50HMH").unwrap();
        let footprint = grid.footprint().unwrap();
        let range = DateRange::from_start(2023, 1, 1, Period::new(0, 3, 0)).unwrap();
        SearchRequest::new(grid, footprint, range)
    }

    fn item(id: &str) -> Value {
        json!({ "id": id, "properties": {}, "assets": {} })
    }

    #[test]
    fn test_body_contains_tile_filter_and_interval() {
        let body = request().to_body();
        assert_eq!(body["collections"][0], "sentinel-2-l2a");
        assert_eq!(body["query"]["s2:mgrs_tile"]["eq"], "50HMH");
        assert_eq!(
            body["datetime"],
            "2023-01-01T00:00:00Z/2023-04-01T00:00:00Z"
        );
        assert_eq!(body["intersects"]["type"], "Polygon");
        assert_eq!(body["limit"], 100);
    }

    #[test]
    fn test_additional_query_is_merged() {
        let mut extra = Map::new();
        extra.insert("eo:cloud_cover".to_string(), json!({ "lt": 50 }));
        let body = request().with_additional_query(extra).to_body();
        assert_eq!(body["query"]["eo:cloud_cover"]["lt"], 50);
        assert_eq!(body["query"]["s2:mgrs_tile"]["eq"], "50HMH");
    }

    #[test]
    fn test_single_page_search() {
        let mock = MockHttpClient::new().respond_json(
            "https://stac.example.com/search",
            json!({ "features": [item("a"), item("b")], "links": [] }),
        );
        let client = StacClient::with_api_url(mock, "https://stac.example.com/");

        let items = client.search(&request()).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_follows_post_next_links() {
        let mock = MockHttpClient::new()
            .respond_json(
                "https://stac.example.com/search",
                json!({
                    "features": [item("a")],
                    "links": [{
                        "rel": "next",
                        "href": "https://stac.example.com/search",
                        "method": "POST",
                        "body": { "token": "next:a" },
                        "merge": true
                    }]
                }),
            )
            .respond_json(
                "https://stac.example.com/search",
                json!({ "features": [item("b")], "links": [] }),
            );
        let client = StacClient::with_api_url(mock, "https://stac.example.com");

        let items = client.search(&request()).unwrap();
        assert_eq!(items.len(), 2);

        let requests = client.http.requests.lock();
        assert_eq!(requests.len(), 2);
        let second = requests[1].body.as_ref().unwrap();
        assert_eq!(second["token"], "next:a");
        assert_eq!(second["query"]["s2:mgrs_tile"]["eq"], "50HMH");
    }

    #[test]
    fn test_follows_get_next_links() {
        let mock = MockHttpClient::new()
            .respond_json(
                "https://stac.example.com/search",
                json!({
                    "features": [item("a")],
                    "links": [{ "rel": "next", "href": "https://stac.example.com/search?page=2" }]
                }),
            )
            .respond_json(
                "https://stac.example.com/search?page=2",
                json!({ "features": [item("b"), item("c")] }),
            );
        let client = StacClient::with_api_url(mock, "https://stac.example.com");

        let items = client.search(&request()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(client.http.requests.lock()[1].method, "GET");
    }

    #[test]
    fn test_decode_error() {
        let mock =
            MockHttpClient::new().respond("https://stac.example.com/search", Ok(b"<html>".to_vec()));
        let client = StacClient::with_api_url(mock, "https://stac.example.com");

        assert!(matches!(
            client.search(&request()),
            Err(CatalogError::Decode(_))
        ));
    }
}
