//! Catalog types and errors

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while talking to the catalog or fetching assets.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    /// Transport-level failure (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body could not be decoded.
    #[error("Failed to decode catalog response: {0}")]
    Decode(String),

    /// An item lacks a property required for scene ranking.
    #[error("Item {item} is missing property '{property}'")]
    MissingProperty { item: String, property: String },

    /// An item lacks a required asset.
    #[error("Item {item} has no asset '{asset}'")]
    MissingAsset { item: String, asset: String },

    /// Obtaining a SAS token failed.
    #[error("Failed to sign {href}: {reason}")]
    Signing { href: String, reason: String },
}

impl CatalogError {
    /// Whether repeating the request may succeed.
    ///
    /// Transport failures, throttling (429) and server errors are transient;
    /// other client errors and decoding problems are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::HttpError(_) => true,
            CatalogError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A STAC item as returned by the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StacItem {
    pub id: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub assets: HashMap<String, Asset>,
}

impl StacItem {
    /// Looks up an asset, failing with [`CatalogError::MissingAsset`].
    pub fn asset(&self, key: &str) -> Result<&Asset, CatalogError> {
        self.assets.get(key).ok_or_else(|| CatalogError::MissingAsset {
            item: self.id.clone(),
            asset: key.to_string(),
        })
    }

    /// Numeric property, failing with [`CatalogError::MissingProperty`].
    pub fn number(&self, property: &str) -> Result<f64, CatalogError> {
        self.properties
            .get(property)
            .and_then(Value::as_f64)
            .ok_or_else(|| CatalogError::MissingProperty {
                item: self.id.clone(),
                property: property.to_string(),
            })
    }

    /// String property, failing with [`CatalogError::MissingProperty`].
    pub fn string(&self, property: &str) -> Result<&str, CatalogError> {
        self.properties
            .get(property)
            .and_then(Value::as_str)
            .ok_or_else(|| CatalogError::MissingProperty {
                item: self.id.clone(),
                property: property.to_string(),
            })
    }
}

/// A downloadable file attached to an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type", default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub gsd: Option<f64>,
    #[serde(rename = "proj:shape", default)]
    pub shape: Option<Vec<u32>>,
    #[serde(rename = "proj:transform", default)]
    pub transform: Option<Vec<f64>>,
}

/// A hypermedia link of a search response page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub body: Option<Map<String, Value>>,
    #[serde(default)]
    pub merge: Option<bool>,
}

/// One page of search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemCollection {
    #[serde(default)]
    pub features: Vec<StacItem>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl ItemCollection {
    /// The `next` pagination link, if any.
    pub fn next_link(&self) -> Option<&Link> {
        self.links.iter().find(|l| l.rel == "next")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item_json() -> Value {
        json!({
            "id": "S2A_MSIL2A_20230105T021341_R060_T50HMH_20230105T100126",
            "collection": "sentinel-2-l2a",
            "properties": {
                "datetime": "2023-01-05T02:13:41.024000Z",
                "s2:nodata_pixel_percentage": 12.5,
                "sat:relative_orbit": 60
            },
            "assets": {
                "B04": {
                    "href": "https://sentinel2l2a01.blob.core.windows.net/sentinel2-l2/50/H/MH/B04.tif",
                    "type": "image/tiff; application=geotiff; profile=cloud-optimized",
                    "gsd": 10.0,
                    "proj:shape": [10980, 10980],
                    "proj:transform": [10.0, 0.0, 399960.0, 0.0, -10.0, 6300040.0]
                }
            }
        })
    }

    #[test]
    fn test_item_deserializes() {
        let item: StacItem = serde_json::from_value(item_json()).unwrap();
        let asset = item.asset("B04").unwrap();
        assert_eq!(asset.gsd, Some(10.0));
        assert_eq!(asset.shape, Some(vec![10980, 10980]));
        assert_eq!(item.number("sat:relative_orbit").unwrap(), 60.0);
    }

    #[test]
    fn test_missing_asset_and_property() {
        let item: StacItem = serde_json::from_value(item_json()).unwrap();
        assert!(matches!(
            item.asset("B8A"),
            Err(CatalogError::MissingAsset { .. })
        ));
        assert!(matches!(
            item.number("s2:cloud_shadow_percentage"),
            Err(CatalogError::MissingProperty { .. })
        ));
    }

    #[test]
    fn test_transient_errors() {
        assert!(CatalogError::HttpError("reset".to_string()).is_transient());
        assert!(CatalogError::Status {
            status: 503,
            url: "u".to_string()
        }
        .is_transient());
        assert!(CatalogError::Status {
            status: 429,
            url: "u".to_string()
        }
        .is_transient());
        assert!(!CatalogError::Status {
            status: 404,
            url: "u".to_string()
        }
        .is_transient());
        assert!(!CatalogError::Decode("bad".to_string()).is_transient());
    }

    #[test]
    fn test_next_link() {
        let page: ItemCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [],
            "links": [
                {"rel": "self", "href": "https://example.com/search"},
                {"rel": "next", "href": "https://example.com/search", "method": "POST",
                 "body": {"token": "next:abc"}}
            ]
        }))
        .unwrap();
        let next = page.next_link().unwrap();
        assert_eq!(next.method.as_deref(), Some("POST"));
        assert_eq!(next.body.as_ref().unwrap()["token"], "next:abc");
    }
}
