//! Satellite imagery catalog access
//!
//! This module provides the STAC search client used to discover Sentinel-2
//! scenes, the asset signer that makes Planetary Computer hrefs
//! downloadable, and the HTTP client abstraction both are built on.
//!
//! # Example
//!
//! ```ignore
//! use s2mosaic::catalog::{ReqwestClient, SearchRequest, StacClient};
//!
//! let client = StacClient::new(ReqwestClient::new()?);
//! let items = client.search(&SearchRequest::new(grid, footprint, range))?;
//! ```

mod http;
mod signing;
mod stac;
mod types;

pub use http::{HttpClient, ReqwestClient, RetryingClient};
pub use signing::{AssetSigner, NoopSigner, PlanetaryComputerSigner, PLANETARY_COMPUTER_SAS_URL};
pub use stac::{
    polygon_to_geojson, SearchRequest, StacClient, DEFAULT_PAGE_SIZE, PLANETARY_COMPUTER_STAC_URL,
    SENTINEL_2_L2A,
};
pub use types::{Asset, CatalogError, ItemCollection, Link, StacItem};

#[cfg(test)]
pub use http::tests::MockHttpClient;
