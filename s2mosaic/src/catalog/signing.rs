//! Asset URL signing for Planetary Computer storage.
//!
//! Planetary Computer assets live in Azure Blob Storage and require a
//! short-lived SAS token appended as a query string. Tokens are issued per
//! storage account and container by the SAS API and cached until shortly
//! before they expire.

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use super::http::HttpClient;
use super::types::CatalogError;

/// Planetary Computer SAS token API root.
pub const PLANETARY_COMPUTER_SAS_URL: &str = "https://planetarycomputer.microsoft.com/api/sas/v1";

const BLOB_HOST_SUFFIX: &str = ".blob.core.windows.net";

/// Tokens are refreshed this long before their stated expiry.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Turns a raw asset href into one that can be downloaded.
pub trait AssetSigner: Send + Sync {
    fn sign(&self, href: &str) -> Result<String, CatalogError>;
}

/// Signer for catalogs whose assets are publicly readable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSigner;

impl AssetSigner for NoopSigner {
    fn sign(&self, href: &str) -> Result<String, CatalogError> {
        Ok(href.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "msft:expiry")]
    expiry: String,
    token: String,
}

#[derive(Debug, Clone)]
struct SasToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl SasToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Storage account and container of an Azure blob URL.
fn blob_location(href: &str) -> Option<(String, String)> {
    let url = Url::parse(href).ok()?;
    let host = url.host_str()?;
    let account = host.strip_suffix(BLOB_HOST_SUFFIX)?;
    let container = url.path_segments()?.find(|s| !s.is_empty())?;
    Some((account.to_string(), container.to_string()))
}

/// Signs Azure blob hrefs with Planetary Computer SAS tokens.
pub struct PlanetaryComputerSigner<C: HttpClient> {
    http: C,
    sas_url: String,
    tokens: Mutex<HashMap<(String, String), SasToken>>,
}

impl<C: HttpClient> PlanetaryComputerSigner<C> {
    pub fn new(http: C) -> Self {
        Self::with_sas_url(http, PLANETARY_COMPUTER_SAS_URL)
    }

    pub fn with_sas_url(http: C, sas_url: impl Into<String>) -> Self {
        Self {
            http,
            sas_url: sas_url.into().trim_end_matches('/').to_string(),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn token_for(&self, href: &str, account: &str, container: &str) -> Result<String, CatalogError> {
        let key = (account.to_string(), container.to_string());
        let now = Utc::now();

        if let Some(cached) = self.tokens.lock().get(&key) {
            if cached.is_fresh(now) {
                return Ok(cached.token.clone());
            }
        }

        let url = format!("{}/token/{}/{}", self.sas_url, account, container);
        debug!(account, container, "Requesting SAS token");

        let signing_error = |reason: String| CatalogError::Signing {
            href: href.to_string(),
            reason,
        };

        let bytes = self.http.get(&url)?;
        let response: TokenResponse =
            serde_json::from_slice(&bytes).map_err(|e| signing_error(e.to_string()))?;
        let expires_at = DateTime::parse_from_rfc3339(&response.expiry)
            .map_err(|e| signing_error(format!("invalid expiry '{}': {}", response.expiry, e)))?
            .with_timezone(&Utc);

        let token = SasToken {
            token: response.token,
            expires_at,
        };
        let value = token.token.clone();
        self.tokens.lock().insert(key, token);
        Ok(value)
    }
}

impl<C: HttpClient> AssetSigner for PlanetaryComputerSigner<C> {
    fn sign(&self, href: &str) -> Result<String, CatalogError> {
        // Already signed, or not hosted on blob storage
        if href.contains('?') {
            return Ok(href.to_string());
        }
        let Some((account, container)) = blob_location(href) else {
            return Ok(href.to_string());
        };

        let token = self.token_for(href, &account, &container)?;
        Ok(format!("{}?{}", href, token))
    }
}
