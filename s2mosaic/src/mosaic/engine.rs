//! Collaborators used by the mosaic pipeline.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::BandCache;
use crate::catalog::{
    AssetSigner, HttpClient, NoopSigner, PlanetaryComputerSigner, ReqwestClient, RetryingClient,
    SearchRequest, StacClient, DEFAULT_PAGE_SIZE, SENTINEL_2_L2A,
};
use crate::config::{ConfigFile, DownloadConfig};
use crate::mask::{CloudMasker, SclCloudMasker};
use crate::scene::{sort_scenes, Scene};

use super::progress::{NoopProgress, SharedProgressReporter};
use super::{MosaicError, MosaicRequest};

/// Shared HTTP client.
pub type SharedHttpClient = Arc<dyn HttpClient>;

/// Everything the pipeline needs besides the request.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use s2mosaic::catalog::ReqwestClient;
/// use s2mosaic::mosaic::{mosaic, Engine, LogProgress, MosaicRequest};
///
/// let engine = Engine::new(Arc::new(ReqwestClient::new()?))
///     .with_progress(Arc::new(LogProgress));
/// let result = mosaic(&MosaicRequest::new("50HMH", 2022), &engine)?;
/// ```
pub struct Engine {
    http: SharedHttpClient,
    stac: StacClient<SharedHttpClient>,
    collection: String,
    page_size: usize,
    signer: Arc<dyn AssetSigner>,
    cache: Option<BandCache>,
    masker: Arc<dyn CloudMasker>,
    progress: SharedProgressReporter,
    download: DownloadConfig,
}

impl Engine {
    /// Engine against the Planetary Computer with SCL cloud masking, asset
    /// signing, no band cache and no progress output.
    pub fn new(http: SharedHttpClient) -> Self {
        Self {
            stac: StacClient::new(http.clone()),
            collection: SENTINEL_2_L2A.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            signer: Arc::new(PlanetaryComputerSigner::new(http.clone())),
            cache: None,
            masker: Arc::new(SclCloudMasker::new()),
            progress: Arc::new(NoopProgress),
            download: DownloadConfig::default(),
            http,
        }
    }

    /// Builds an engine from configuration file settings.
    ///
    /// An empty `sas_url` disables signing. The band cache is attached when
    /// `[cache] enabled` is set.
    pub fn from_config(config: &ConfigFile) -> Result<Self, MosaicError> {
        let download = DownloadConfig::from(&config.download);
        let base = ReqwestClient::with_timeout(download.timeout_secs())?;
        let http: SharedHttpClient = Arc::new(RetryingClient::new(base, download.max_retries()));

        let signer: Arc<dyn AssetSigner> = if config.catalog.sas_url.is_empty() {
            Arc::new(NoopSigner)
        } else {
            Arc::new(PlanetaryComputerSigner::with_sas_url(
                http.clone(),
                config.catalog.sas_url.clone(),
            ))
        };

        let mut engine = Self::new(http)
            .with_stac_url(config.catalog.stac_url.clone())
            .with_signer(signer)
            .with_collection(config.catalog.collection.clone())
            .with_page_size(config.catalog.page_size)
            .with_download_config(download);

        if config.cache.enabled {
            engine = engine.with_cache(BandCache::new(&config.cache.directory)?);
        }
        Ok(engine)
    }

    pub fn with_stac_url(mut self, url: impl Into<String>) -> Self {
        self.stac = StacClient::with_api_url(self.http.clone(), url);
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

    pub fn with_signer(mut self, signer: Arc<dyn AssetSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Cache used by requests that enable `cache_bands`.
    pub fn with_cache(mut self, cache: BandCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cloud_masker(mut self, masker: Arc<dyn CloudMasker>) -> Self {
        self.masker = masker;
        self
    }

    pub fn with_progress(mut self, progress: SharedProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Download settings the engine was built with.
    pub fn with_download_config(mut self, download: DownloadConfig) -> Self {
        self.download = download;
        self
    }

    pub fn download_config(&self) -> &DownloadConfig {
        &self.download
    }

    pub fn cache(&self) -> Option<&BandCache> {
        self.cache.as_ref()
    }

    pub fn cloud_masker(&self) -> &dyn CloudMasker {
        self.masker.as_ref()
    }

    pub fn progress(&self) -> &SharedProgressReporter {
        &self.progress
    }

    /// Searches the catalog for the request and returns its scenes in
    /// compositing order.
    pub fn find_scenes(&self, request: &MosaicRequest) -> Result<Vec<Scene>, MosaicError> {
        let grid = request.validate()?;
        let range = request.date_range()?;
        let footprint = grid.footprint()?;

        let search = SearchRequest::new(grid, footprint, range)
            .with_collection(self.collection.clone())
            .with_page_size(self.page_size)
            .with_additional_query(request.additional_query.clone());
        let items = self.stac.search(&search)?;

        if items.is_empty() {
            return Err(MosaicError::NoScenes {
                grid: grid.to_string(),
                start: range.start.format("%Y-%m-%d").to_string(),
                end: range.end.format("%Y-%m-%d").to_string(),
            });
        }

        let scenes = items
            .into_iter()
            .map(Scene::from_item)
            .collect::<Result<Vec<_>, _>>()?;
        let found = scenes.len();

        let order = request.scene_order.as_deref().unwrap_or(&[]);
        let sorted = sort_scenes(scenes, request.sort_method, order);
        info!(
            found,
            kept = sorted.len(),
            sort = %request.sort_method,
            "Scenes ready for compositing"
        );
        Ok(sorted)
    }

    /// Band fetcher for one request.
    pub fn fetcher(&self, use_cache: bool) -> BandFetcher<'_> {
        BandFetcher {
            http: self.http.as_ref(),
            signer: self.signer.as_ref(),
            cache: if use_cache { self.cache.as_ref() } else { None },
        }
    }
}

/// Downloads asset bytes, going through the band cache when one is set.
pub struct BandFetcher<'a> {
    http: &'a dyn HttpClient,
    signer: &'a dyn AssetSigner,
    cache: Option<&'a BandCache>,
}

impl BandFetcher<'_> {
    /// Bytes of the asset at `href`.
    ///
    /// Cache entries are keyed by the unsigned href. A failed cache write
    /// is logged and does not fail the download.
    pub fn fetch(&self, href: &str) -> Result<Vec<u8>, MosaicError> {
        if let Some(bytes) = self.cache.and_then(|cache| cache.get(href)) {
            return Ok(bytes);
        }

        let signed = self.signer.sign(href)?;
        let bytes = self.http.get(&signed)?;
        debug!(href, bytes = bytes.len(), "Downloaded asset");

        if let Some(cache) = self.cache {
            if let Err(e) = cache.put(href, &bytes) {
                warn!(href, error = %e, "Failed to cache asset");
            }
        }
        Ok(bytes)
    }
}
