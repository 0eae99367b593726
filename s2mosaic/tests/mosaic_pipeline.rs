//! End-to-end mosaic runs against a mock catalog.
//!
//! The mock serves STAC search pages and small GeoTIFFs encoded in memory,
//! so the full pipeline (search, paging, masking, compositing, export and
//! band caching) runs without network access.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

use s2mosaic::cache::BandCache;
use s2mosaic::catalog::{CatalogError, HttpClient, NoopSigner, RetryingClient};
use s2mosaic::dates::Period;
use s2mosaic::mosaic::{mosaic, Engine, MosaicRequest, MosaicResult};
use s2mosaic::raster::{read_band, GeoTiffExporter, GeoTransform, MosaicOutput, PixelData, Profile};

const STAC_URL: &str = "https://stac.test/api";
const SEARCH_URL: &str = "https://stac.test/api/search";
const PAGE_2_URL: &str = "https://stac.test/api/search?token=page2";
const DATA_HOST: &str = "https://data.test/";

/// Pixels per side at 10 m.
const SIZE: usize = 32;
const HALF: usize = SIZE / 2;

/// Serves canned responses per URL; the last response of each queue repeats.
#[derive(Default)]
struct MockCatalog {
    routes: Mutex<HashMap<String, VecDeque<Result<Vec<u8>, CatalogError>>>>,
    requests: Mutex<Vec<String>>,
}

impl MockCatalog {
    fn route(&self, url: &str, response: Result<Vec<u8>, CatalogError>) {
        self.routes
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    fn data_requests(&self) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|u| u.starts_with(DATA_HOST))
            .count()
    }

    fn answer(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        self.requests.lock().push(url.to_string());
        let mut routes = self.routes.lock();
        let Some(queue) = routes.get_mut(url) else {
            return Err(CatalogError::Status {
                status: 404,
                url: url.to_string(),
            });
        };
        if queue.len() > 1 {
            if let Some(response) = queue.pop_front() {
                return response;
            }
        }
        queue
            .front()
            .cloned()
            .unwrap_or_else(|| Err(CatalogError::HttpError("no response".to_string())))
    }
}

impl HttpClient for MockCatalog {
    fn get(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        self.answer(url)
    }

    fn post_json(&self, url: &str, _body: &Value) -> Result<Vec<u8>, CatalogError> {
        self.answer(url)
    }
}

fn href(id: &str, asset: &str) -> String {
    format!("{}{}/{}.tif", DATA_HOST, id, asset)
}

fn geotiff(size: usize, resolution: f64, values: Vec<u16>) -> Vec<u8> {
    let output = MosaicOutput {
        pixels: PixelData::UInt16(values),
        profile: Profile {
            epsg: Some(32750),
            transform: GeoTransform::new(399960.0, 6300040.0, resolution, resolution),
            width: size,
            height: size,
            count: 1,
            data_type: s2mosaic::raster::DataType::UInt16,
            nodata: None,
            descriptions: Vec::new(),
        },
    };
    let mut cursor = Cursor::new(Vec::new());
    GeoTiffExporter::new().write_to(&mut cursor, &output).unwrap();
    cursor.into_inner()
}

/// Band of `value` whose first `zero_cols` columns are zero.
fn band(size: usize, value: u16, zero_cols: usize) -> Vec<u16> {
    (0..size * size)
        .map(|i| if i % size < zero_cols { 0 } else { value })
        .collect()
}

/// Registers a scene's assets; `swath_gap` blanks the western edge.
fn add_scene(mock: &MockCatalog, id: &str, value: u16, swath_gap: bool) {
    let gap_10m = if swath_gap { 2 } else { 0 };
    let gap_20m = if swath_gap { 1 } else { 0 };
    for asset in ["B02", "B03", "B04", "B08"] {
        mock.route(&href(id, asset), Ok(geotiff(SIZE, 10.0, band(SIZE, value, gap_10m))));
    }
    mock.route(&href(id, "B8A"), Ok(geotiff(HALF, 20.0, band(HALF, value, gap_20m))));
    mock.route(&href(id, "SCL"), Ok(geotiff(HALF, 20.0, vec![4; HALF * HALF])));
}

fn item(id: &str, nodata_pct: f64, day: u32) -> Value {
    let assets: Map<String, Value> = ["B02", "B03", "B04", "B08", "B8A", "SCL"]
        .iter()
        .map(|a| (a.to_string(), json!({ "href": href(id, a) })))
        .collect();
    json!({
        "type": "Feature",
        "id": id,
        "properties": {
            "datetime": format!("2023-03-{:02}T02:04:41Z", day),
            "s2:nodata_pixel_percentage": nodata_pct,
            "s2:high_proba_clouds_percentage": 0.0,
            "s2:cloud_shadow_percentage": 0.0,
            "sat:relative_orbit": 17,
        },
        "assets": assets,
    })
}

fn page(items: Vec<Value>, next: Option<&str>) -> Vec<u8> {
    let links: Vec<Value> = next
        .map(|href| vec![json!({ "rel": "next", "href": href, "method": "GET" })])
        .unwrap_or_default();
    json!({ "type": "FeatureCollection", "features": items, "links": links })
        .to_string()
        .into_bytes()
}

fn engine(mock: &Arc<MockCatalog>) -> Engine {
    Engine::new(mock.clone())
        .with_stac_url(STAC_URL)
        .with_signer(Arc::new(NoopSigner))
}

fn request() -> MosaicRequest {
    MosaicRequest::new("50HMH", 2023)
        .with_start(3, 1)
        .with_duration(Period::new(0, 1, 0))
}

#[test]
fn test_swath_edge_is_filled_from_other_scene() {
    let mock = Arc::new(MockCatalog::default());
    // A ranks first (less no-data) but has a gap along its western edge
    add_scene(&mock, "A", 100, true);
    add_scene(&mock, "B", 300, false);
    mock.route(
        SEARCH_URL,
        Ok(page(vec![item("A", 0.0, 2), item("B", 5.0, 7)], None)),
    );

    let request = request().with_no_data_threshold(None);
    let output = match mosaic(&request, &engine(&mock)).unwrap() {
        MosaicResult::InMemory(output) => output,
        other => panic!("unexpected result {:?}", other),
    };

    assert_eq!(output.profile.width, SIZE);
    // The gap is one 20 m column, dilated by four more
    for col in 0..10 {
        assert_eq!(output.value(0, col, 7), 300.0, "column {}", col);
    }
    for col in 10..SIZE {
        assert_eq!(output.value(0, col, 7), 200.0, "column {}", col);
    }
}

#[test]
fn test_paged_search_export_and_band_cache() {
    let temp = TempDir::new().unwrap();
    let mock = Arc::new(MockCatalog::default());
    add_scene(&mock, "A", 120, false);
    add_scene(&mock, "B", 480, false);
    mock.route(SEARCH_URL, Ok(page(vec![item("A", 0.0, 2)], Some(PAGE_2_URL))));
    mock.route(PAGE_2_URL, Ok(page(vec![item("B", 0.0, 9)], None)));

    let cache = BandCache::new(temp.path().join("cache")).unwrap();
    let engine = engine(&mock).with_cache(cache.clone());
    let request = request()
        .with_output_dir(temp.path().join("out"))
        .with_no_data_threshold(None)
        .with_cache_bands(true);

    let first = mosaic(&request, &engine).unwrap();
    let path = first.path().cloned().unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "50HMH_2023-03-01_to_2023-04-01_valid_data_mean_B04_B03_B02_B08.tif"
    );
    let (band, _) = read_band(&std::fs::read(&path).unwrap(), 0).unwrap();
    assert!(band.data.iter().all(|&v| v == 300.0));

    // Six assets per scene, each fetched once
    let downloads = mock.data_requests();
    assert_eq!(downloads, 12);
    assert_eq!(cache.stats().unwrap().files, 12);

    // A rebuild reads every band from the cache
    mosaic(&request, &engine).unwrap();
    assert_eq!(mock.data_requests(), downloads);
}

#[test]
fn test_transient_failures_are_retried() {
    let mock = Arc::new(MockCatalog::default());
    add_scene(&mock, "A", 100, false);
    mock.route(
        SEARCH_URL,
        Err(CatalogError::Status {
            status: 503,
            url: SEARCH_URL.to_string(),
        }),
    );
    mock.route(SEARCH_URL, Ok(page(vec![item("A", 0.0, 2)], None)));

    let http = RetryingClient::new(mock.clone(), 3).with_base_delay(Duration::from_millis(1));
    let engine = Engine::new(Arc::new(http))
        .with_stac_url(STAC_URL)
        .with_signer(Arc::new(NoopSigner));

    let result = mosaic(&request(), &engine).unwrap();
    let output = result.output().unwrap();
    assert_eq!(output.value(1, 0, 0), 100.0);
}

#[test]
fn test_missing_asset_is_reported() {
    let mock = Arc::new(MockCatalog::default());
    add_scene(&mock, "A", 100, false);
    let mut broken = item("A", 0.0, 2);
    broken["assets"].as_object_mut().unwrap().remove("B8A");
    mock.route(SEARCH_URL, Ok(page(vec![broken], None)));

    let err = mosaic(&request(), &engine(&mock)).unwrap_err();
    assert!(err.to_string().contains("B8A"), "{}", err);
}
