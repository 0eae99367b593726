//! Mosaic request parameters and validation.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::composite::MosaicMethod;
use crate::config::DEFAULT_DOWNLOAD_WORKERS;
use crate::dates::{DateRange, Period};
use crate::grid::GridId;
use crate::scene::SortMethod;

use super::MosaicError;

/// Band names accepted in `required_bands`.
pub const VALID_BANDS: [&str; 16] = [
    "AOT", "SCL", "WVP", "visual", "B01", "B02", "B03", "B04", "B05", "B06", "B07", "B08", "B8A",
    "B09", "B11", "B12",
];

/// The true-colour asset, only allowed on its own.
pub const VISUAL_BAND: &str = "visual";

/// Bands composited when none are requested.
pub const DEFAULT_BANDS: [&str; 4] = ["B04", "B03", "B02", "B08"];

/// Missing-data fraction below which compositing stops by default.
pub const DEFAULT_NO_DATA_THRESHOLD: f64 = 0.01;

/// Parameters of a mosaic run.
///
/// Construct with [`MosaicRequest::new`] and refine with the `with_*`
/// methods; [`MosaicRequest::validate`] is called by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicRequest {
    pub grid_id: String,
    pub start_year: i32,
    pub start_month: u32,
    pub start_day: u32,
    pub duration: Period,
    pub output_dir: Option<PathBuf>,
    pub sort_method: SortMethod,
    pub mosaic_method: MosaicMethod,
    pub required_bands: Vec<String>,
    pub no_data_threshold: Option<f64>,
    pub overwrite: bool,
    pub cache_bands: bool,
    pub additional_query: Map<String, Value>,
    pub scene_order: Option<Vec<String>>,
    pub max_download_workers: usize,
}

impl MosaicRequest {
    /// A request for `grid_id` starting on 1 January of `start_year`.
    pub fn new(grid_id: impl Into<String>, start_year: i32) -> Self {
        Self {
            grid_id: grid_id.into(),
            start_year,
            start_month: 1,
            start_day: 1,
            duration: Period::default(),
            output_dir: None,
            sort_method: SortMethod::default(),
            mosaic_method: MosaicMethod::default(),
            required_bands: DEFAULT_BANDS.iter().map(|b| b.to_string()).collect(),
            no_data_threshold: Some(DEFAULT_NO_DATA_THRESHOLD),
            overwrite: true,
            cache_bands: false,
            additional_query: Map::new(),
            scene_order: None,
            max_download_workers: DEFAULT_DOWNLOAD_WORKERS,
        }
    }

    pub fn with_start(mut self, month: u32, day: u32) -> Self {
        self.start_month = month;
        self.start_day = day;
        self
    }

    pub fn with_duration(mut self, duration: Period) -> Self {
        self.duration = duration;
        self
    }

    /// Write the mosaic as a GeoTIFF into `dir` instead of returning it.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_sort_method(mut self, method: SortMethod) -> Self {
        self.sort_method = method;
        self
    }

    pub fn with_mosaic_method(mut self, method: MosaicMethod) -> Self {
        self.mosaic_method = method;
        self
    }

    pub fn with_bands<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_bands = bands.into_iter().map(Into::into).collect();
        self
    }

    /// `None` disables the threshold stopping rule.
    pub fn with_no_data_threshold(mut self, threshold: Option<f64>) -> Self {
        self.no_data_threshold = threshold;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Keep downloaded assets in the engine's band cache.
    pub fn with_cache_bands(mut self, cache: bool) -> Self {
        self.cache_bands = cache;
        self
    }

    /// Extra STAC `query` clauses merged into the search.
    pub fn with_additional_query(mut self, query: Map<String, Value>) -> Self {
        self.additional_query = query;
        self
    }

    /// Scene ids in the order used by [`SortMethod::Custom`].
    pub fn with_scene_order<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scene_order = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_download_workers(mut self, workers: usize) -> Self {
        self.max_download_workers = workers;
        self
    }

    /// Whether the true-colour asset was requested.
    pub fn is_visual(&self) -> bool {
        self.required_bands.iter().any(|b| b == VISUAL_BAND)
    }

    /// Acquisition window of the request.
    pub fn date_range(&self) -> Result<DateRange, MosaicError> {
        Ok(DateRange::from_start(
            self.start_year,
            self.start_month,
            self.start_day,
            self.duration,
        )?)
    }

    /// Checks every parameter and returns the parsed grid id.
    pub fn validate(&self) -> Result<GridId, MosaicError> {
        let grid = GridId::parse(&self.grid_id)?;

        if let Some(threshold) = self.no_data_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(MosaicError::InvalidRequest(format!(
                    "No data threshold must be between 0 and 1 or None, got {}",
                    threshold
                )));
            }
        }

        for band in &self.required_bands {
            if !VALID_BANDS.contains(&band.as_str()) {
                return Err(MosaicError::InvalidRequest(format!(
                    "Invalid band: {}, must be one of {}",
                    band,
                    VALID_BANDS.join(", ")
                )));
            }
        }

        if self.is_visual() && self.required_bands.len() > 1 {
            return Err(MosaicError::InvalidRequest(
                "Cannot use visual band with other bands, must be used alone".to_string(),
            ));
        }

        self.mosaic_method.validated()?;

        if self.sort_method == SortMethod::Custom
            && self.scene_order.as_ref().map_or(true, Vec::is_empty)
        {
            return Err(MosaicError::InvalidRequest(
                "Custom sort method requires a scene order".to_string(),
            ));
        }

        if self.required_bands.is_empty() {
            return Err(MosaicError::InvalidRequest(
                "At least one band must be requested".to_string(),
            ));
        }

        if self.max_download_workers == 0 {
            return Err(MosaicError::InvalidRequest(
                "At least one download worker is required".to_string(),
            ));
        }

        Ok(grid)
    }

    /// File name the mosaic is exported under.
    pub fn output_file_name(&self, range: &DateRange) -> String {
        format!(
            "{}_{}_to_{}_{}_{}_{}.tif",
            self.grid_id,
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d"),
            self.sort_method.as_str(),
            self.mosaic_method.name(),
            self.required_bands.join("_")
        )
    }

    /// Full export path inside `dir`.
    pub fn output_path(&self, dir: &Path, range: &DateRange) -> PathBuf {
        dir.join(self.output_file_name(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::CompositeError;
    use crate::grid::GridError;

    fn request() -> MosaicRequest {
        MosaicRequest::new("50HMH", 2022)
    }

    fn invalid_message(request: &MosaicRequest) -> String {
        match request.validate() {
            Err(MosaicError::InvalidRequest(message)) => message,
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let r = request();
        assert_eq!((r.start_month, r.start_day), (1, 1));
        assert!(r.duration.is_zero());
        assert_eq!(r.required_bands, vec!["B04", "B03", "B02", "B08"]);
        assert_eq!(r.no_data_threshold, Some(0.01));
        assert!(r.overwrite);
        assert!(!r.cache_bands);
        assert_eq!(r.sort_method, SortMethod::ValidData);
        assert_eq!(r.mosaic_method, MosaicMethod::Mean);
        assert_eq!(r.max_download_workers, 4);
        assert!(r.output_dir.is_none());
    }

    #[test]
    fn test_valid_request() {
        let grid = request().validate().unwrap();
        assert_eq!(grid.to_string(), "50HMH");
    }

    #[test]
    fn test_grid_errors_pass_through() {
        let r = MosaicRequest::new("50hmh", 2022);
        assert!(matches!(
            r.validate(),
            Err(MosaicError::Grid(GridError::InvalidFormat(_)))
        ));
    }

    #[test]
    fn test_threshold_range() {
        let message = invalid_message(&request().with_no_data_threshold(Some(1.5)));
        assert!(message.contains("between 0 and 1"));
        assert!(request().with_no_data_threshold(None).validate().is_ok());
        assert!(request().with_no_data_threshold(Some(0.0)).validate().is_ok());
        assert!(request().with_no_data_threshold(Some(1.0)).validate().is_ok());
    }

    #[test]
    fn test_band_rules() {
        let message = invalid_message(&request().with_bands(["B04", "B13"]));
        assert!(message.starts_with("Invalid band: B13"));

        let message = invalid_message(&request().with_bands(["visual", "B04"]));
        assert!(message.contains("visual band"));

        assert!(request().with_bands(["visual"]).validate().is_ok());

        let message = invalid_message(&request().with_bands(Vec::<String>::new()));
        assert!(message.contains("At least one band"));
    }

    #[test]
    fn test_percentile_range_checked() {
        let r = request().with_mosaic_method(MosaicMethod::Percentile(120.0));
        assert!(matches!(
            r.validate(),
            Err(MosaicError::Composite(CompositeError::PercentileRange(_)))
        ));
    }

    #[test]
    fn test_custom_sort_requires_order() {
        let r = request().with_sort_method(SortMethod::Custom);
        assert!(invalid_message(&r).contains("scene order"));

        let r = r.with_scene_order(["S2A_MSIL2A_20220105"]);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_output_path() {
        let r = request()
            .with_start(3, 1)
            .with_duration(Period::new(0, 2, 0))
            .with_mosaic_method(MosaicMethod::Percentile(25.0))
            .with_bands(["B04", "B03"]);
        let range = r.date_range().unwrap();
        assert_eq!(
            r.output_path(Path::new("/tmp/out"), &range),
            PathBuf::from("/tmp/out/50HMH_2022-03-01_to_2022-05-01_valid_data_percentile_B04_B03.tif")
        );
    }

    #[test]
    fn test_invalid_start_date() {
        let r = request().with_start(2, 30).with_duration(Period::new(0, 1, 0));
        assert!(matches!(r.date_range(), Err(MosaicError::InvalidRequest(_))));
    }
}
