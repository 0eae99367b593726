//! Scene metadata and ordering
//!
//! A [`Scene`] wraps a catalog item together with the figures used to rank
//! it: its relative orbit, acquisition time and the estimated share of
//! cloud-free data. [`sort_scenes`] decides the order in which scenes are fed
//! to the compositor, which matters both for the `first` method and for how
//! quickly the no-data threshold is reached.

mod footprint;

pub use footprint::parse_geojson_polygons;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use geo::MultiPolygon;
use thiserror::Error;

use crate::catalog::{CatalogError, StacItem};

/// Property holding the share of no-data pixels in the tile.
pub const PROP_NODATA: &str = "s2:nodata_pixel_percentage";
/// Property holding the share of high-probability cloud pixels.
pub const PROP_HIGH_CLOUD: &str = "s2:high_proba_clouds_percentage";
/// Property holding the share of cloud-shadow pixels.
pub const PROP_CLOUD_SHADOW: &str = "s2:cloud_shadow_percentage";
/// Property holding the relative orbit number.
pub const PROP_RELATIVE_ORBIT: &str = "sat:relative_orbit";

/// A catalog item prepared for ranking.
#[derive(Debug, Clone)]
pub struct Scene {
    pub item: StacItem,
    pub orbit: u32,
    pub good_data_pct: f64,
    pub datetime: DateTime<Utc>,
}

impl Scene {
    /// Extracts the ranking properties from a catalog item.
    pub fn from_item(item: StacItem) -> Result<Self, CatalogError> {
        let nodata = item.number(PROP_NODATA)?;
        let cloud = item.number(PROP_HIGH_CLOUD)?;
        let shadow = item.number(PROP_CLOUD_SHADOW)?;
        let orbit = item.number(PROP_RELATIVE_ORBIT)?;

        let raw_datetime = item.string("datetime")?;
        let datetime = DateTime::parse_from_rfc3339(raw_datetime)
            .map_err(|_| CatalogError::MissingProperty {
                item: item.id.clone(),
                property: "datetime".to_string(),
            })?
            .with_timezone(&Utc);

        Ok(Self {
            good_data_pct: good_data_pct(nodata, cloud, shadow),
            orbit: orbit.max(0.0) as u32,
            datetime,
            item,
        })
    }

    pub fn id(&self) -> &str {
        &self.item.id
    }

    /// The item geometry as lon/lat polygons, if present and readable.
    pub fn footprint(&self) -> Option<MultiPolygon<f64>> {
        self.item.geometry.as_ref().and_then(parse_geojson_polygons)
    }
}

/// Estimated share of usable pixels, in percent.
///
/// The data share `100 - nodata` is reduced by the combined cloud and shadow
/// share.
pub fn good_data_pct(nodata: f64, cloud: f64, shadow: f64) -> f64 {
    let data_pct = 100.0 - nodata;
    data_pct * (1.0 - (cloud + shadow) / 100.0)
}

/// Order in which scenes are composited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortMethod {
    /// Best estimated data share first, interleaved across orbits.
    #[default]
    ValidData,
    /// Earliest acquisition first.
    Oldest,
    /// Latest acquisition first.
    Newest,
    /// Caller-supplied order of item ids.
    Custom,
}

impl SortMethod {
    pub const ALL: [SortMethod; 4] = [
        SortMethod::ValidData,
        SortMethod::Oldest,
        SortMethod::Newest,
        SortMethod::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMethod::ValidData => "valid_data",
            SortMethod::Oldest => "oldest",
            SortMethod::Newest => "newest",
            SortMethod::Custom => "custom",
        }
    }
}

impl fmt::Display for SortMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised sort method name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid sort method: {0}. Must be one of valid_data, oldest, newest, custom")]
pub struct UnknownSortMethod(pub String);

impl FromStr for SortMethod {
    type Err = UnknownSortMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownSortMethod(s.to_string()))
    }
}

/// Orders scenes for compositing.
///
/// `custom_order` is only consulted for [`SortMethod::Custom`]: scenes
/// follow the listed ids and unlisted scenes are dropped.
pub fn sort_scenes(scenes: Vec<Scene>, method: SortMethod, custom_order: &[String]) -> Vec<Scene> {
    match method {
        SortMethod::ValidData => interleave_by_orbit(scenes),
        SortMethod::Oldest => {
            let mut sorted = scenes;
            sorted.sort_by_key(|s| s.datetime);
            sorted
        }
        SortMethod::Newest => {
            let mut sorted = scenes;
            sorted.sort_by(|a, b| b.datetime.cmp(&a.datetime));
            sorted
        }
        SortMethod::Custom => {
            let mut by_id: HashMap<String, Scene> = scenes
                .into_iter()
                .map(|s| (s.item.id.clone(), s))
                .collect();
            custom_order
                .iter()
                .filter_map(|id| by_id.remove(id))
                .collect()
        }
    }
}

/// Sorts by data share, then takes the best remaining scene of each orbit
/// in turn so consecutive scenes come from different swaths.
fn interleave_by_orbit(scenes: Vec<Scene>) -> Vec<Scene> {
    let mut sorted = scenes;
    sorted.sort_by(|a, b| b.good_data_pct.total_cmp(&a.good_data_pct));

    let mut orbit_order: Vec<u32> = Vec::new();
    let mut groups: HashMap<u32, VecDeque<Scene>> = HashMap::new();
    for scene in sorted {
        if !groups.contains_key(&scene.orbit) {
            orbit_order.push(scene.orbit);
        }
        groups.entry(scene.orbit).or_default().push_back(scene);
    }

    let total: usize = groups.values().map(VecDeque::len).sum();
    let mut result = Vec::with_capacity(total);
    while result.len() < total {
        for orbit in &orbit_order {
            if let Some(scene) = groups.get_mut(orbit).and_then(VecDeque::pop_front) {
                result.push(scene);
            }
        }
    }
    result
}
