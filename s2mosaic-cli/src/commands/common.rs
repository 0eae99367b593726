//! Common types and utilities shared across CLI commands.

use chrono::{Datelike, NaiveDate};
use clap::{Args, ValueEnum};
use serde_json::{Map, Value};

use s2mosaic::dates::Period;
use s2mosaic::mosaic::MosaicRequest;
use s2mosaic::scene::SortMethod;

use crate::error::CliError;

/// Scene search arguments shared by `mosaic` and `scenes`.
#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    /// Sentinel-2 grid tile, e.g. 50HMH
    pub grid_id: String,

    /// First acquisition day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start: NaiveDate,

    /// Years added to the start date
    #[arg(long, default_value_t = 0)]
    pub years: u32,

    /// Months added to the start date
    #[arg(long, default_value_t = 0)]
    pub months: u32,

    /// Days added to the start date
    #[arg(long, default_value_t = 0)]
    pub days: u32,

    /// Scene order: valid_data, oldest, newest or custom
    #[arg(long, default_value = "valid_data")]
    pub sort: SortMethod,

    /// Item ids in compositing order (required by --sort custom)
    #[arg(long, value_delimiter = ',')]
    pub scene_order: Option<Vec<String>>,

    /// Extra STAC query term as KEY=JSON, e.g. 'eo:cloud_cover={"lt":50}'
    #[arg(long = "query", value_name = "KEY=JSON")]
    pub queries: Vec<String>,
}

impl SearchArgs {
    /// Request carrying the search parameters; mosaic options keep their
    /// defaults.
    pub fn to_request(&self) -> Result<MosaicRequest, CliError> {
        let mut request = MosaicRequest::new(&self.grid_id, self.start.year())
            .with_start(self.start.month(), self.start.day())
            .with_duration(Period::new(self.years, self.months, self.days))
            .with_sort_method(self.sort)
            .with_additional_query(parse_queries(&self.queries)?);
        if let Some(order) = &self.scene_order {
            request = request.with_scene_order(order.iter().cloned());
        }
        Ok(request)
    }
}

/// Mosaic method selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum MethodArg {
    /// Average of all clear observations
    Mean,
    /// First clear observation in scene order
    First,
    /// Per-pixel percentile (requires --percentile)
    Percentile,
    /// Deprecated: 50th percentile
    Median,
}

impl MethodArg {
    pub fn name(&self) -> &'static str {
        match self {
            MethodArg::Mean => "mean",
            MethodArg::First => "first",
            MethodArg::Percentile => "percentile",
            MethodArg::Median => "median",
        }
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a date in YYYY-MM-DD form", value))
}

/// Parses `KEY=JSON` query terms into a STAC query object.
pub fn parse_queries(terms: &[String]) -> Result<Map<String, Value>, CliError> {
    let mut query = Map::new();
    for term in terms {
        let (key, json) = term.split_once('=').ok_or_else(|| {
            CliError::InvalidArgument(format!("query '{}' must look like KEY=JSON", term))
        })?;
        let value: Value = serde_json::from_str(json).map_err(|e| {
            CliError::InvalidArgument(format!("query '{}' has invalid JSON: {}", key, e))
        })?;
        query.insert(key.trim().to_string(), value);
    }
    Ok(query)
}
