//! s2mosaic - Cloud-free Sentinel-2 mosaics
//!
//! This library searches the Planetary Computer STAC catalog for Sentinel-2
//! L2A scenes over one tiling-grid tile, masks clouds and no-data pixels, and
//! composites the remaining observations into a single image.
//!
//! # High-Level API
//!
//! The [`mosaic`] module provides the entry point:
//!
//! ```ignore
//! use s2mosaic::config::ConfigFile;
//! use s2mosaic::dates::Period;
//! use s2mosaic::mosaic::{mosaic, Engine, MosaicRequest, MosaicResult};
//!
//! let engine = Engine::from_config(&ConfigFile::load()?)?;
//! let request = MosaicRequest::new("50HMH", 2022)
//!     .with_duration(Period::new(0, 3, 0))
//!     .with_output_dir("mosaics");
//!
//! if let MosaicResult::Exported(path) = mosaic(&request, &engine)? {
//!     println!("Wrote {}", path.display());
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod composite;
pub mod config;
pub mod dates;
pub mod grid;
pub mod logging;
pub mod mask;
pub mod mosaic;
pub mod projection;
pub mod raster;
pub mod scene;

/// Version of the s2mosaic library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
