//! Mosaic orchestration
//!
//! Ties the catalog, masks and compositor together:
//!
//! ```text
//! MosaicRequest ──► validate ──► search + sort ──► per scene:
//!                                                   mask bands (20 m)
//!                                                   output bands (10 m)
//!                                                   composite, progress
//!                                              ──► normalise ──► GeoTIFF | array
//! ```
//!
//! The [`Engine`] carries the collaborators (HTTP, signer, band cache,
//! cloud masker, progress reporter) so the pipeline can be driven against
//! a mock catalog in tests.

mod engine;
mod pipeline;
mod progress;
mod request;
mod types;

pub use engine::{BandFetcher, Engine, SharedHttpClient};
pub use pipeline::{mosaic, MASK_RESOLUTION, OUTPUT_RESOLUTION, VALIDITY_BANDS};
pub use progress::{LogProgress, NoopProgress, ProgressReporter, SharedProgressReporter};
pub use request::{
    MosaicRequest, DEFAULT_BANDS, DEFAULT_NO_DATA_THRESHOLD, VALID_BANDS, VISUAL_BAND,
};
pub use types::{format_progress, MosaicError, MosaicProgress, MosaicResult};
