//! Mosaic command - build a cloud-free mosaic for one tile.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use s2mosaic::composite::MosaicMethod;
use s2mosaic::config::clamp_workers;
use s2mosaic::mosaic::{mosaic, MosaicRequest, MosaicResult, DEFAULT_BANDS, DEFAULT_NO_DATA_THRESHOLD};

use super::common::{MethodArg, SearchArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the mosaic command.
#[derive(Debug, Args)]
pub struct MosaicArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Directory for the GeoTIFF; without it the mosaic profile is printed
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Compositing method
    #[arg(long, value_enum, default_value = "mean")]
    pub method: MethodArg,

    /// Percentile for --method percentile (0-100)
    #[arg(long)]
    pub percentile: Option<f64>,

    /// Bands to composite, comma separated [default: B04,B03,B02,B08]
    #[arg(long, value_delimiter = ',')]
    pub bands: Option<Vec<String>>,

    /// Stop once less than this fraction of the tile lacks data (0-1) [default: 0.01]
    #[arg(long, conflicts_with = "no_threshold")]
    pub no_data_threshold: Option<f64>,

    /// Use every scene instead of stopping at the no-data threshold
    #[arg(long)]
    pub no_threshold: bool,

    /// Keep an existing output file instead of rebuilding it
    #[arg(long)]
    pub no_overwrite: bool,

    /// Store downloaded bands in the band cache
    #[arg(long)]
    pub cache_bands: bool,

    /// Concurrent band downloads [default: from config]
    #[arg(long)]
    pub workers: Option<usize>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl MosaicArgs {
    /// Mosaic request from arguments, with config fallbacks.
    pub fn to_request(&self, default_workers: usize) -> Result<MosaicRequest, CliError> {
        let method = MosaicMethod::parse(self.method.name(), self.percentile)
            .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

        let threshold = if self.no_threshold {
            None
        } else {
            Some(self.no_data_threshold.unwrap_or(DEFAULT_NO_DATA_THRESHOLD))
        };

        let bands = match &self.bands {
            Some(bands) => bands.clone(),
            None => DEFAULT_BANDS.iter().map(|b| b.to_string()).collect(),
        };

        let mut request = self
            .search
            .to_request()?
            .with_mosaic_method(method)
            .with_bands(bands)
            .with_no_data_threshold(threshold)
            .with_overwrite(!self.no_overwrite)
            .with_cache_bands(self.cache_bands)
            .with_max_download_workers(clamp_workers(self.workers.unwrap_or(default_workers)));
        if let Some(dir) = &self.output_dir {
            request = request.with_output_dir(dir);
        }
        Ok(request)
    }
}

/// Run the mosaic command.
pub fn run(args: MosaicArgs) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(args.debug)?;
    runner.log_startup("mosaic");
    let config = runner.config();

    let cache_bands = args.cache_bands || config.cache.enabled;
    let engine = runner.create_engine(cache_bands)?;
    let request = args
        .to_request(engine.download_config().workers())?
        .with_cache_bands(cache_bands);

    println!(
        "Building {} mosaic of {} ({})",
        request.mosaic_method,
        style(&request.grid_id).bold(),
        request.required_bands.join(", ")
    );

    let started = Instant::now();
    let result = mosaic(&request, &engine)?;
    let elapsed = started.elapsed().as_secs_f64();
    info!(elapsed_secs = elapsed, "Mosaic finished");

    match result {
        MosaicResult::Exported(path) => {
            println!(
                "{} {} ({:.1}s)",
                style("Mosaic saved to").green(),
                path.display(),
                elapsed
            );
        }
        MosaicResult::InMemory(output) => {
            println!("{} ({:.1}s)", style("Mosaic built").green(), elapsed);
            println!();
            println!("{}", output.profile);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> MosaicArgs {
        let mut argv = vec!["s2mosaic", "mosaic"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            crate::Command::Mosaic(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let request = parse(&["50HMH", "--start", "2022-01-01", "--months", "3"])
            .to_request(4)
            .unwrap();
        assert_eq!(request.mosaic_method, MosaicMethod::Mean);
        assert_eq!(request.required_bands, vec!["B04", "B03", "B02", "B08"]);
        assert_eq!(request.no_data_threshold, Some(0.01));
        assert!(request.overwrite);
        assert!(request.output_dir.is_none());
        assert_eq!(request.max_download_workers, 4);
    }

    #[test]
    fn test_flags() {
        let request = parse(&[
            "50HMH",
            "--start",
            "2022-06-15",
            "--method",
            "percentile",
            "--percentile",
            "25",
            "--bands",
            "B08,B11",
            "--no-threshold",
            "--no-overwrite",
            "--workers",
            "64",
            "--output-dir",
            "out",
        ])
        .to_request(4)
        .unwrap();
        assert_eq!(request.mosaic_method, MosaicMethod::Percentile(25.0));
        assert_eq!(request.required_bands, vec!["B08", "B11"]);
        assert_eq!(request.no_data_threshold, None);
        assert!(!request.overwrite);
        assert_eq!(request.max_download_workers, 32);
        assert_eq!(request.output_dir, Some(PathBuf::from("out")));
        assert_eq!((request.start_month, request.start_day), (6, 15));
    }

    #[test]
    fn test_percentile_without_value_is_rejected() {
        let args = parse(&["50HMH", "--start", "2022-01-01", "--method", "percentile"]);
        assert!(matches!(
            args.to_request(4),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_threshold_flags_conflict() {
        let result = Cli::try_parse_from([
            "s2mosaic",
            "mosaic",
            "50HMH",
            "--start",
            "2022-01-01",
            "--no-threshold",
            "--no-data-threshold",
            "0.1",
        ]);
        assert!(result.is_err());
    }
}
