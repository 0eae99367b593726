//! Scenes command - list the scenes a mosaic would use, in order.

use clap::Args;
use console::style;

use s2mosaic::scene::Scene;

use super::common::SearchArgs;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the scenes command.
#[derive(Debug, Args)]
pub struct ScenesArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Run the scenes command.
pub fn run(args: ScenesArgs) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(args.debug)?;
    runner.log_startup("scenes");

    let request = args.search.to_request()?;
    let engine = runner.create_engine(false)?;
    let scenes = engine.find_scenes(&request)?;

    println!(
        "{} scenes for {} ordered by {}",
        scenes.len(),
        style(&request.grid_id).bold(),
        request.sort_method
    );
    println!();
    println!("{}", header());
    for (index, scene) in scenes.iter().enumerate() {
        println!("{}", format_row(index + 1, scene));
    }
    Ok(())
}

fn header() -> String {
    format!(
        "{:>4}  {:<10}  {:>5}  {:>8}  {}",
        "#", "Date", "Orbit", "Good %", "Item"
    )
}

fn format_row(position: usize, scene: &Scene) -> String {
    format!(
        "{:>4}  {:<10}  {:>5}  {:>8.2}  {}",
        position,
        scene.datetime.format("%Y-%m-%d"),
        scene.orbit,
        scene.good_data_pct,
        scene.id()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use s2mosaic::catalog::StacItem;

    #[test]
    fn test_format_row() {
        let item: StacItem = serde_json::from_value(serde_json::json!({
            "id": "S2B_MSIL2A_20220105T020449_R017_T50HMH",
        }))
        .unwrap();
        let scene = Scene {
            item,
            orbit: 17,
            good_data_pct: 87.456,
            datetime: Utc.with_ymd_and_hms(2022, 1, 5, 2, 4, 49).unwrap(),
        };
        assert_eq!(
            format_row(3, &scene),
            "   3  2022-01-05     17     87.46  S2B_MSIL2A_20220105T020449_R017_T50HMH"
        );
    }
}
