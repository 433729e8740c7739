#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `visitor_flows`: POI extraction, county weekly visits, and tract flows
//! over vendor POI and weekly patterns archives.
//!
//! Each stage has its own subcommand; `run` chains them from a TOML job
//! file. Logging goes through [`visitor_flows_cli_utils::init_logger`] so
//! log lines and progress bars share the terminal.

mod config;
mod pipeline;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use visitor_flows_geography_models::{CountyFips, fips};
use visitor_flows_network::output::FlowFormat;
use visitor_flows_network::{DEFAULT_DESTINATION_OFFSET, FlowJob};
use visitor_flows_patterns_models::WeeklyJob;
use visitor_flows_poi_models::{GeographyFilter, GeographyScale, NaicsFilter, PoiJob};

use crate::config::JobFile;

#[derive(Parser)]
#[command(
    name = "visitor_flows",
    about = "POI extraction and visitor flow aggregation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract core POIs into one CSV per NAICS code
    Pois {
        /// Comma-separated NAICS codes (prefix match), or "all"
        #[arg(long, value_delimiter = ',', required = true)]
        codes: Vec<String>,
        /// Comma-separated state abbreviations (e.g. "TX,LA")
        #[arg(long, value_delimiter = ',', conflicts_with = "place")]
        states: Vec<String>,
        /// Geography scale used with --place: state, state-city, or state-city-keys
        #[arg(long, default_value = "state")]
        scale: GeographyScale,
        /// Place filter entry NAME=STATE_FIPS (repeatable)
        #[arg(long, value_parser = parse_place)]
        place: Vec<(String, String)>,
        /// Directory holding the core POI partitions
        #[arg(long)]
        core_poi_dir: PathBuf,
        /// Partition name (repeatable, processed in order)
        #[arg(long = "partition", required = true)]
        partitions: Vec<String>,
        /// Directory for the <code>.csv tables
        #[arg(long)]
        output_dir: PathBuf,
    },
    /// Aggregate weekly visits for extracted POIs within one county
    Weekly {
        /// Directory holding patterns/ and home_panel_summary/
        #[arg(long)]
        base_dir: PathBuf,
        /// Directory holding the extracted <code>.csv tables
        #[arg(long)]
        poi_dir: PathBuf,
        /// Comma-separated table names (the codes used for extraction)
        #[arg(long, value_delimiter = ',', required = true)]
        codes: Vec<String>,
        /// Partition subdirectory (repeatable)
        #[arg(long = "partition", required = true)]
        partitions: Vec<String>,
        /// 5-digit county FIPS (e.g. 48201)
        #[arg(long)]
        county: CountyFips,
        /// Output CSV path
        #[arg(long)]
        output: PathBuf,
    },
    /// Build tract-to-tract visitor flows for one week
    Flows {
        /// County weekly visits table
        #[arg(long)]
        visits: PathBuf,
        /// Tract centroid CSV with GEOID, LON, LAT columns
        #[arg(long)]
        centroids: PathBuf,
        /// 5-digit county FIPS of the home block groups to keep
        #[arg(long)]
        county: CountyFips,
        /// date_range_end of the week, YYYY-MM-DD
        #[arg(long)]
        week_end: NaiveDate,
        /// Destination label used in column names (e.g. Hospitals)
        #[arg(long)]
        name: String,
        /// Output path prefix
        #[arg(long)]
        output_prefix: PathBuf,
        /// Degrees added to destination centroids
        #[arg(long, default_value_t = DEFAULT_DESTINATION_OFFSET)]
        offset: f64,
        /// Write the Kepler.gl table instead of the full and network tables
        #[arg(long)]
        kepler: bool,
    },
    /// Run the stages configured in a TOML job file
    Run {
        #[arg(long)]
        config: PathBuf,
    },
    /// List state FIPS codes and abbreviations
    States,
}

fn parse_place(s: &str) -> Result<(String, String), String> {
    let (name, code) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=STATE_FIPS, got {s:?}"))?;
    let (name, code) = (name.trim(), code.trim());
    if name.is_empty() || code.is_empty() {
        return Err(format!("expected NAME=STATE_FIPS, got {s:?}"));
    }
    Ok((name.to_string(), code.to_string()))
}

fn geography(
    states: &[String],
    scale: GeographyScale,
    place: Vec<(String, String)>,
) -> Result<GeographyFilter, Box<dyn std::error::Error>> {
    if !place.is_empty() {
        let places: BTreeMap<String, String> = place.into_iter().collect();
        return Ok(GeographyFilter::new(scale, places));
    }
    if states.is_empty() {
        return Err("either --states or --place is required".into());
    }
    Ok(GeographyFilter::states(states)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = visitor_flows_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Pois {
            codes,
            states,
            scale,
            place,
            core_poi_dir,
            partitions,
            output_dir,
        } => {
            let job = PoiJob {
                naics: NaicsFilter::from_codes(&codes)?,
                geography: geography(&states, scale, place)?,
                core_poi_dir,
                partitions,
                output_dir,
            };
            pipeline::extract(&multi, &job)?;
        }
        Commands::Weekly {
            base_dir,
            poi_dir,
            codes,
            partitions,
            county,
            output,
        } => {
            let job = WeeklyJob {
                base_dir,
                poi_dir,
                naics: codes,
                partitions,
                county,
                output,
            };
            pipeline::weekly(&multi, &job)?;
        }
        Commands::Flows {
            visits,
            centroids,
            county,
            week_end,
            name,
            output_prefix,
            offset,
            kepler,
        } => {
            let job = FlowJob {
                visits,
                centroids,
                county,
                week_end,
                name,
                output_prefix,
                destination_offset: offset,
                format: if kepler {
                    FlowFormat::Kepler
                } else {
                    FlowFormat::Full
                },
            };
            pipeline::flows(&job)?;
        }
        Commands::Run { config } => {
            let job = JobFile::load(&config)?;
            log::info!("Loaded {} ({} stages)", config.display(), job.stage_count());
            pipeline::run(&multi, &job)?;
        }
        Commands::States => {
            println!("{:<6} {:<6} NAME", "FIPS", "ABBR");
            println!("{}", "-".repeat(40));
            for (code, abbr, name) in fips::STATES {
                println!("{code:<6} {abbr:<6} {name}");
            }
        }
    }

    Ok(())
}
