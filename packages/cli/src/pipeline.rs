//! Runs the stages of a job file in order: POIs, weekly visits, flows.

use std::time::Instant;

use visitor_flows_cli_utils::{IndicatifProgress, MultiProgress};
use visitor_flows_network::FlowJob;
use visitor_flows_patterns_models::WeeklyJob;
use visitor_flows_poi_models::PoiJob;

use crate::config::JobFile;

pub fn extract(multi: &MultiProgress, job: &PoiJob) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::parts_bar(multi, "Extracting POIs");
    let summary = visitor_flows_poi::extract_pois(job, progress.as_ref())?;

    for (table, rows) in &summary.rows_written {
        log::info!("  {table}: {rows} POIs");
    }
    log::info!(
        "Read {} rows from {} parts, skipped {} duplicate place ids",
        summary.rows_scanned,
        summary.parts_read,
        summary.duplicates_skipped
    );
    Ok(())
}

pub fn weekly(multi: &MultiProgress, job: &WeeklyJob) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::files_bar(multi, "Aggregating weekly visits");
    let summary = visitor_flows_patterns::aggregate_weekly_visits(job, progress.as_ref())?;

    log::info!(
        "Read {} pattern rows ({} matched) from {} files and {} panel files",
        summary.pattern_rows,
        summary.matched_rows,
        summary.pattern_files,
        summary.panel_files
    );
    log::info!(
        "Wrote {} of {} weekly rows to {}",
        summary.rows_written,
        summary.weekly_keys,
        job.output.display()
    );
    Ok(())
}

pub fn flows(job: &FlowJob) -> Result<(), Box<dyn std::error::Error>> {
    for path in visitor_flows_network::run_flow_job(job)? {
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

/// Runs every stage present in `job`.
pub fn run(multi: &MultiProgress, job: &JobFile) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let total = job.stage_count();
    let mut step = 0;

    if let Some(pois) = &job.pois {
        step += 1;
        log::info!("[{step}/{total}] Extracting POIs...");
        extract(multi, pois)?;
    }

    if let Some(weekly_job) = &job.weekly {
        step += 1;
        log::info!("[{step}/{total}] Aggregating weekly visits...");
        weekly(multi, weekly_job)?;
    }

    if let Some(flow_job) = &job.flows {
        step += 1;
        log::info!("[{step}/{total}] Building tract flows...");
        flows(flow_job)?;
    }

    log::info!("Job complete in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}
