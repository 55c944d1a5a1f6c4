//! CSV telemetry and JSON run-summary export.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::ems::EmsConfig;
use crate::sim::kpi::KpiReport;
use crate::sim::types::StepResult;

/// Column header for CSV telemetry export.
const HEADER: &str = "timestep,time_hr,grid_w,pv_w,district_feed_w,appliances_w,residents_w,\
                       heat_pump_w,dhw_w,car_w,battery_target_w,battery_w,battery_soc,\
                       total_consumption_w,indoor_offset_c,space_heating_offset_c,dhw_offset_c,\
                       iterations,converged,tie_rounds";

/// Exports simulation results to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(results, io::BufWriter::new(file))
}

/// Writes simulation results as CSV to any writer.
///
/// Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in results {
        wtr.write_record(&[
            r.timestep.to_string(),
            format!("{:.2}", r.time_hr),
            format!("{:.3}", r.grid_w),
            format!("{:.3}", r.pv_w),
            format!("{:.3}", r.district_feed_w),
            format!("{:.3}", r.appliances_w),
            format!("{:.3}", r.residents_w),
            format!("{:.3}", r.heat_pump_w),
            format!("{:.3}", r.dhw_w),
            format!("{:.3}", r.car_w),
            format!("{:.3}", r.battery_target_w),
            format!("{:.3}", r.battery_w),
            format!("{:.4}", r.battery_soc),
            format!("{:.3}", r.total_consumption_w),
            format!("{:.2}", r.indoor_offset_c),
            format!("{:.2}", r.space_heating_offset_c),
            format!("{:.2}", r.dhw_offset_c),
            r.iterations.to_string(),
            r.converged.to_string(),
            r.tie_rounds.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Run metadata and KPIs written as the JSON summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    /// Preset name or scenario file path.
    pub scenario: &'a str,
    pub seed: u64,
    pub steps: usize,
    pub ems: EmsConfig,
    pub kpi: &'a KpiReport,
}

/// Exports the run summary as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if file creation, serialization or writing fails.
pub fn export_summary(summary: &RunSummary<'_>, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_summary(summary, io::BufWriter::new(file))
}

/// Writes the run summary as pretty-printed JSON to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_summary(summary: &RunSummary<'_>, mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writeln!(writer)?;
    writer.flush()
}
