//! Plain CSV and JSON dumps of evaluation results.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::analysis::PeriodTrend;
use crate::evaluator::EvaluationSeries;
use crate::sweep::SweepReport;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn create_file(path: impl AsRef<Path>) -> Result<File, ReportError> {
    let path = path.as_ref();
    File::create(path).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// One row per day, in series order
pub fn write_outcomes_csv<W: Write>(writer: W, series: &EvaluationSeries) -> Result<(), ReportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for outcome in series.outcomes() {
        csv.serialize(outcome)?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[derive(Serialize)]
struct SweepRow {
    single_rooms: u32,
    double_rooms: u32,
    wasted_beds: u64,
    wasted_potential: u64,
    weighted_waste: f64,
    cumulative_efficiency: f64,
    mean_daily_efficiency: f64,
    over_capacity_days: usize,
    turned_away: u64,
    best: bool,
}

pub fn write_sweep_csv<W: Write>(writer: W, report: &SweepReport) -> Result<(), ReportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for candidate in &report.candidates {
        let summary = &candidate.summary;
        csv.serialize(SweepRow {
            single_rooms: candidate.configuration.single_rooms(),
            double_rooms: candidate.configuration.double_rooms(),
            wasted_beds: summary.total_wasted_beds,
            wasted_potential: summary.total_wasted_potential,
            weighted_waste: summary.weighted_waste,
            cumulative_efficiency: summary.cumulative_efficiency,
            mean_daily_efficiency: summary.mean_daily_efficiency,
            over_capacity_days: summary.over_capacity_days,
            turned_away: summary.total_turned_away,
            best: candidate.configuration == report.best.configuration,
        })?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_trends_csv<W: Write>(writer: W, trends: &[PeriodTrend]) -> Result<(), ReportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for trend in trends {
        csv.serialize(trend)?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(value)?)
}
