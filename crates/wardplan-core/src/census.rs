//! Daily census records: the normalized demand series every analysis runs on.

use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%Y"];

#[derive(Error, Debug)]
pub enum CensusError {
    #[error("Failed to read census file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Line {line}: unrecognized date '{value}'")]
    InvalidDate { line: u64, value: String },
    #[error("{field} on {date} must be a non-negative count, got {value}")]
    InvalidCount {
        date: NaiveDate,
        field: &'static str,
        value: i64,
    },
    #[error("Duplicate census entry for {0}")]
    DuplicateDate(NaiveDate),
}

/// Demand for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyDemand {
    pub date: NaiveDate,
    /// Patients who must not share a room
    pub single_demand: u32,
    /// Patients who may share a room
    pub double_demand: u32,
    /// Rooms out of service, each removing a double room's worth of beds
    #[serde(default)]
    pub closed_rooms: u32,
}

impl DailyDemand {
    pub fn new(date: NaiveDate, single_demand: u32, double_demand: u32) -> Self {
        Self {
            date,
            single_demand,
            double_demand,
            closed_rooms: 0,
        }
    }

    pub fn with_closed_rooms(mut self, closed_rooms: u32) -> Self {
        self.closed_rooms = closed_rooms;
        self
    }

    pub fn total_demand(&self) -> u32 {
        self.single_demand + self.double_demand
    }

    /// Identical demand profiles produce identical optimizer rows
    pub fn profile(&self) -> (u32, u32) {
        (self.single_demand, self.double_demand)
    }
}

/// One raw CSV row. Column names follow the normalized export, with the
/// census workbook's own headers accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct CensusRecord {
    #[serde(alias = "Date")]
    pub date: String,
    #[serde(alias = "Total Single Room Patients")]
    pub single_demand: i64,
    #[serde(alias = "Double Room Patients")]
    pub double_demand: i64,
    #[serde(default, alias = "closed_beds", alias = "Closed Rooms")]
    pub closed_rooms: Option<i64>,
}

impl CensusRecord {
    pub fn into_demand(self, line: u64) -> Result<DailyDemand, CensusError> {
        let date = parse_date(self.date.trim()).ok_or_else(|| CensusError::InvalidDate {
            line,
            value: self.date.clone(),
        })?;

        let count = |field: &'static str, value: i64| {
            u32::try_from(value).map_err(|_| CensusError::InvalidCount { date, field, value })
        };

        Ok(DailyDemand {
            date,
            single_demand: count("single_demand", self.single_demand)?,
            double_demand: count("double_demand", self.double_demand)?,
            closed_rooms: count("closed_rooms", self.closed_rooms.unwrap_or(0))?,
        })
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Date-ordered daily demand with unique dates
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DemandSeries {
    days: Vec<DailyDemand>,
}

impl DemandSeries {
    /// Sorts by date and rejects duplicate dates
    pub fn new(mut days: Vec<DailyDemand>) -> Result<Self, CensusError> {
        days.sort_by_key(|d| d.date);
        if let Some(pair) = days.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(CensusError::DuplicateDate(pair[0].date));
        }
        Ok(Self { days })
    }

    pub fn days(&self) -> &[DailyDemand] {
        &self.days
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DailyDemand> {
        self.days.iter()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }

    /// Keep only days in the given calendar years
    pub fn filter_years(&self, years: &[i32]) -> Self {
        Self {
            days: self
                .days
                .iter()
                .filter(|d| years.contains(&d.date.year()))
                .copied()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DemandSeries {
    type Item = &'a DailyDemand;
    type IntoIter = std::slice::Iter<'a, DailyDemand>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.iter()
    }
}

/// Read a headered census CSV from disk
pub fn read_csv(path: impl AsRef<Path>) -> Result<DemandSeries, CensusError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| CensusError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let series = from_reader(file)?;
    tracing::info!("Loaded {} days of census data from {}", series.len(), path.display());
    Ok(series)
}

pub fn from_reader<R: Read>(reader: R) -> Result<DemandSeries, CensusError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut days = Vec::new();
    let mut raw = csv::StringRecord::new();
    while reader.read_record(&mut raw)? {
        let line = raw.position().map_or(0, |p| p.line());
        let record: CensusRecord = raw.deserialize(Some(&headers))?;
        days.push(record.into_demand(line)?);
    }

    DemandSeries::new(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_read_normalized_csv() {
        let csv = "date,single_demand,double_demand,closed_rooms\n\
                   2024-01-02,4,12,1\n\
                   2024-01-01,3,10,\n";
        let series = from_reader(csv.as_bytes()).unwrap();

        assert_eq!(series.len(), 2);
        // sorted on load
        assert_eq!(series.days()[0], DailyDemand::new(date(2024, 1, 1), 3, 10));
        assert_eq!(
            series.days()[1],
            DailyDemand::new(date(2024, 1, 2), 4, 12).with_closed_rooms(1)
        );
    }

    #[test]
    fn test_closed_column_optional_and_aliased() {
        let without = "date,single_demand,double_demand\n2024-03-01,1,2\n";
        let series = from_reader(without.as_bytes()).unwrap();
        assert_eq!(series.days()[0].closed_rooms, 0);

        let aliased = "date,single_demand,double_demand,closed_beds\n2024-03-01,1,2,3\n";
        let series = from_reader(aliased.as_bytes()).unwrap();
        assert_eq!(series.days()[0].closed_rooms, 3);
    }

    #[test]
    fn test_workbook_headers() {
        let csv = "Date,Total Single Room Patients,Double Room Patients,Closed Rooms\n\
                   01/15/2023,6,14,0\n";
        let series = from_reader(csv.as_bytes()).unwrap();
        assert_eq!(series.days()[0], DailyDemand::new(date(2023, 1, 15), 6, 14));
    }

    #[test]
    fn test_negative_count_names_date_and_field() {
        let csv = "date,single_demand,double_demand\n2024-01-05,2,-1\n";
        let err = from_reader(csv.as_bytes()).unwrap_err();
        match err {
            CensusError::InvalidCount { date: d, field, value } => {
                assert_eq!(d, date(2024, 1, 5));
                assert_eq!(field, "double_demand");
                assert_eq!(value, -1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_date_reports_line() {
        let csv = "date,single_demand,double_demand\n2024-01-05,2,1\nnot-a-date,1,1\n";
        let err = from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CensusError::InvalidDate { line: 3, .. }), "{err}");
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let csv = "date,single_demand,double_demand\n2024-01-05,2,1\n2024-01-05,1,1\n";
        let err = from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CensusError::DuplicateDate(d) if d == date(2024, 1, 5)));
    }

    #[test]
    fn test_filter_years() {
        let series = DemandSeries::new(vec![
            DailyDemand::new(date(2022, 12, 31), 1, 1),
            DailyDemand::new(date(2023, 1, 1), 1, 1),
            DailyDemand::new(date(2024, 6, 1), 1, 1),
        ])
        .unwrap();

        let recent = series.filter_years(&[2023, 2024]);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent.first_date(), Some(date(2023, 1, 1)));
    }

    #[test]
    fn test_read_csv_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("census.csv");
        std::fs::write(&path, "date,single_demand,double_demand\n2024-02-01,5,9\n").unwrap();

        let series = read_csv(&path).unwrap();
        assert_eq!(series.days()[0].total_demand(), 14);
    }
}
