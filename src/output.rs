//! CSV and log output: run summaries and the flattened stop listing.

use anyhow::Result;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::services::transit_api::Stop;
use crate::stats::RunSummary;

/// Logs a run summary as pretty-printed JSON.
pub fn print_json(summary: &RunSummary) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// Appends one serializable record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// One line of the stop lookup table. A stop contributes one row with the
/// parent columns set, then one row per boarding point with only the
/// `specific_stop_*` columns set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopRow {
    pub stop_id: Option<String>,
    pub stop_name: Option<String>,
    pub code: Option<String>,
    pub distance: Option<f64>,
    pub specific_stop_code: Option<String>,
    pub specific_stop_stop_id: Option<String>,
    pub specific_stop_stop_lat: Option<f64>,
    pub specific_stop_stop_lon: Option<f64>,
    pub specific_stop_stop_name: Option<String>,
}

pub fn stop_rows(stops: &[Stop]) -> Vec<StopRow> {
    let mut rows = Vec::new();
    for stop in stops {
        rows.push(StopRow {
            stop_id: Some(stop.stop_id.clone()),
            stop_name: Some(stop.stop_name.clone()),
            code: stop.code.clone(),
            distance: stop.distance,
            ..Default::default()
        });
        for point in &stop.stop_points {
            rows.push(StopRow {
                specific_stop_code: point.code.clone(),
                specific_stop_stop_id: Some(point.stop_id.clone()),
                specific_stop_stop_lat: point.stop_lat,
                specific_stop_stop_lon: point.stop_lon,
                specific_stop_stop_name: Some(point.stop_name.clone()),
                ..Default::default()
            });
        }
    }
    rows
}

/// Writes the stop lookup table, replacing any existing file.
pub fn write_stop_rows(path: &Path, rows: &[StopRow]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "Wrote stop listing");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::transit_api::StopPoint;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("{}_{}", std::process::id(), name))
    }

    fn stop() -> Stop {
        Stop {
            stop_id: "IT".into(),
            stop_name: "Illinois Terminal".into(),
            code: Some("MTD3121".into()),
            distance: Some(0.0),
            stop_points: vec![
                StopPoint {
                    stop_id: "IT:1".into(),
                    stop_name: "Illinois Terminal (Platform A)".into(),
                    code: Some("MTD3121".into()),
                    stop_lat: Some(40.1159),
                    stop_lon: Some(-88.2413),
                },
                StopPoint {
                    stop_id: "IT:2".into(),
                    stop_name: "Illinois Terminal (Platform B)".into(),
                    code: None,
                    stop_lat: None,
                    stop_lon: None,
                },
            ],
        }
    }

    #[test]
    fn test_print_json_does_not_panic() {
        let summary = RunSummary::default();
        print_json(&summary).unwrap();
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("stop_delay_collector_summary.csv");
        let _ = fs::remove_file(&path);

        let summary = RunSummary::default();
        append_record(&path, &summary).unwrap();
        append_record(&path, &summary).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("departures_logged")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_stop_rows_flatten_points() {
        let rows = stop_rows(&[stop()]);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].stop_id.as_deref(), Some("IT"));
        assert!(rows[0].specific_stop_stop_id.is_none());

        assert!(rows[1].stop_id.is_none());
        assert_eq!(rows[1].specific_stop_stop_id.as_deref(), Some("IT:1"));
        assert_eq!(rows[1].specific_stop_stop_lat, Some(40.1159));
        assert_eq!(rows[2].specific_stop_code, None);
    }

    #[test]
    fn test_write_stop_rows_round_trips_through_csv() {
        let path = temp_path("stop_delay_collector_stops.csv");
        let rows = stop_rows(&[stop()]);
        write_stop_rows(&path, &rows).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let read: Vec<StopRow> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(read, rows);

        fs::remove_file(&path).unwrap();
    }
}
