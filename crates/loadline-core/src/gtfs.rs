//! GTFS-derived stop positions and names, with an on-disk cache.
//!
//! Positions are the mean `stop_sequence` of each stop over every trip of a route in
//! one direction, after joining `stop_times.txt` -> `trips.txt` -> `routes.txt`.

use crate::names::StopNames;
use crate::positions::GtfsPositions;
use crate::table::{Table, write_csv};
use crate::{Error, Result};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ROUTE_STOPS_AVG_FILE: &str = "route_stops_avg.csv";
pub const STOP_NAMES_FILE: &str = "stop_names.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopSequenceAverage {
    pub stop_id: String,
    pub route_short_name: String,
    pub direction_id: String,
    pub stop_sequence_avg: f64,
}

impl StopSequenceAverage {
    pub fn new(
        stop_id: impl Into<String>,
        route_short_name: impl Into<String>,
        direction_id: impl Into<String>,
        stop_sequence_avg: f64,
    ) -> Self {
        Self {
            stop_id: stop_id.into(),
            route_short_name: route_short_name.into(),
            direction_id: direction_id.into(),
            stop_sequence_avg,
        }
    }
}

/// Joins the three GTFS tables and averages `stop_sequence` per (stop, route, direction).
///
/// Stop times whose trip or route is unknown are skipped. Averages are rounded to two
/// decimals and returned in first-seen order.
pub fn average_stop_sequences(
    stop_times: &Table,
    trips: &Table,
    routes: &Table,
) -> Result<Vec<StopSequenceAverage>> {
    let route_id = routes.column("route_id")?;
    let short_name = routes.column("route_short_name")?;
    let short_names: FxHashMap<&str, &str> = routes
        .records()
        .iter()
        .map(|r| (r.get(route_id), r.get(short_name)))
        .collect();

    let trip_id = trips.column("trip_id")?;
    let trip_route = trips.column("route_id")?;
    let direction = trips.column("direction_id")?;
    let trip_keys: FxHashMap<&str, (&str, &str)> = trips
        .records()
        .iter()
        .filter_map(|r| {
            let short = short_names.get(r.get(trip_route))?;
            Some((r.get(trip_id), (*short, r.get(direction))))
        })
        .collect();

    let st_trip = stop_times.column("trip_id")?;
    let st_stop = stop_times.column("stop_id")?;
    let st_seq = stop_times.column("stop_sequence")?;

    let mut sums: IndexMap<(&str, &str, &str), (u64, u64)> = IndexMap::new();
    let mut skipped = 0usize;
    for record in stop_times.records() {
        let Some(&(route, dir)) = trip_keys.get(record.get(st_trip)) else {
            skipped += 1;
            continue;
        };
        let raw = record.get(st_seq);
        let seq = raw.trim().parse::<u64>().map_err(|_| Error::CsvParse {
            line: record.line,
            message: format!("invalid stop_sequence {raw:?}"),
        })?;
        let entry = sums.entry((record.get(st_stop), route, dir)).or_insert((0, 0));
        entry.0 += seq;
        entry.1 += 1;
    }
    if skipped > 0 {
        tracing::debug!(skipped, "stop times without a matching trip or route");
    }

    Ok(sums
        .into_iter()
        .map(|((stop, route, dir), (sum, count))| {
            let mean = sum as f64 / count as f64;
            StopSequenceAverage::new(stop, route, dir, (mean * 100.0).round() / 100.0)
        })
        .collect())
}

/// Reads `name` from `gtfs_dir`, failing with [`Error::MissingGtfsFile`] when absent.
pub fn read_gtfs_table(gtfs_dir: &Path, name: &str) -> Result<Table> {
    let path = gtfs_dir.join(name);
    if !path.is_file() {
        return Err(Error::MissingGtfsFile { path });
    }
    Table::read(&path)
}

/// Cache directory for derived GTFS lookups.
#[derive(Debug, Clone)]
pub struct GtfsCache {
    dir: PathBuf,
}

impl GtfsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default cache location inside the GTFS directory.
    pub fn in_gtfs_dir(gtfs_dir: &Path) -> Self {
        Self::new(gtfs_dir.join("loadline"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn averages_path(&self) -> PathBuf {
        self.dir.join(ROUTE_STOPS_AVG_FILE)
    }

    pub fn names_path(&self) -> PathBuf {
        self.dir.join(STOP_NAMES_FILE)
    }

    /// Loads cached lookups, computing and writing any that are missing.
    pub fn load_or_build(&self, gtfs_dir: &Path) -> Result<(GtfsPositions, StopNames)> {
        let averages = if self.averages_path().is_file() {
            tracing::debug!(path = %self.averages_path().display(), "using cached stop sequence averages");
            read_averages(&Table::read(&self.averages_path())?)?
        } else {
            let averages = build_averages(gtfs_dir)?;
            self.write(&self.averages_path(), &averages_to_csv(&averages)?)?;
            averages
        };

        let names = if self.names_path().is_file() {
            StopNames::from_table(&Table::read(&self.names_path())?)?
        } else {
            let names = StopNames::from_table(&read_gtfs_table(gtfs_dir, "stops.txt")?)?;
            self.write(&self.names_path(), &names.to_csv()?)?;
            names
        };

        Ok((averages.into_iter().collect(), names))
    }

    /// Recomputes both lookups from `gtfs_dir`, replacing any cached copies.
    pub fn rebuild(&self, gtfs_dir: &Path) -> Result<(usize, usize)> {
        let averages = build_averages(gtfs_dir)?;
        let names = StopNames::from_table(&read_gtfs_table(gtfs_dir, "stops.txt")?)?;
        self.write(&self.averages_path(), &averages_to_csv(&averages)?)?;
        self.write(&self.names_path(), &names.to_csv()?)?;
        Ok((averages.len(), names.len()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        std::fs::write(path, contents).map_err(|e| Error::io(path, e))?;
        tracing::info!(path = %path.display(), "wrote GTFS cache file");
        Ok(())
    }
}

fn build_averages(gtfs_dir: &Path) -> Result<Vec<StopSequenceAverage>> {
    if !gtfs_dir.is_dir() {
        return Err(Error::MissingGtfsFile {
            path: gtfs_dir.to_path_buf(),
        });
    }
    // Check every input up front so a missing file fails before the slow join.
    for name in ["stop_times.txt", "trips.txt", "routes.txt", "stops.txt"] {
        let path = gtfs_dir.join(name);
        if !path.is_file() {
            return Err(Error::MissingGtfsFile { path });
        }
    }
    tracing::info!(dir = %gtfs_dir.display(), "averaging GTFS stop sequences");
    average_stop_sequences(
        &read_gtfs_table(gtfs_dir, "stop_times.txt")?,
        &read_gtfs_table(gtfs_dir, "trips.txt")?,
        &read_gtfs_table(gtfs_dir, "routes.txt")?,
    )
}

fn averages_to_csv(averages: &[StopSequenceAverage]) -> Result<String> {
    write_csv(
        &["stop_id", "route_short_name", "direction_id", "stop_sequence_avg"],
        averages.iter().map(|avg| {
            [
                avg.stop_id.clone(),
                avg.route_short_name.clone(),
                avg.direction_id.clone(),
                avg.stop_sequence_avg.to_string(),
            ]
        }),
    )
}

fn read_averages(table: &Table) -> Result<Vec<StopSequenceAverage>> {
    let stop = table.column("stop_id")?;
    let route = table.column("route_short_name")?;
    let dir = table.column("direction_id")?;
    let avg = table.column("stop_sequence_avg")?;
    table
        .records()
        .iter()
        .map(|r| {
            let raw = r.get(avg);
            let value = raw.trim().parse::<f64>().map_err(|_| Error::CsvParse {
                line: r.line,
                message: format!("invalid stop_sequence_avg {raw:?}"),
            })?;
            Ok(StopSequenceAverage::new(r.get(stop), r.get(route), r.get(dir), value))
        })
        .collect()
}
