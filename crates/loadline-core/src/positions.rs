//! External stop positions used to order stops along a route.

use crate::gtfs::StopSequenceAverage;
use crate::model::StopId;
use crate::names::StopNames;
use crate::table::Table;
use crate::Result;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Numeric position of a stop along a route; only the relative order matters.
///
/// Implementations are built once and then shared read-only across diagrams.
pub trait PositionSource {
    fn position(&self, stop: &str, route: &str, direction_code: &str) -> Option<f64>;
}

/// Positions from a hand-written file, applying to every route and direction.
#[derive(Debug, Clone, Default)]
pub struct ManualPositions {
    positions: FxHashMap<StopId, f64>,
    names: StopNames,
}

impl ManualPositions {
    /// Reads `stop_id`, `stop_sequence` and the optional `stop_name` columns.
    pub fn from_table(table: &Table) -> Result<Self> {
        let id = table.column("stop_id")?;
        let seq = table.column("stop_sequence")?;
        let name = table.column_opt("stop_name");

        let mut out = Self::default();
        for record in table.records() {
            let stop = record.get(id);
            let raw = record.get(seq);
            match raw.trim().parse::<f64>() {
                Ok(pos) if pos.is_finite() => {
                    out.positions.insert(stop.to_string(), pos);
                }
                _ => {
                    tracing::warn!(line = record.line, stop, value = raw, "ignoring unparseable stop_sequence");
                    continue;
                }
            }
            if let Some(name) = name {
                out.names.insert(stop, record.get(name));
            }
        }
        tracing::debug!(stops = out.positions.len(), "loaded manual stop positions");
        Ok(out)
    }

    pub fn read(path: &Path) -> Result<Self> {
        Self::from_table(&Table::read(path)?)
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            positions: pairs
                .into_iter()
                .map(|(s, p)| (s.to_string(), p))
                .collect(),
            names: StopNames::default(),
        }
    }

    pub fn names(&self) -> &StopNames {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl PositionSource for ManualPositions {
    fn position(&self, stop: &str, _route: &str, _direction_code: &str) -> Option<f64> {
        self.positions.get(stop).copied()
    }
}

/// Average GTFS `stop_sequence` per (route short name, direction id, stop).
#[derive(Debug, Clone, Default)]
pub struct GtfsPositions {
    by_route: FxHashMap<String, FxHashMap<String, FxHashMap<StopId, f64>>>,
}

impl GtfsPositions {
    pub fn len(&self) -> usize {
        self.by_route
            .values()
            .flat_map(FxHashMap::values)
            .map(FxHashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<StopSequenceAverage> for GtfsPositions {
    fn from_iter<I: IntoIterator<Item = StopSequenceAverage>>(iter: I) -> Self {
        let mut out = Self::default();
        for avg in iter {
            out.by_route
                .entry(avg.route_short_name)
                .or_default()
                .entry(avg.direction_id)
                .or_default()
                .insert(avg.stop_id, avg.stop_sequence_avg);
        }
        out
    }
}

impl PositionSource for GtfsPositions {
    fn position(&self, stop: &str, route: &str, direction_code: &str) -> Option<f64> {
        self.by_route
            .get(route)?
            .get(direction_code)?
            .get(stop)
            .copied()
    }
}
