use crate::model::StopId;
use crate::table::{Table, write_csv};
use crate::Result;
use rustc_hash::FxHashMap;

/// Stop id -> human-readable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopNames {
    names: FxHashMap<StopId, String>,
}

impl StopNames {
    /// Reads `stop_id`/`stop_name` columns (GTFS `stops.txt`, or a cached copy).
    pub fn from_table(table: &Table) -> Result<Self> {
        let id = table.column("stop_id")?;
        let name = table.column("stop_name")?;
        Ok(table
            .records()
            .iter()
            .map(|r| (r.get(id).to_string(), r.get(name).to_string()))
            .collect())
    }

    pub fn insert(&mut self, stop: impl Into<StopId>, name: impl Into<String>) {
        self.names.insert(stop.into(), name.into());
    }

    pub fn get(&self, stop: &str) -> Option<&str> {
        self.names.get(stop).map(String::as_str)
    }

    /// Display name for `stop`, falling back to the raw id.
    pub fn display<'a>(&'a self, stop: &'a str) -> &'a str {
        match self.get(stop) {
            Some(name) if !name.trim().is_empty() => name,
            _ => stop,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `stop_id,stop_name` CSV, sorted by id so cache files are stable.
    pub fn to_csv(&self) -> Result<String> {
        let mut rows: Vec<_> = self.names.iter().collect();
        rows.sort_unstable();
        write_csv(
            &["stop_id", "stop_name"],
            rows.into_iter().map(|(id, name)| [id.as_str(), name.as_str()]),
        )
    }
}

impl FromIterator<(StopId, String)> for StopNames {
    fn from_iter<I: IntoIterator<Item = (StopId, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
