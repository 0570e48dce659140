//! Definitions documents: column bindings, row filters, direction codes, default flags/paths.

use crate::table::Table;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ROUTE: &str = "route";
pub const DIRECTION: &str = "direction";
pub const ORIGIN_STOP: &str = "origin_stop";
pub const DESTINATION_STOP: &str = "destination_stop";
pub const QUANTITY: &str = "quantity";
pub const MONTH: &str = "month";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Definitions {
    pub flags: Flags,
    pub paths: Paths,
    /// Logical column name -> header text in the patronage file.
    pub infile_headers: IndexMap<String, String>,
    /// Logical column name -> required cell value.
    pub infile_filters: IndexMap<String, String>,
    pub directions: Directions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Flags {
    pub verbose: Option<bool>,
    pub reflexive: Option<bool>,
    pub swap_colours: Option<bool>,
    pub jumble_colours: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Paths {
    pub css: Option<PathBuf>,
    pub gtfs_dir: Option<PathBuf>,
    pub gtfs_cache: Option<PathBuf>,
    pub positions_file: Option<PathBuf>,
    pub infile: Option<PathBuf>,
    pub outdir: Option<PathBuf>,
}

impl Definitions {
    /// Loads a YAML or JSON document, picked by file extension (YAML otherwise).
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| Error::InvalidDefinitions {
            message: e.to_string(),
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidDefinitions {
            message: e.to_string(),
        })
    }

    /// Header text bound to a logical column (identity when unbound).
    pub fn header_for<'a>(&'a self, logical: &'a str) -> &'a str {
        self.infile_headers
            .get(logical)
            .map(String::as_str)
            .unwrap_or(logical)
    }

    /// Resolves all bindings against `table`'s header.
    pub fn bind(&self, table: &Table) -> Result<ColumnBindings> {
        let filters = self
            .infile_filters
            .iter()
            .map(|(logical, value)| Ok((table.column(self.header_for(logical))?, value.clone())))
            .collect::<Result<Vec<_>>>()?;

        Ok(ColumnBindings {
            route: table.column(self.header_for(ROUTE))?,
            direction: table.column(self.header_for(DIRECTION))?,
            origin: table.column(self.header_for(ORIGIN_STOP))?,
            destination: table.column(self.header_for(DESTINATION_STOP))?,
            quantity: table.column(self.header_for(QUANTITY))?,
            month: table.column_opt(self.header_for(MONTH)),
            filters,
        })
    }
}

/// Column indexes into one specific table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBindings {
    pub route: usize,
    pub direction: usize,
    pub origin: usize,
    pub destination: usize,
    pub quantity: usize,
    pub month: Option<usize>,
    /// `(column, required value)` equality filters.
    pub filters: Vec<(usize, String)>,
}

/// Patronage direction name -> GTFS `direction_id`.
///
/// Names are matched case-insensitively, with spaces and underscores interchangeable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, String>", into = "IndexMap<String, String>")]
pub struct Directions(IndexMap<String, String>);

impl From<IndexMap<String, String>> for Directions {
    fn from(entries: IndexMap<String, String>) -> Self {
        Self::new(entries)
    }
}

impl From<Directions> for IndexMap<String, String> {
    fn from(directions: Directions) -> Self {
        directions.0
    }
}

impl Directions {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(name, code)| (normalize_direction(&name), code))
                .collect(),
        )
    }

    pub fn code_for(&self, direction: &str) -> String {
        let key = normalize_direction(direction);
        if let Some(code) = self.0.get(&key) {
            return code.clone();
        }
        match key.as_str() {
            "counterclockwise" | "outbound" | "south" | "west" => "1".to_string(),
            _ => "0".to_string(),
        }
    }
}

fn normalize_direction(direction: &str) -> String {
    direction.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_definitions_bind_renamed_columns_and_filters() {
        let defs = Definitions::from_yaml_str(
            r#"
flags:
  reflexive: true
infile_headers:
  origin_stop: From
  destination_stop: To
  ticket_type: Ticket
infile_filters:
  ticket_type: Adult
directions:
  inbound: "1"
"#,
        )
        .unwrap();
        assert_eq!(defs.flags.reflexive, Some(true));

        let table =
            Table::parse("route,direction,From,To,quantity,Ticket\n").unwrap();
        let b = defs.bind(&table).unwrap();
        assert_eq!((b.origin, b.destination, b.quantity), (2, 3, 4));
        assert_eq!(b.filters, vec![(5, "Adult".to_string())]);
        assert_eq!(b.month, None);
        assert_eq!(defs.directions.code_for("Inbound"), "1");
    }

    #[test]
    fn missing_required_binding_is_fatal() {
        let table = Table::parse("route,direction,origin_stop,destination_stop\n").unwrap();
        let err = Definitions::default().bind(&table).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { column } if column == "quantity"));
    }

    #[test]
    fn json_definitions_are_accepted() {
        let defs = Definitions::from_json_str(r#"{"paths": {"outdir": "out"}}"#).unwrap();
        assert_eq!(defs.paths.outdir, Some(PathBuf::from("out")));
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let err = Definitions::from_yaml_str("colours: {}\n").unwrap_err();
        assert!(matches!(err, Error::InvalidDefinitions { .. }));
    }

    #[test]
    fn direction_names_in_definitions_match_any_case() {
        let defs = Definitions::from_yaml_str(
            r#"
directions:
  Inbound: "1"
  Anti Clockwise: "0"
  SOUTH: "0"
"#,
        )
        .unwrap();
        assert_eq!(defs.directions.code_for("inbound"), "1");
        assert_eq!(defs.directions.code_for("Inbound"), "1");
        assert_eq!(defs.directions.code_for("anti_clockwise"), "0");
        assert_eq!(defs.directions.code_for("South"), "0");
    }

    #[test]
    fn direction_codes_fall_back_to_compass_names() {
        let dirs = Directions::default();
        assert_eq!(dirs.code_for("Outbound"), "1");
        assert_eq!(dirs.code_for("Counter Clockwise"), "0");
        assert_eq!(dirs.code_for("counterclockwise"), "1");
        assert_eq!(dirs.code_for("North"), "0");
    }
}
