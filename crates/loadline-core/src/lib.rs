#![forbid(unsafe_code)]

//! Patronage aggregation and stop ordering for route load diagrams (headless).
//!
//! The pipeline for one [`RouteKey`] is: [`Table`] rows -> [`aggregate`] -> [`resolve`]
//! (optionally against a [`PositionSource`]) -> [`PreparedRoute`], which the renderer lays out.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod gtfs;
pub mod merge;
pub mod model;
pub mod names;
pub mod order;
pub mod period;
pub mod positions;
pub mod route;
pub mod table;

pub use aggregate::{Aggregation, FlowTable, RowAnomaly, StopTotals, aggregate, list_route_keys};
pub use config::{ColumnBindings, Definitions, Directions};
pub use error::{Error, Result};
pub use gtfs::{GtfsCache, StopSequenceAverage, average_stop_sequences};
pub use merge::merge;
pub use model::{RouteKey, StopId};
pub use names::StopNames;
pub use order::{PositionQuery, ResolvedOrder, StopOrder, resolve};
pub use period::{Period, detect_period, diagram_title};
pub use positions::{GtfsPositions, ManualPositions, PositionSource};
pub use route::{PreparedRoute, prepare_route};
pub use table::Table;
