//! One route/direction taken from raw rows to an ordered, pruned flow set.

use crate::aggregate::{Aggregation, aggregate};
use crate::config::ColumnBindings;
use crate::model::{RouteKey, StopId};
use crate::order::{PositionQuery, StopOrder, resolve};
use crate::table::Table;
use crate::Result;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PreparedRoute {
    pub key: RouteKey,
    pub aggregation: Aggregation,
    pub order: StopOrder,
    /// Stops removed because no position was known for them.
    pub dropped: Vec<StopId>,
}

/// Aggregates `key`'s rows and resolves their stop order.
///
/// Returns `Ok(None)` when nothing is left to draw, either because no rows matched or
/// because every stop was dropped for lack of a position.
pub fn prepare_route(
    table: &Table,
    bindings: &ColumnBindings,
    key: &RouteKey,
    reflexive: bool,
    positions: Option<PositionQuery<'_>>,
) -> Result<Option<PreparedRoute>> {
    let mut aggregation = aggregate(table, bindings, key, reflexive)?;
    if aggregation.is_empty() {
        tracing::info!(route = %key, "no matching rows; skipping");
        return Ok(None);
    }

    let mut resolved = resolve(&aggregation, positions);
    resolved.apply(&mut aggregation);
    if aggregation.is_empty() {
        tracing::warn!(
            route = %key,
            dropped = resolved.dropped.len(),
            "no stops with a known position; skipping"
        );
        return Ok(None);
    }

    Ok(Some(PreparedRoute {
        key: key.clone(),
        aggregation,
        order: resolved.order,
        dropped: resolved.dropped,
    }))
}
