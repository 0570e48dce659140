//! Left-to-right stop order for one diagram.

use crate::aggregate::Aggregation;
use crate::merge::merge;
use crate::model::StopId;
use crate::positions::PositionSource;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// Distinct stops in drawing order, with a precomputed position index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StopOrder {
    stops: Vec<StopId>,
    #[serde(skip)]
    index: FxHashMap<StopId, usize>,
}

impl StopOrder {
    /// Builds an order from `stops`; later duplicates are ignored.
    pub fn new(stops: impl IntoIterator<Item = StopId>) -> Self {
        let mut order = Self::default();
        for stop in stops {
            if !order.index.contains_key(&stop) {
                order.index.insert(stop.clone(), order.stops.len());
                order.stops.push(stop);
            }
        }
        order
    }

    pub fn stops(&self) -> &[StopId] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn index_of(&self, stop: &str) -> Option<usize> {
        self.index.get(stop).copied()
    }

    pub fn contains(&self, stop: &str) -> bool {
        self.index.contains_key(stop)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.stops.iter().map(String::as_str)
    }
}

/// Route and direction code a [`PositionSource`] is queried with.
#[derive(Clone, Copy)]
pub struct PositionQuery<'a> {
    pub source: &'a dyn PositionSource,
    pub route: &'a str,
    pub direction_code: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedOrder {
    pub order: StopOrder,
    /// Stops with flow but no known position, in first-seen order.
    pub dropped: Vec<StopId>,
}

impl ResolvedOrder {
    /// Removes flows touching dropped stops from `agg`.
    ///
    /// A placed stop whose only flows went to dropped stops leaves the order as well, so
    /// the order stays exactly the stops that still carry flow.
    pub fn apply(&mut self, agg: &mut Aggregation) {
        if self.dropped.is_empty() {
            return;
        }
        let dropped: FxHashSet<&str> = self.dropped.iter().map(String::as_str).collect();
        agg.retain_stops(|s| !dropped.contains(s));

        let remaining: FxHashSet<&str> = agg.stops_seen.iter().map(String::as_str).collect();
        if remaining.len() < self.order.len() {
            tracing::debug!(
                stranded = self.order.len() - remaining.len(),
                "removing stops left without flow"
            );
            self.order = StopOrder::new(
                self.order
                    .iter()
                    .filter(|s| remaining.contains(s))
                    .map(str::to_string),
            );
        }
    }
}

/// Decides the stop order for `agg`.
///
/// With positions, stops are sorted ascending by position (stable for ties) and stops
/// without one are dropped. Without positions, origin and destination encounter orders
/// are merged.
pub fn resolve(agg: &Aggregation, positions: Option<PositionQuery<'_>>) -> ResolvedOrder {
    let Some(query) = positions else {
        let merged = merge(&agg.origin_order, &agg.destination_order);
        return ResolvedOrder {
            order: StopOrder::new(merged),
            dropped: Vec::new(),
        };
    };

    let mut placed: Vec<(f64, &StopId)> = Vec::with_capacity(agg.stops_seen.len());
    let mut dropped = Vec::new();
    for stop in &agg.stops_seen {
        match query.source.position(stop, query.route, query.direction_code) {
            Some(pos) => placed.push((pos, stop)),
            None => {
                tracing::warn!(
                    stop = %stop,
                    route = query.route,
                    direction = query.direction_code,
                    "stop has no known position; dropping it from this diagram"
                );
                dropped.push(stop.clone());
            }
        }
    }
    placed.sort_by(|a, b| a.0.total_cmp(&b.0));

    ResolvedOrder {
        order: StopOrder::new(placed.into_iter().map(|(_, s)| s.clone())),
        dropped,
    }
}
