//! Per-route accumulation of origin/destination quantities.

use crate::config::ColumnBindings;
use crate::model::{RouteKey, StopId};
use crate::table::Table;
use crate::{Error, Result};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::Serialize;

/// Sparse origin -> destination -> quantity table. Absent entries mean zero flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlowTable {
    flows: IndexMap<StopId, IndexMap<StopId, u64>>,
}

impl FlowTable {
    /// Accumulates `quantity` onto the pair; repeated pairs sum.
    pub fn add(&mut self, origin: &str, destination: &str, quantity: u64) {
        *self
            .flows
            .entry(origin.to_string())
            .or_default()
            .entry(destination.to_string())
            .or_insert(0) += quantity;
    }

    pub fn get(&self, origin: &str, destination: &str) -> u64 {
        self.flows
            .get(origin)
            .and_then(|d| d.get(destination))
            .copied()
            .unwrap_or(0)
    }

    pub fn destinations(&self, origin: &str) -> Option<&IndexMap<StopId, u64>> {
        self.flows.get(origin)
    }

    /// `(origin, destination, quantity)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u64)> + '_ {
        self.flows.iter().flat_map(|(o, dests)| {
            dests
                .iter()
                .map(move |(d, q)| (o.as_str(), d.as_str(), *q))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn pair_count(&self) -> usize {
        self.flows.values().map(IndexMap::len).sum()
    }

    pub fn total(&self) -> u64 {
        self.iter().map(|(_, _, q)| q).sum()
    }

    fn retain_stops(&mut self, keep: &impl Fn(&str) -> bool) {
        self.flows.retain(|origin, dests| {
            if !keep(origin) {
                return false;
            }
            dests.retain(|d, _| keep(d));
            !dests.is_empty()
        });
    }
}

/// Boardings (stop as origin) and alightings (stop as destination).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StopTotals {
    pub boardings: IndexMap<StopId, u64>,
    pub alightings: IndexMap<StopId, u64>,
}

impl StopTotals {
    pub fn from_flows(flows: &FlowTable) -> Self {
        let mut totals = Self::default();
        for (o, d, q) in flows.iter() {
            totals.add(o, d, q);
        }
        totals
    }

    fn add(&mut self, origin: &str, destination: &str, quantity: u64) {
        *self.boardings.entry(origin.to_string()).or_insert(0) += quantity;
        *self.alightings.entry(destination.to_string()).or_insert(0) += quantity;
    }

    pub fn boardings_at(&self, stop: &str) -> u64 {
        self.boardings.get(stop).copied().unwrap_or(0)
    }

    pub fn alightings_at(&self, stop: &str) -> u64 {
        self.alightings.get(stop).copied().unwrap_or(0)
    }

    pub fn total_boardings(&self) -> u64 {
        self.boardings.values().sum()
    }

    pub fn total_alightings(&self) -> u64 {
        self.alightings.values().sum()
    }

    /// Largest per-stop boardings total.
    pub fn max_boardings(&self) -> u64 {
        self.boardings.values().copied().max().unwrap_or(0)
    }

    /// Largest per-stop alightings total.
    pub fn max_alightings(&self) -> u64 {
        self.alightings.values().copied().max().unwrap_or(0)
    }
}

/// Suspicious rows that are still aggregated as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RowAnomaly {
    BlankStop { line: usize },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Aggregation {
    pub flows: FlowTable,
    pub totals: StopTotals,
    /// Largest single-row quantity aggregated.
    pub max_quantity: u64,
    /// Rows matching the route key and filters, reflexive rows included.
    pub row_count: usize,
    /// Every stop in first-seen order (origin before destination within a row).
    pub stops_seen: Vec<StopId>,
    /// First-seen order of stops acting as origin.
    pub origin_order: Vec<StopId>,
    /// First-seen order of stops acting as destination.
    pub destination_order: Vec<StopId>,
    pub anomalies: Vec<RowAnomaly>,
}

impl Aggregation {
    /// True when nothing matched; callers skip the route rather than render it.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Removes every flow touching a stop rejected by `keep` and rebuilds the totals.
    ///
    /// Stops left without any flow are forgotten too, and `max_quantity` is capped by the
    /// largest remaining pair total.
    pub fn retain_stops(&mut self, keep: impl Fn(&str) -> bool) {
        self.flows.retain_stops(&keep);
        self.totals = StopTotals::from_flows(&self.flows);
        let largest_pair = self.flows.iter().map(|(_, _, q)| q).max().unwrap_or(0);
        self.max_quantity = self.max_quantity.min(largest_pair);
        let StopTotals {
            boardings,
            alightings,
        } = &self.totals;
        self.stops_seen
            .retain(|s| boardings.contains_key(s) || alightings.contains_key(s));
        self.origin_order.retain(|s| boardings.contains_key(s));
        self.destination_order.retain(|s| alightings.contains_key(s));
    }
}

/// Aggregates the rows of `table` that belong to `key` and pass every filter.
///
/// Rows whose origin equals their destination are skipped unless `reflexive` is set.
/// A quantity that is not a non-negative integer aborts the whole aggregation.
pub fn aggregate(
    table: &Table,
    bindings: &ColumnBindings,
    key: &RouteKey,
    reflexive: bool,
) -> Result<Aggregation> {
    let mut agg = Aggregation::default();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut seen_origins: FxHashSet<&str> = FxHashSet::default();
    let mut seen_destinations: FxHashSet<&str> = FxHashSet::default();

    for record in table.records() {
        if record.get(bindings.route) != key.route
            || record.get(bindings.direction) != key.direction
        {
            continue;
        }
        if bindings
            .filters
            .iter()
            .any(|(col, required)| record.get(*col) != required)
        {
            continue;
        }
        agg.row_count += 1;

        let origin = record.get(bindings.origin);
        let destination = record.get(bindings.destination);
        if !reflexive && origin == destination {
            continue;
        }

        let raw_quantity = record.get(bindings.quantity);
        let quantity =
            raw_quantity
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::InvalidQuantity {
                    line: record.line,
                    value: raw_quantity.to_string(),
                })?;

        if origin.trim().is_empty() || destination.trim().is_empty() {
            tracing::warn!(line = record.line, route = %key, "blank origin or destination stop");
            agg.anomalies.push(RowAnomaly::BlankStop { line: record.line });
        }

        for stop in [origin, destination] {
            if seen.insert(stop) {
                agg.stops_seen.push(stop.to_string());
            }
        }
        if seen_origins.insert(origin) {
            agg.origin_order.push(origin.to_string());
        }
        if seen_destinations.insert(destination) {
            agg.destination_order.push(destination.to_string());
        }

        agg.flows.add(origin, destination, quantity);
        agg.totals.add(origin, destination, quantity);
        agg.max_quantity = agg.max_quantity.max(quantity);
    }

    tracing::debug!(
        route = %key,
        rows = agg.row_count,
        pairs = agg.flows.pair_count(),
        max_quantity = agg.max_quantity,
        "aggregated flows"
    );
    Ok(agg)
}

/// Sorted, de-duplicated route keys present in `table`.
pub fn list_route_keys(table: &Table, bindings: &ColumnBindings) -> Vec<RouteKey> {
    let mut keys = table
        .records()
        .iter()
        .map(|r| RouteKey::new(r.get(bindings.route), r.get(bindings.direction)))
        .collect::<Vec<_>>();
    keys.sort_unstable();
    keys.dedup();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Definitions;

    fn table(rows: &str) -> Table {
        Table::parse(&format!(
            "route,direction,origin_stop,destination_stop,quantity,time\n{rows}"
        ))
        .unwrap()
    }

    fn run(t: &Table, reflexive: bool) -> Result<Aggregation> {
        let bindings = Definitions::default().bind(t).unwrap();
        aggregate(t, &bindings, &RouteKey::new("100", "Inbound"), reflexive)
    }

    #[test]
    fn repeated_pairs_accumulate_and_reversed_pairs_are_kept() {
        let t = table(
            "100,Inbound,S1,S2,5,am\n100,Inbound,S1,S2,3,pm\n100,Inbound,S2,S1,2,am\n",
        );
        let agg = run(&t, false).unwrap();
        assert_eq!(agg.flows.get("S1", "S2"), 8);
        assert_eq!(agg.flows.get("S2", "S1"), 2);
        assert_eq!(agg.totals.boardings_at("S1"), 8);
        assert_eq!(agg.totals.boardings_at("S2"), 2);
        assert_eq!(agg.totals.alightings_at("S2"), 8);
        assert_eq!(agg.totals.alightings_at("S1"), 2);
        assert_eq!(agg.max_quantity, 5);
        assert_eq!(agg.row_count, 3);
    }

    #[test]
    fn reflexive_rows_are_counted_but_only_aggregated_when_enabled() {
        let t = table("100,Inbound,S1,S1,4,am\n100,Inbound,S1,S2,1,am\n");
        let off = run(&t, false).unwrap();
        assert_eq!(off.flows.get("S1", "S1"), 0);
        assert_eq!(off.row_count, 2);
        assert_eq!(off.totals.total_boardings(), 1);

        let on = run(&t, true).unwrap();
        assert_eq!(on.flows.get("S1", "S1"), 4);
        assert_eq!(on.totals.total_boardings(), on.totals.total_alightings());
        assert_eq!(on.totals.total_boardings(), 5);
    }

    #[test]
    fn other_routes_and_filtered_rows_are_skipped() {
        let t = table(
            "100,Outbound,S1,S2,5,am\n200,Inbound,S1,S2,5,am\n100,Inbound,S1,S2,7,am\n100,Inbound,S1,S2,9,pm\n",
        );
        let mut defs = Definitions::default();
        defs.infile_filters.insert("time".to_string(), "am".to_string());
        let bindings = defs.bind(&t).unwrap();
        let agg = aggregate(&t, &bindings, &RouteKey::new("100", "Inbound"), false).unwrap();
        assert_eq!(agg.flows.get("S1", "S2"), 7);
        assert_eq!(agg.row_count, 1);
    }

    #[test]
    fn non_numeric_quantity_is_fatal() {
        let t = table("100,Inbound,S1,S2,lots,am\n");
        let err = run(&t, false).unwrap_err();
        assert!(matches!(err, Error::InvalidQuantity { line: 2, value } if value == "lots"));
    }

    #[test]
    fn no_matching_rows_is_empty_not_an_error() {
        let t = table("999,Inbound,S1,S2,5,am\n");
        let agg = run(&t, false).unwrap();
        assert!(agg.is_empty());
        assert_eq!(agg.row_count, 0);
    }

    #[test]
    fn blank_stops_are_reported_and_still_aggregated() {
        let t = table("100,Inbound,,S2,5,am\n");
        let agg = run(&t, false).unwrap();
        assert_eq!(agg.anomalies, vec![RowAnomaly::BlankStop { line: 2 }]);
        assert_eq!(agg.flows.get("", "S2"), 5);
    }

    #[test]
    fn encounter_orders_follow_row_order() {
        let t = table("100,Inbound,A,C,1,am\n100,Inbound,B,C,1,am\n100,Inbound,A,B,1,am\n");
        let agg = run(&t, false).unwrap();
        assert_eq!(agg.origin_order, ["A", "B"]);
        assert_eq!(agg.destination_order, ["C", "B"]);
        assert_eq!(agg.stops_seen, ["A", "C", "B"]);
    }

    #[test]
    fn retain_stops_prunes_flows_and_rebuilds_totals() {
        let t = table("100,Inbound,A,B,3,am\n100,Inbound,A,C,4,am\n100,Inbound,C,B,2,am\n");
        let mut agg = run(&t, false).unwrap();
        agg.retain_stops(|s| s != "C");
        assert_eq!(agg.flows.pair_count(), 1);
        assert_eq!(agg.totals.boardings_at("A"), 3);
        assert_eq!(agg.totals.alightings_at("B"), 3);
        assert_eq!(agg.totals.total_boardings(), agg.flows.total());
        assert_eq!(agg.max_quantity, 3);
        assert_eq!(agg.stops_seen, ["A", "B"]);
    }

    #[test]
    fn retain_stops_forgets_stops_stranded_by_the_prune() {
        let t = table("100,Inbound,A,B,5,am\n100,Inbound,C,D,3,am\n");
        let mut agg = run(&t, false).unwrap();
        agg.retain_stops(|s| s != "B");
        assert_eq!(agg.stops_seen, ["C", "D"]);
        assert_eq!(agg.origin_order, ["C"]);
        assert_eq!(agg.destination_order, ["D"]);
        assert_eq!(agg.totals.boardings_at("A"), 0);
    }

    #[test]
    fn route_keys_are_sorted_and_unique() {
        let t = table("200,Inbound,A,B,1,am\n100,Outbound,A,B,1,am\n200,Inbound,B,C,1,am\n");
        let bindings = Definitions::default().bind(&t).unwrap();
        assert_eq!(
            list_route_keys(&t, &bindings),
            [
                RouteKey::new("100", "Outbound"),
                RouteKey::new("200", "Inbound")
            ]
        );
    }
}
