//! Arc stacking, running load and full-diagram extents.

use crate::color::{ColorOptions, generate_colors, jumble};
use crate::model::{
    ArcLayout, BarLayout, ColorBy, DiagramLayout, Geometry, StopLayout, TitleLayout,
};
use crate::{Error, Result};
use loadline_core::{FlowTable, PreparedRoute, StopNames, StopOrder, StopTotals};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub geometry: Geometry,
    pub color_by: ColorBy,
    pub jumble_colors: bool,
    pub colors: ColorOptions,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            color_by: ColorBy::Origin,
            jumble_colors: false,
            colors: ColorOptions::diagram(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArcSet {
    pub arcs: Vec<ArcLayout>,
    /// Largest stop span of any forward flow; sizes the diagram height.
    pub tier_max: usize,
    /// Widest bundle of arcs leaving or arriving at a single stop.
    pub max_stacked_width: f64,
    pub width_scale: f64,
}

/// Quantity-to-width divisor.
///
/// Sized so the busiest boarding stop and the busiest alighting stop together fit in one
/// inter-stop span minus the minimum gap.
pub fn width_scale(totals: &StopTotals, geometry: &Geometry) -> f64 {
    let busiest = (totals.max_boardings() + totals.max_alightings()) as f64;
    let scale = busiest / ((geometry.between - geometry.min_gap) / geometry.space);
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Computes one arc per forward, non-zero flow.
///
/// Origins are processed left to right and each walks its destinations left to right.
/// Departures stack from the right edge of the origin's allotment; arrivals stack
/// leftwards from the destination stop in the order the origins were processed.
pub fn layout_arcs(
    order: &StopOrder,
    flows: &FlowTable,
    totals: &StopTotals,
    geometry: &Geometry,
    color_by: ColorBy,
) -> Result<ArcSet> {
    let mut tier_max = 0usize;
    let mut backward = 0usize;
    for (origin, destination, quantity) in flows.iter() {
        let (Some(i), Some(j)) = (order.index_of(origin), order.index_of(destination)) else {
            return Err(Error::InvalidModel {
                message: format!("flow {origin} -> {destination} references a stop outside the stop order"),
            });
        };
        if quantity == 0 {
            continue;
        }
        if j > i {
            tier_max = tier_max.max(j - i);
        } else if j < i {
            backward += 1;
        }
    }
    if backward > 0 {
        tracing::debug!(backward, "flows running against the stop order are not drawn");
    }

    let scale = width_scale(totals, geometry);
    let space = geometry.space;
    let stops = order.stops();
    let mut incoming = vec![0.0_f64; stops.len()];
    let mut max_stacked_width = 0.0_f64;
    let mut arcs = Vec::with_capacity(flows.pair_count());

    for (i, origin) in stops.iter().enumerate() {
        let Some(destinations) = flows.destinations(origin) else {
            continue;
        };
        let allotment = space * totals.boardings_at(origin) as f64 / scale;
        let mut outgoing = 0.0_f64;

        for (j, destination) in stops.iter().enumerate().skip(i + 1) {
            let quantity = destinations.get(destination).copied().unwrap_or(0);
            if quantity == 0 {
                continue;
            }
            let width = space * quantity as f64 / scale;
            let origin_offset = outgoing + width / 2.0;
            let destination_offset = incoming[j] + width / 2.0;

            arcs.push(ArcLayout {
                origin: origin.clone(),
                destination: destination.clone(),
                origin_index: i,
                destination_index: j,
                quantity,
                width,
                origin_offset,
                destination_offset,
                x1: geometry.stop_x(i) + (allotment - origin_offset) + space / 50.0,
                x2: geometry.stop_x(j) - destination_offset - space / 50.0,
                color_index: match color_by {
                    ColorBy::Origin => i,
                    ColorBy::Destination => j,
                },
            });

            outgoing += width;
            incoming[j] += width;
        }
        max_stacked_width = max_stacked_width.max(outgoing);
    }
    max_stacked_width = incoming.iter().copied().fold(max_stacked_width, f64::max);

    Ok(ArcSet {
        arcs,
        tier_max,
        max_stacked_width,
        width_scale: scale,
    })
}

/// Passengers on board after each stop: boardings minus alightings, accumulated.
pub fn running_load(order: &StopOrder, totals: &StopTotals) -> Vec<i64> {
    let mut load = 0i64;
    order
        .iter()
        .map(|stop| {
            load += totals.boardings_at(stop) as i64 - totals.alightings_at(stop) as i64;
            load
        })
        .collect()
}

/// Lays out a whole diagram for `route`.
pub fn layout_route<R: Rng + ?Sized>(
    route: &PreparedRoute,
    names: &StopNames,
    title: Option<String>,
    options: &LayoutOptions,
    rng: &mut R,
) -> Result<DiagramLayout> {
    let geometry = options.geometry;
    let flows = &route.aggregation.flows;
    let totals = &route.aggregation.totals;
    let order = &route.order;

    let arc_set = layout_arcs(order, flows, totals, &geometry, options.color_by)?;
    let loads = running_load(order, totals);

    let main_height = (arc_set.tier_max as f64 + 2.0) * 0.5 * geometry.between;
    let axis_y = main_height;
    let height = geometry.text_section + main_height;
    let width = geometry.left_extra
        + order.len().saturating_sub(1) as f64 * geometry.between
        + geometry.right_extra;

    let mut colors = generate_colors(order.len(), &options.colors, rng);
    if options.jumble_colors {
        colors = jumble(&colors);
    }

    let space = geometry.space;
    let scale = arc_set.width_scale;
    let stops = order
        .iter()
        .zip(&loads)
        .enumerate()
        .map(|(i, (stop, &load))| {
            let x = geometry.stop_x(i);
            let boardings = totals.boardings_at(stop);
            let bar = (load > 0).then(|| BarLayout {
                x: x + geometry.between / 2.0,
                y0: height,
                y1: height - space * load as f64 / scale,
                width: geometry.between,
                text_y: height - space / 5.0,
            });
            StopLayout {
                id: stop.to_string(),
                name: names.display(stop).to_string(),
                x,
                boardings,
                alightings: totals.alightings_at(stop),
                allotment: space * boardings as f64 / scale,
                load,
                bar,
                label_x: x - space / 8.0,
                label_y: axis_y + space / 2.0,
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        route = %route.key,
        stops = stops.len(),
        arcs = arc_set.arcs.len(),
        tier_max = arc_set.tier_max,
        width,
        height,
        "laid out diagram"
    );

    Ok(DiagramLayout {
        route: route.key.route.clone(),
        direction: route.key.direction.clone(),
        geometry,
        width,
        height,
        axis_y,
        tier_max: arc_set.tier_max,
        max_stacked_width: arc_set.max_stacked_width,
        width_scale: scale,
        color_by: options.color_by,
        colors,
        stops,
        arcs: arc_set.arcs,
        title: title.map(|text| TitleLayout {
            text,
            x: width / 2.0,
            y: space * 2.0,
        }),
    })
}
