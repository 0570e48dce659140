use serde::{Deserialize, Serialize};

/// Which end of an arc picks its colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBy {
    #[default]
    Origin,
    Destination,
}

impl ColorBy {
    /// Class prefix carrying the colour rule (`f` for from, `t` for to).
    pub fn class_prefix(self) -> char {
        match self {
            Self::Origin => 'f',
            Self::Destination => 't',
        }
    }
}

/// Spacing constants, all derived from one base unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub space: f64,
    /// Distance between neighbouring stops on the axis.
    pub between: f64,
    /// Minimum clear gap kept between the arc bundles of neighbouring stops.
    pub min_gap: f64,
    /// Height of the label band below the axis.
    pub text_section: f64,
    pub left_extra: f64,
    pub right_extra: f64,
}

impl Geometry {
    pub fn from_space(space: f64) -> Self {
        Self {
            space,
            between: 2.5 * space,
            min_gap: 0.5 * space,
            text_section: 11.0 * space,
            left_extra: 2.0 * space,
            right_extra: 2.0 * space,
        }
    }

    pub fn stop_x(&self, index: usize) -> f64 {
        self.left_extra + index as f64 * self.between
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::from_space(50.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcLayout {
    pub origin: String,
    pub destination: String,
    pub origin_index: usize,
    pub destination_index: usize,
    pub quantity: u64,
    /// Stroke width.
    pub width: f64,
    /// Centre of this arc measured from the start of the origin's allotment.
    pub origin_offset: f64,
    /// Centre of this arc measured back from the destination stop.
    pub destination_offset: f64,
    pub x1: f64,
    pub x2: f64,
    /// Index into [`DiagramLayout::colors`].
    pub color_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarLayout {
    pub x: f64,
    pub y0: f64,
    pub y1: f64,
    pub width: f64,
    pub text_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLayout {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub boardings: u64,
    pub alightings: u64,
    /// Horizontal span reserved for departing arcs.
    pub allotment: f64,
    /// Passengers on board after this stop.
    pub load: i64,
    pub bar: Option<BarLayout>,
    pub label_x: f64,
    pub label_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleLayout {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramLayout {
    pub route: String,
    pub direction: String,
    pub geometry: Geometry,
    pub width: f64,
    pub height: f64,
    /// Y of the mainline; arcs rise above it, labels hang below.
    pub axis_y: f64,
    pub tier_max: usize,
    pub max_stacked_width: f64,
    pub width_scale: f64,
    pub color_by: ColorBy,
    pub colors: Vec<String>,
    pub stops: Vec<StopLayout>,
    pub arcs: Vec<ArcLayout>,
    pub title: Option<TitleLayout>,
}
