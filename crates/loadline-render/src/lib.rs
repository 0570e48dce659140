#![forbid(unsafe_code)]

//! Arc layout and SVG output for route load diagrams (headless).

pub mod color;
pub mod layout;
pub mod model;
pub mod svg;

pub use color::{ColorOptions, generate_colors, jumble};
pub use layout::{ArcSet, LayoutOptions, layout_arcs, layout_route, running_load, width_scale};
pub use model::{ArcLayout, ColorBy, DiagramLayout, Geometry, StopLayout};
pub use svg::{DEFAULT_CSS, SvgRenderOptions, render_svg};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid layout model: {message}")]
    InvalidModel { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
