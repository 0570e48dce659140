//! SVG output for a [`DiagramLayout`].

use crate::model::DiagramLayout;
use crate::{Error, Result};
use std::fmt::Write as _;

pub const DEFAULT_CSS: &str = include_str!("../assets/default.css");

#[derive(Debug, Clone, Default)]
pub struct SvgRenderOptions {
    /// Stylesheet embedded instead of [`DEFAULT_CSS`]. Colour rules are appended either way.
    pub css: Option<String>,
}

pub fn render_svg(layout: &DiagramLayout, options: &SvgRenderOptions) -> Result<String> {
    let g = &layout.geometry;
    let space = g.space;
    let (w, h) = (layout.width, layout.height);

    let mut out = String::new();
    let _ = write!(
        &mut out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = fmt(w),
        h = fmt(h),
    );

    out.push_str("<defs><style>");
    escape_xml_into(&mut out, options.css.as_deref().unwrap_or(DEFAULT_CSS).trim());
    out.push_str("\n\n/* Arc colours, by ");
    out.push_str(match layout.color_by {
        crate::model::ColorBy::Origin => "origin",
        crate::model::ColorBy::Destination => "destination",
    });
    out.push_str(" index */");
    let prefix = layout.color_by.class_prefix();
    for (i, color) in layout.colors.iter().enumerate() {
        let _ = write!(&mut out, "\n.{prefix}{i} {{stroke:{}}}", escape_xml(color));
    }
    out.push_str("</style></defs>");

    out.push_str(r#"<rect id="bgrect" x="0" y="0" width="100%" height="100%"/>"#);

    out.push_str(r#"<g class="arcs">"#);
    for arc in &layout.arcs {
        let (Some(from), Some(to)) = (
            layout.stops.get(arc.origin_index),
            layout.stops.get(arc.destination_index),
        ) else {
            return Err(Error::InvalidModel {
                message: format!(
                    "arc {} -> {} points outside the {} laid out stops",
                    arc.origin,
                    arc.destination,
                    layout.stops.len()
                ),
            });
        };
        let _ = write!(
            &mut out,
            r#"<path d="M{x1} {y0} v{up} A1 1 0 1 1 {x2} {axis} v{down}" stroke-width="{sw}" class="arc f{i} t{j}"><title>{from} to {to}: {q} passengers</title></path>"#,
            x1 = fmt(arc.x1),
            y0 = fmt(h),
            up = fmt(-g.text_section),
            x2 = fmt(arc.x2),
            axis = fmt(layout.axis_y),
            down = fmt(g.text_section),
            sw = fmt(arc.width),
            i = arc.origin_index,
            j = arc.destination_index,
            from = escape_xml(&from.name),
            to = escape_xml(&to.name),
            q = arc.quantity,
        );
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="bars">"#);
    for stop in &layout.stops {
        let Some(bar) = &stop.bar else {
            continue;
        };
        let _ = write!(
            &mut out,
            r#"<line x1="{x}" y1="{y0}" x2="{x}" y2="{y1}" stroke-width="{sw}" class="bargraph"/>"#,
            x = fmt(bar.x),
            y0 = fmt(bar.y0),
            y1 = fmt(bar.y1),
            sw = fmt(bar.width),
        );
        for class in ["keyline bartxt", "foreground bartxt"] {
            let _ = write!(
                &mut out,
                r#"<text x="{x}" y="{y}" text-anchor="middle" class="{class}">{load}</text>"#,
                x = fmt(bar.x),
                y = fmt(bar.text_y),
                load = stop.load,
            );
        }
    }
    out.push_str("</g>");

    // Every label is drawn twice: a wide white keyline underneath, then the text itself.
    out.push_str(r#"<g class="labels">"#);
    for stop in &layout.stops {
        let (tx, ty) = (fmt(stop.label_x), fmt(stop.label_y));
        for class in ["keyline", "foreground"] {
            let _ = write!(
                &mut out,
                r#"<text x="{tx}" y="{ty}" text-anchor="end" transform="rotate(270,{tx},{ty})" font-size="{fs}" class="{class}">{name}<tspan x="{tx}" y="{ty2}">{a} alightings | {b} boardings</tspan></text>"#,
                fs = fmt(space / 2.0),
                name = escape_xml(&stop.name),
                ty2 = fmt(stop.label_y + space / 2.0),
                a = stop.alightings,
                b = stop.boardings,
            );
        }
    }
    out.push_str("</g>");

    out.push_str(r#"<polyline id="mainline" points=""#);
    for (i, stop) in layout.stops.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(&mut out, "{},{}", fmt(stop.x), fmt(layout.axis_y));
    }
    out.push_str(r#""/>"#);

    out.push_str(r#"<g class="stops">"#);
    for stop in &layout.stops {
        let _ = write!(
            &mut out,
            r#"<circle cx="{x}" cy="{y}" r="{r}" class="markers"/>"#,
            x = fmt(stop.x),
            y = fmt(layout.axis_y),
            r = fmt(space / 4.0),
        );
    }
    out.push_str("</g>");

    if let Some(title) = &layout.title {
        let _ = write!(
            &mut out,
            r#"<text x="{x}" y="{y}" text-anchor="middle" class="title">{text}</text>"#,
            x = fmt(title.x),
            y = fmt(title.y),
            text = escape_xml(&title.text),
        );
    }

    out.push_str("</svg>\n");
    Ok(out)
}

/// Formats an SVG number: five decimals at most, no `-0`, no float noise.
pub(crate) fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut v = (v * 1e5).round() / 1e5;
    if v == -0.0 {
        v = 0.0;
    }
    format!("{v}")
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_xml_into(&mut out, text);
    out
}

fn escape_xml_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}
