//! `index.html` listing the rendered diagrams, one row per route.

use crate::CliError;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub route: String,
    pub direction: String,
    /// Link target relative to the index page.
    pub href: String,
}

impl IndexEntry {
    /// Splits a `{route}_{direction}.svg` path back into its key at the first `_`.
    ///
    /// File stems never carry `_` in the route part, so the split is exact for files this
    /// tool wrote; the route shows as it appears in the file name (`N-1` for route `N_1`).
    pub fn from_relative_path(href: &str) -> Option<Self> {
        let file = href.rsplit('/').next()?;
        let stem = file.strip_suffix(".svg")?;
        let (route, direction) = stem.split_once('_')?;
        if route.is_empty() || direction.is_empty() {
            return None;
        }
        Some(Self {
            route: route.to_string(),
            direction: direction.replace('_', " "),
            href: href.to_string(),
        })
    }
}

/// Routes and directions are listed in sorted order.
pub fn render_index(heading: &str, entries: &[IndexEntry]) -> String {
    let mut routes: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
    for entry in entries {
        routes
            .entry(entry.route.as_str())
            .or_default()
            .insert(entry.direction.as_str(), entry.href.as_str());
    }

    let mut out = String::from("<html><head><meta charset=\"utf-8\"></head><body>\n");
    if !heading.is_empty() {
        let _ = writeln!(
            &mut out,
            r#"<h4 style="margin-left: 1vw">{}</h4>"#,
            escape_html(heading)
        );
    }
    out.push_str("<table>\n");
    for (route, directions) in &routes {
        out.push_str("<tr>");
        for (direction, href) in directions {
            let _ = write!(
                &mut out,
                r#"<td><a href="{}">{} {}</a></td>"#,
                escape_html(href),
                escape_html(route),
                escape_html(direction),
            );
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n</body></html>\n");
    out
}

pub fn write_index(dir: &Path, heading: &str, entries: &[IndexEntry]) -> Result<PathBuf, CliError> {
    let path = dir.join(INDEX_FILE);
    std::fs::write(&path, render_index(heading, entries)).map_err(|e| CliError::io(&path, e))?;
    tracing::info!(path = %path.display(), diagrams = entries.len(), "wrote index page");
    Ok(path)
}

/// Finds every diagram SVG under `dir`, recursively.
pub fn scan_dir(dir: &Path) -> Result<Vec<IndexEntry>, CliError> {
    let mut entries = Vec::new();
    scan_into(dir, "", &mut entries)?;
    Ok(entries)
}

fn scan_into(dir: &Path, prefix: &str, out: &mut Vec<IndexEntry>) -> Result<(), CliError> {
    let read = std::fs::read_dir(dir).map_err(|e| CliError::io(dir, e))?;
    let mut children = read
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CliError::io(dir, e))?;
    children.sort();

    for path in children {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let href = format!("{prefix}{name}");
        if path.is_dir() {
            scan_into(&path, &format!("{href}/"), out)?;
        } else if let Some(entry) = IndexEntry::from_relative_path(&href) {
            out.push(entry);
        } else if name.ends_with(".svg") {
            tracing::debug!(file = %path.display(), "not a ROUTE_DIRECTION diagram; left out of the index");
        }
    }
    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadline_core::RouteKey;

    fn entry(route: &str, direction: &str) -> IndexEntry {
        IndexEntry {
            route: route.to_string(),
            direction: direction.to_string(),
            href: format!("{route}_{direction}.svg"),
        }
    }

    #[test]
    fn rows_are_grouped_by_route_and_sorted() {
        let html = render_index(
            "March 2023",
            &[entry("200", "Loop"), entry("100", "Outbound"), entry("100", "Inbound")],
        );
        assert!(html.contains(r#"<h4 style="margin-left: 1vw">March 2023</h4>"#));
        assert!(html.contains(
            r#"<tr><td><a href="100_Inbound.svg">100 Inbound</a></td><td><a href="100_Outbound.svg">100 Outbound</a></td></tr>"#
        ));
        let first = html.find("100 Inbound").unwrap();
        let last = html.find("200 Loop").unwrap();
        assert!(first < last);
    }

    #[test]
    fn file_names_split_into_route_and_direction() {
        let e = IndexEntry::from_relative_path("2023-03/601_Anti_Clockwise.svg").unwrap();
        assert_eq!(e.route, "601");
        assert_eq!(e.direction, "Anti Clockwise");
        assert_eq!(e.href, "2023-03/601_Anti_Clockwise.svg");
        assert!(IndexEntry::from_relative_path("legend.svg").is_none());
        assert!(IndexEntry::from_relative_path("100_Inbound.png").is_none());
    }

    #[test]
    fn written_file_names_split_back_into_the_same_direction() {
        let key = RouteKey::new("N_1", "Anti_Clockwise");
        let href = format!("{}.svg", key.file_stem());
        let e = IndexEntry::from_relative_path(&href).unwrap();
        assert_eq!(e.route, "N-1");
        assert_eq!(e.direction, "Anti Clockwise");
    }

    #[test]
    fn scan_finds_nested_diagrams() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("100_Inbound.svg"), "<svg/>").unwrap();
        std::fs::write(dir.path().join("nested").join("7_West.svg"), "<svg/>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let hrefs: Vec<_> = scan_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.href)
            .collect();
        assert_eq!(hrefs, ["100_Inbound.svg", "nested/7_West.svg"]);
    }
}
