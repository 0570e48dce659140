//! PNG output through usvg/resvg.

use crate::CliError;
use std::sync::Arc;

/// Rasterizes diagrams with one system font database shared by every render.
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
    scale: f32,
}

impl Rasterizer {
    pub fn new(scale: f32) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        tracing::debug!(faces = fontdb.len(), "loaded system fonts for PNG output");
        Self {
            fontdb: Arc::new(fontdb),
            scale,
        }
    }

    pub fn svg_to_png(&self, svg: &str) -> Result<Vec<u8>, CliError> {
        let pixmap = self.svg_to_pixmap(svg)?;
        pixmap
            .encode_png()
            .map_err(|e| CliError::Raster(format!("failed to encode PNG: {e}")))
    }

    fn svg_to_pixmap(&self, svg: &str) -> Result<tiny_skia::Pixmap, CliError> {
        let mut opt = usvg::Options::default();
        opt.fontdb = Arc::clone(&self.fontdb);
        opt.font_family = "Arial".to_string();

        let tree = usvg::Tree::from_str(svg, &opt)
            .map_err(|e| CliError::Raster(format!("failed to parse SVG for PNG rendering: {e}")))?;

        // Diagrams always carry a viewBox matching their width/height, so the tree size is the page.
        let size = tree.size();
        let width_px = (size.width() * self.scale).ceil().max(1.0) as u32;
        let height_px = (size.height() * self.scale).ceil().max(1.0) as u32;

        let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px).ok_or_else(|| {
            CliError::Raster(format!("failed to allocate a {width_px}x{height_px} pixmap"))
        })?;
        pixmap.fill(tiny_skia::Color::WHITE);
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(self.scale, self.scale),
            &mut pixmap.as_mut(),
        );
        Ok(pixmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_the_page_and_encodes_png() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20" viewBox="0 0 40 20"><rect x="0" y="0" width="40" height="20" fill="black"/></svg>"#;
        let raster = Rasterizer::new(2.0);
        let pixmap = raster.svg_to_pixmap(svg).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (80, 40));

        let png = raster.svg_to_png(svg).unwrap();
        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn malformed_svg_is_an_error() {
        let err = Rasterizer::new(1.0).svg_to_png("<svg").unwrap_err();
        assert!(matches!(err, CliError::Raster(_)));
    }
}
