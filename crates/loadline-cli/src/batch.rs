//! Diagram generation for one or many route/direction pairs.

use crate::CliError;
use crate::index::IndexEntry;
use crate::raster::Rasterizer;
use crate::settings::{OutputFormat, PositionsChoice, Settings};
use loadline_core::{
    ColumnBindings, Directions, GtfsCache, ManualPositions, Period, PositionQuery, PositionSource,
    RouteKey, StopNames, Table, detect_period, diagram_title, list_route_keys, prepare_route,
};
use loadline_render::model::DiagramLayout;
use loadline_render::{LayoutOptions, SvgRenderOptions, layout_route, render_svg};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything loaded once per invocation and shared read-only by every diagram.
pub struct DiagramJob {
    table: Table,
    bindings: ColumnBindings,
    directions: Directions,
    positions: Option<Arc<dyn PositionSource + Send + Sync>>,
    names: StopNames,
    period: Option<Period>,
    reflexive: bool,
    layout: LayoutOptions,
    svg: SvgRenderOptions,
    seed: Option<u64>,
}

impl DiagramJob {
    /// Reads the patronage table and any position source.
    ///
    /// Missing columns and missing GTFS inputs fail here, before any diagram is drawn.
    pub fn load(settings: &Settings) -> Result<Self, CliError> {
        let table = Table::read(&settings.infile)?;
        let bindings = settings.definitions.bind(&table)?;
        tracing::debug!(
            path = %settings.infile.display(),
            rows = table.len(),
            "loaded patronage table"
        );

        let (positions, names): (Option<Arc<dyn PositionSource + Send + Sync>>, StopNames) =
            match &settings.positions {
                PositionsChoice::Data => (None, StopNames::default()),
                PositionsChoice::Manual(path) => {
                    let manual = ManualPositions::read(path)?;
                    let names = manual.names().clone();
                    let source: Arc<dyn PositionSource + Send + Sync> = Arc::new(manual);
                    (Some(source), names)
                }
                PositionsChoice::Gtfs { dir, cache } => {
                    let cache = cache
                        .as_deref()
                        .map(GtfsCache::new)
                        .unwrap_or_else(|| GtfsCache::in_gtfs_dir(dir));
                    let (positions, names) = cache.load_or_build(dir)?;
                    let source: Arc<dyn PositionSource + Send + Sync> = Arc::new(positions);
                    (Some(source), names)
                }
            };

        let css = settings
            .css
            .as_deref()
            .map(|path| std::fs::read_to_string(path).map_err(|e| CliError::io(path, e)))
            .transpose()?;

        let period = bindings.month.and_then(|column| detect_period(&table, column));

        Ok(Self {
            directions: settings.definitions.directions.clone(),
            positions,
            names,
            period,
            reflexive: settings.reflexive,
            layout: LayoutOptions {
                color_by: settings.color_by,
                jumble_colors: settings.jumble_colours,
                ..LayoutOptions::default()
            },
            svg: SvgRenderOptions { css },
            seed: settings.seed,
            table,
            bindings,
        })
    }

    pub fn route_keys(&self) -> Vec<RouteKey> {
        list_route_keys(&self.table, &self.bindings)
    }

    pub fn period(&self) -> Option<Period> {
        self.period
    }

    pub fn direction_code(&self, key: &RouteKey) -> String {
        self.directions.code_for(&key.direction)
    }

    /// Lays out `key`, or `None` when it has nothing to draw.
    pub fn layout(&self, key: &RouteKey) -> Result<Option<DiagramLayout>, CliError> {
        let code = self.direction_code(key);
        let query = self.positions.as_deref().map(|source| PositionQuery {
            source,
            route: &key.route,
            direction_code: &code,
        });
        let Some(route) = prepare_route(&self.table, &self.bindings, key, self.reflexive, query)?
        else {
            return Ok(None);
        };

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let title = diagram_title(&key.route, &key.direction, self.period);
        let layout = layout_route(&route, &self.names, Some(title), &self.layout, &mut rng)?;
        Ok(Some(layout))
    }

    pub fn render(&self, key: &RouteKey) -> Result<Option<String>, CliError> {
        match self.layout(key)? {
            Some(layout) => Ok(Some(render_svg(&layout, &self.svg)?)),
            None => Ok(None),
        }
    }
}

/// Where and how diagrams are written.
#[derive(Clone)]
pub struct Output {
    pub dir: PathBuf,
    pub format: OutputFormat,
    pub raster: Option<Rasterizer>,
}

impl Output {
    pub fn new(dir: PathBuf, format: OutputFormat, scale: f32) -> Self {
        let raster = (format == OutputFormat::Png).then(|| Rasterizer::new(scale));
        Self { dir, format, raster }
    }

    pub fn file_name(&self, key: &RouteKey) -> String {
        format!("{}.{}", key.file_stem(), self.format.extension())
    }

    fn write(&self, key: &RouteKey, svg: &str) -> Result<PathBuf, CliError> {
        let path = self.dir.join(self.file_name(key));
        let bytes = match &self.raster {
            Some(raster) => raster.svg_to_png(svg)?,
            None => svg.as_bytes().to_vec(),
        };
        std::fs::write(&path, bytes).map_err(|e| CliError::io(&path, e))?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rendered(PathBuf),
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub rendered: Vec<(RouteKey, PathBuf)>,
    pub skipped: usize,
    pub total: usize,
}

impl BatchReport {
    /// Index rows for the rendered files, linked relative to `dir`.
    pub fn index_entries(&self, dir: &Path) -> Vec<IndexEntry> {
        self.rendered
            .iter()
            .map(|(key, path)| IndexEntry {
                route: key.route.clone(),
                direction: key.direction.clone(),
                href: path
                    .strip_prefix(dir)
                    .unwrap_or(path.as_path())
                    .to_string_lossy()
                    .replace('\\', "/"),
            })
            .collect()
    }
}

/// Renders and writes one diagram.
pub fn render_one(job: &DiagramJob, key: &RouteKey, output: &Output) -> Result<Outcome, CliError> {
    let Some(svg) = job.render(key)? else {
        return Ok(Outcome::Skipped);
    };
    let path = output.write(key, &svg)?;
    tracing::info!(route = %key, path = %path.display(), "wrote diagram");
    Ok(Outcome::Rendered(path))
}

/// Renders `keys` in parallel.
///
/// Keys whose direction has no GTFS direction code (`0`/`1`) are skipped, as are keys with
/// nothing to draw; any other error aborts the batch.
pub fn run_batch(job: &DiagramJob, keys: &[RouteKey], output: &Output) -> Result<BatchReport, CliError> {
    std::fs::create_dir_all(&output.dir).map_err(|e| CliError::io(&output.dir, e))?;

    let outcomes = keys
        .par_iter()
        .map(|key| {
            let code = job.direction_code(key);
            if code != "0" && code != "1" {
                tracing::warn!(route = %key, code = %code, "direction code is neither 0 nor 1; skipping");
                return Ok(Outcome::Skipped);
            }
            render_one(job, key, output)
        })
        .collect::<Result<Vec<_>, CliError>>()?;

    let mut report = BatchReport {
        total: keys.len(),
        ..BatchReport::default()
    };
    for (key, outcome) in keys.iter().zip(outcomes) {
        match outcome {
            Outcome::Rendered(path) => report.rendered.push((key.clone(), path)),
            Outcome::Skipped => report.skipped += 1,
        }
    }
    tracing::info!(
        completed = report.rendered.len(),
        skipped = report.skipped,
        total = report.total,
        "batch finished"
    );
    Ok(report)
}
