#![forbid(unsafe_code)]

mod batch;
mod index;
mod raster;
mod settings;

use batch::{DiagramJob, Outcome, Output, render_one, run_batch};
use clap::{Args, Parser, Subcommand};
use loadline_core::{GtfsCache, RouteKey, Table, list_route_keys};
use settings::{DiagramArgs, InputArgs, OutputFormat, Settings, Verbosity};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub(crate) enum CliError {
    Usage(String),
    Io { path: PathBuf, source: std::io::Error },
    Core(loadline_core::Error),
    Render(loadline_render::Error),
    Json(serde_json::Error),
    Raster(String),
    NothingToDraw(RouteKey),
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::NothingToDraw(_) => 3,
            _ => 1,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io { path, source } => write!(f, "I/O error ({}): {source}", path.display()),
            CliError::Core(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Raster(msg) => write!(f, "PNG output failed: {msg}"),
            CliError::NothingToDraw(key) => write!(f, "No flows to draw for {key}"),
        }
    }
}

impl From<loadline_core::Error> for CliError {
    fn from(value: loadline_core::Error) -> Self {
        Self::Core(value)
    }
}

impl From<loadline_render::Error> for CliError {
    fn from(value: loadline_render::Error) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Parser, Debug)]
#[command(name = "loadline", version, about = "Origin-destination load diagrams for transit routes.")]
struct Cli {
    #[command(flatten)]
    verbosity: Verbosity,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a diagram for every route and direction in the patronage file (or just one).
    Render(RenderArgs),
    /// Print the route/direction pairs present in the patronage file.
    List(InputArgs),
    /// Print the computed layout of one route/direction as JSON.
    Layout(LayoutArgs),
    /// Write index.html linking every ROUTE_DIRECTION.svg found under a directory.
    Index(IndexArgs),
    /// Precompute the GTFS stop sequence averages and stop names.
    GtfsCache(GtfsCacheArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    diagram: DiagramArgs,

    /// Render only this route and direction.
    #[arg(short, long, num_args = 2, value_names = ["ROUTE", "DIRECTION"])]
    one: Option<Vec<String>>,

    /// Output directory (default: paths.outdir, else the current directory).
    #[arg(short = 'O', long, value_name = "DIR")]
    outdir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Svg)]
    format: OutputFormat,

    /// Pixel scale for PNG output.
    #[arg(long, default_value_t = 1.0)]
    scale: f32,
}

#[derive(Args, Debug)]
struct LayoutArgs {
    #[command(flatten)]
    diagram: DiagramArgs,

    #[arg(short, long, num_args = 2, required = true, value_names = ["ROUTE", "DIRECTION"])]
    one: Vec<String>,

    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Directory holding the rendered diagrams.
    dir: PathBuf,

    /// Heading shown above the table, e.g. the month the data covers.
    #[arg(long, default_value = "")]
    heading: String,
}

#[derive(Args, Debug)]
struct GtfsCacheArgs {
    /// GTFS feed directory.
    gtfs: PathBuf,

    /// Cache directory (default: GTFS/loadline).
    #[arg(long, value_name = "DIR")]
    cache: Option<PathBuf>,
}

impl Command {
    fn definitions_path(&self) -> Option<&Path> {
        match self {
            Command::Render(args) => args.diagram.input.definitions.as_deref(),
            Command::Layout(args) => args.diagram.input.definitions.as_deref(),
            Command::List(args) => args.definitions.as_deref(),
            Command::Index(_) | Command::GtfsCache(_) => None,
        }
    }
}

fn route_key(pair: &[String]) -> Result<RouteKey, CliError> {
    match pair {
        [route, direction] => Ok(RouteKey::new(route.as_str(), direction.as_str())),
        _ => Err(CliError::Usage("expected ROUTE DIRECTION".to_string())),
    }
}

fn cmd_render(args: RenderArgs, definitions: loadline_core::Definitions) -> Result<(), CliError> {
    let outdir = args
        .outdir
        .clone()
        .or_else(|| definitions.paths.outdir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let settings = Settings::resolve(&args.diagram, definitions)?;
    let job = DiagramJob::load(&settings)?;
    let output = Output::new(outdir, args.format, args.scale);

    if let Some(pair) = &args.one {
        let key = route_key(pair)?;
        std::fs::create_dir_all(&output.dir).map_err(|e| CliError::io(&output.dir, e))?;
        if render_one(&job, &key, &output)? == Outcome::Skipped {
            tracing::warn!(route = %key, "nothing to draw; no diagram written");
        }
        return Ok(());
    }

    let keys = job.route_keys();
    let report = run_batch(&job, &keys, &output)?;
    let heading = job
        .period()
        .map(|p| format!("{} {}", p.month_name(), p.year))
        .unwrap_or_default();
    if args.format == OutputFormat::Svg {
        index::write_index(&output.dir, &heading, &report.index_entries(&output.dir))?;
    }
    Ok(())
}

fn cmd_list(args: InputArgs, definitions: loadline_core::Definitions) -> Result<(), CliError> {
    let infile = settings::infile(&args, &definitions)?;
    let table = Table::read(&infile)?;
    let bindings = definitions.bind(&table)?;
    for key in list_route_keys(&table, &bindings) {
        println!("{}\t{}", key.route, key.direction);
    }
    Ok(())
}

fn cmd_layout(args: LayoutArgs, definitions: loadline_core::Definitions) -> Result<(), CliError> {
    let key = route_key(&args.one)?;
    let settings = Settings::resolve(&args.diagram, definitions)?;
    let job = DiagramJob::load(&settings)?;
    let Some(layout) = job.layout(&key)? else {
        return Err(CliError::NothingToDraw(key));
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&layout)?
    } else {
        serde_json::to_string(&layout)?
    };
    println!("{json}");
    Ok(())
}

fn cmd_index(args: IndexArgs) -> Result<(), CliError> {
    let entries = index::scan_dir(&args.dir)?;
    if entries.is_empty() {
        tracing::warn!(dir = %args.dir.display(), "no ROUTE_DIRECTION.svg files found");
    }
    index::write_index(&args.dir, &args.heading, &entries)?;
    Ok(())
}

fn cmd_gtfs_cache(args: GtfsCacheArgs) -> Result<(), CliError> {
    let cache = args
        .cache
        .map(GtfsCache::new)
        .unwrap_or_else(|| GtfsCache::in_gtfs_dir(&args.gtfs));
    let (averages, names) = cache.rebuild(&args.gtfs)?;
    tracing::info!(
        dir = %cache.dir().display(),
        averages,
        names,
        "GTFS cache rebuilt"
    );
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    let definitions = settings::load_definitions(cli.cmd.definitions_path())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cli.verbosity.level(definitions.as_ref()))
        .with_target(false)
        .without_time()
        .init();

    let definitions = definitions.unwrap_or_default();
    match cli.cmd {
        Command::Render(args) => cmd_render(args, definitions),
        Command::List(args) => cmd_list(args, definitions),
        Command::Layout(args) => cmd_layout(args, definitions),
        Command::Index(args) => cmd_index(args),
        Command::GtfsCache(args) => cmd_gtfs_cache(args),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{err}");
        std::process::exit(err.exit_code());
    }
}
