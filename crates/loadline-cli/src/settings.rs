//! Command-line options shared by the diagram subcommands, merged over a definitions file.

use crate::CliError;
use clap::{ArgAction, Args, ValueEnum};
use loadline_core::Definitions;
use loadline_render::ColorBy;
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Args, Debug, Clone, Copy)]
pub struct Verbosity {
    /// More log output (repeat for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Verbosity {
    /// Flags win; `flags.verbose` from the definitions file only raises the default.
    pub fn level(self, definitions: Option<&Definitions>) -> Level {
        if self.quiet {
            return Level::WARN;
        }
        let from_file = definitions
            .and_then(|d| d.flags.verbose)
            .unwrap_or(false);
        match self.verbose {
            0 if from_file => Level::DEBUG,
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Definitions file (YAML, or JSON by extension) with column bindings, filters and defaults.
    #[arg(short, long, value_name = "FILE")]
    pub definitions: Option<PathBuf>,

    /// Origin-destination patronage CSV.
    #[arg(value_name = "INFILE")]
    pub infile: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DiagramArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Count journeys that start and end at the same stop.
    #[arg(long, overrides_with = "no_reflexive")]
    pub reflexive: bool,
    #[arg(long, overrides_with = "reflexive", hide = true)]
    pub no_reflexive: bool,

    /// Colour arcs by destination stop instead of origin stop.
    #[arg(long, overrides_with = "no_swap_colours")]
    pub swap_colours: bool,
    #[arg(long, overrides_with = "swap_colours", hide = true)]
    pub no_swap_colours: bool,

    /// Reorder the palette so neighbouring stops get distant hues.
    #[arg(long, overrides_with = "no_jumble_colours")]
    pub jumble_colours: bool,
    #[arg(long, overrides_with = "jumble_colours", hide = true)]
    pub no_jumble_colours: bool,

    /// GTFS feed directory; stops are ordered by their average stop_sequence.
    #[arg(short, long, value_name = "DIR", conflicts_with = "positions")]
    pub gtfs: Option<PathBuf>,

    /// Where the derived GTFS lookups are cached (default: DIR/loadline).
    #[arg(long, value_name = "DIR")]
    pub gtfs_cache: Option<PathBuf>,

    /// CSV with stop_id, stop_sequence and optional stop_name columns.
    #[arg(short, long, value_name = "FILE")]
    pub positions: Option<PathBuf>,

    /// Stylesheet embedded in every diagram instead of the built-in one.
    #[arg(short, long, value_name = "FILE")]
    pub css: Option<PathBuf>,

    /// Seed for the arc palette; the same seed gives every diagram the same colours.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Svg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }
}

/// Where stop positions come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionsChoice {
    /// Order heuristically from the data itself.
    Data,
    Manual(PathBuf),
    Gtfs {
        dir: PathBuf,
        cache: Option<PathBuf>,
    },
}

/// Effective options after merging flags over the definitions file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub definitions: Definitions,
    pub infile: PathBuf,
    pub reflexive: bool,
    pub color_by: ColorBy,
    pub jumble_colours: bool,
    pub css: Option<PathBuf>,
    pub positions: PositionsChoice,
    pub seed: Option<u64>,
}

pub fn load_definitions(path: Option<&Path>) -> Result<Option<Definitions>, CliError> {
    path.map(Definitions::from_path)
        .transpose()
        .map_err(CliError::from)
}

fn switch(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}

/// The INFILE argument, else `paths.infile` from the definitions file.
pub fn infile(args: &InputArgs, definitions: &Definitions) -> Result<PathBuf, CliError> {
    args.infile
        .clone()
        .or_else(|| definitions.paths.infile.clone())
        .ok_or_else(|| {
            CliError::Usage("no patronage file given (pass INFILE or set paths.infile)".to_string())
        })
}

impl Settings {
    /// Command-line flag, then definitions file, then built-in default.
    pub fn resolve(args: &DiagramArgs, definitions: Definitions) -> Result<Self, CliError> {
        let infile = infile(&args.input, &definitions)?;
        let flags = &definitions.flags;
        let paths = &definitions.paths;

        let reflexive = switch(args.reflexive, args.no_reflexive)
            .or(flags.reflexive)
            .unwrap_or(false);
        let swap = switch(args.swap_colours, args.no_swap_colours)
            .or(flags.swap_colours)
            .unwrap_or(false);
        let jumble_colours = switch(args.jumble_colours, args.no_jumble_colours)
            .or(flags.jumble_colours)
            .unwrap_or(false);

        let positions_file = args
            .positions
            .clone()
            .or_else(|| paths.positions_file.clone());
        let gtfs_dir = args.gtfs.clone().or_else(|| paths.gtfs_dir.clone());
        let positions = match (positions_file, gtfs_dir) {
            (Some(file), Some(dir)) => {
                tracing::warn!(
                    positions = %file.display(),
                    gtfs = %dir.display(),
                    "both a positions file and a GTFS feed are configured; using the positions file"
                );
                PositionsChoice::Manual(file)
            }
            (Some(file), None) => PositionsChoice::Manual(file),
            (None, Some(dir)) => PositionsChoice::Gtfs {
                dir,
                cache: args.gtfs_cache.clone().or_else(|| paths.gtfs_cache.clone()),
            },
            (None, None) => PositionsChoice::Data,
        };

        let css = args.css.clone().or_else(|| paths.css.clone());

        Ok(Self {
            infile,
            reflexive,
            color_by: if swap {
                ColorBy::Destination
            } else {
                ColorBy::Origin
            },
            jumble_colours,
            css,
            positions,
            seed: args.seed,
            definitions,
        })
    }
}
