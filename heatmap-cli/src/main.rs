use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use heatmap_core::MaxIntensity;
use std::path::PathBuf;

mod commands;
mod config;
mod error;
mod points;
mod surface;

use config::{Config, StyleOverrides};
use error::{print_error_and_exit, CliError};

#[derive(Parser)]
#[command(name = "heatmap")]
#[command(about = "Heatmap tiles - kernel density overlays for slippy maps")]
#[command(version)]
#[command(long_about = "
Renders weighted geographic points into density-shaded map tiles.

Examples:
  heatmap render --points quakes.json --zoom 10 --lat 0 --lng 0 --out tile.png
  heatmap render-area --points quakes.json --zoom 8 --lat 35.6 --lng 139.7 --span 2
  heatmap locate --lat 51.5 --lng -0.12 --zoom 12
  heatmap config --example > heatmap.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Overrides for the [heatmap] section of the configuration.
#[derive(Args, Debug, Clone)]
pub struct StyleArgs {
    /// Kernel radius in tile pixels (10-50)
    #[arg(long)]
    pub radius: Option<u32>,

    /// Overlay opacity (0-1)
    #[arg(long)]
    pub opacity: Option<f64>,

    /// Intensity mapped to the top of the gradient, or "auto"
    #[arg(long, value_parser = parse_max_intensity)]
    pub max_intensity: Option<MaxIntensity>,

    /// Tile edge in pixels
    #[arg(long)]
    pub tile_size: Option<u32>,
}

impl From<StyleArgs> for StyleOverrides {
    fn from(args: StyleArgs) -> Self {
        Self {
            radius: args.radius,
            opacity: args.opacity,
            max_intensity: args.max_intensity,
            tile_size: args.tile_size,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render one tile to PNG
    Render {
        /// Points file (JSON)
        #[arg(short, long)]
        points: PathBuf,

        /// Zoom level
        #[arg(short, long)]
        zoom: u8,

        /// Tile column
        #[arg(long)]
        x: Option<u32>,

        /// Tile row
        #[arg(long)]
        y: Option<u32>,

        /// Latitude inside the tile (instead of --x/--y)
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude inside the tile (instead of --x/--y)
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,

        /// Output PNG file
        #[arg(short, long, required = true)]
        out: PathBuf,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Render the tiles around a location in parallel
    RenderArea {
        /// Points file (JSON)
        #[arg(short, long)]
        points: PathBuf,

        /// Zoom level
        #[arg(short, long)]
        zoom: u8,

        /// Latitude of the center tile
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude of the center tile
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Tiles on each side of the center tile
        #[arg(long)]
        span: Option<u32>,

        /// Output directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Print the tile holding a coordinate
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Zoom level
        #[arg(short, long)]
        zoom: u8,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show or generate configuration
    Config {
        /// Print an example heatmap.toml
        #[arg(long)]
        example: bool,

        /// Write the effective configuration to a file
        #[arg(long, conflicts_with = "example")]
        write: Option<PathBuf>,
    },
}

fn parse_max_intensity(s: &str) -> Result<MaxIntensity, String> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(MaxIntensity::Auto);
    }
    s.parse::<f64>()
        .map(MaxIntensity::Fixed)
        .map_err(|_| format!("expected a number or \"auto\", got '{}'", s))
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref())?;

    let threads = cli.threads.unwrap_or(config.general.threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("Failed to set thread count")?;

    match cli.command {
        Commands::Render {
            points,
            zoom,
            x,
            y,
            lat,
            lng,
            out,
            style,
        } => {
            let key = commands::resolve_key(zoom, x, y, lat, lng)?;
            commands::render::execute(&config, &points, key, out, &style.into())?;
        }

        Commands::RenderArea {
            points,
            zoom,
            lat,
            lng,
            span,
            out_dir,
            style,
        } => {
            let written = commands::render_area::execute(&config, &points, lat, lng, zoom, span, out_dir, &style.into())?;
            for path in written {
                println!("{}", path.display());
            }
        }

        Commands::Locate { lat, lng, zoom, json } => {
            commands::locate::execute(lat, lng, zoom, json)?;
        }

        Commands::Config { example, write } => {
            if example {
                print!("{}", Config::example_toml()?);
            } else if let Some(path) = write {
                config.save_to_file(&path)?;
                log::info!("Configuration written to {}", path.display());
            } else {
                print!("{}", toml::to_string_pretty(&config).map_err(CliError::from)?);
            }
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => print_error_and_exit(cli_err),
            None => {
                eprintln!("Error: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render_args() {
        let cli = Cli::parse_from([
            "heatmap", "render", "--points", "p.json", "--zoom", "10", "--lat", "-33.9", "--lng", "151.2", "--out",
            "t.png", "--radius", "30", "--max-intensity", "auto",
        ]);
        match cli.command {
            Commands::Render { lat, style, .. } => {
                assert_eq!(lat, Some(-33.9));
                assert_eq!(style.radius, Some(30));
                assert_eq!(style.max_intensity, Some(MaxIntensity::Auto));
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn test_parse_max_intensity() {
        assert_eq!(parse_max_intensity("AUTO"), Ok(MaxIntensity::Auto));
        assert_eq!(parse_max_intensity("2.5"), Ok(MaxIntensity::Fixed(2.5)));
        assert!(parse_max_intensity("hot").is_err());
    }
}
