use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use covtree::cli;
use covtree::frame::Endianness;

/// covtree — Per-test coverage report to directory/file coverage tree.
#[derive(Parser)]
#[command(name = "covtree", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Path marker to exclude (repeatable; replaces the configured list).
    #[arg(long, global = true)]
    exclude: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print per-directory and total coverage for a report.
    Summary {
        /// Path to the coverage report.
        report: PathBuf,
    },

    /// Render the coverage tree as JSON pages.
    Render {
        /// Path to the coverage report.
        report: PathBuf,

        /// Output directory.
        out_dir: PathBuf,

        /// Directory to resolve source files against, instead of the
        /// prefix recorded in the report.
        #[arg(long)]
        source_root: Option<PathBuf>,
    },

    /// Decode the strings in a binary frame file.
    Frame {
        /// Path to the binary file.
        file: PathBuf,

        /// Length fields are little-endian (default: big-endian).
        #[arg(long)]
        little_endian: bool,

        /// Stop after this many strings.
        #[arg(long)]
        count: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Summary { report } => {
            let config = cli::resolve_config(cli.config.as_deref(), None, &cli.exclude)?;
            cli::cmd_summary(&report, &config)?
        }
        Commands::Render {
            report,
            out_dir,
            source_root,
        } => {
            let config = cli::resolve_config(cli.config.as_deref(), source_root, &cli.exclude)?;
            cli::cmd_render(&report, &out_dir, &config)?
        }
        Commands::Frame {
            file,
            little_endian,
            count,
        } => {
            let endian = if little_endian {
                Endianness::Little
            } else {
                Endianness::Big
            };
            cli::cmd_frame(&file, endian, count)?
        }
    };

    print!("{output}");
    Ok(())
}
