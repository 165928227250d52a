use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use beorc::build::build_site;
use beorc::config::{Config, Options};
use beorc::logger;

/// A deterministic markdown blog generator.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Show per-file diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the site into the output directory
    #[command(visible_alias = "b")]
    Build {
        /// Include draft posts in the output
        #[arg(long)]
        drafts: bool,

        /// Number of parser threads (defaults to the CPU count)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Output directory (defaults to `public/` next to the project file)
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::set_verbose(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger::error("beorc", &err.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Build {
            drafts,
            threads,
            output,
        } => {
            let cwd = std::env::current_dir()?;
            let config = Config::from_directory(
                &cwd,
                Options {
                    output_directory: output,
                    threads,
                    include_drafts: drafts,
                },
            )?;
            build_site(&config)?;
            Ok(())
        }
    }
}
