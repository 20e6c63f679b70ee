use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tabgrid::actor::replay;
use tabgrid::common::config::{Config, config_file};
use tabgrid::common::log;

#[derive(Parser)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-apply a recorded command trace and print the resulting projection.
    Replay {
        /// Trace file with one JSON command per line.
        trace: PathBuf,

        /// Check that the trace loads and applies without printing the
        /// projection.
        #[arg(long)]
        validate: bool,
    },
    /// Print the default configuration as TOML.
    DefaultConfig,
}

fn main() -> anyhow::Result<()> {
    log::init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::read(path)?,
        None => {
            let path = config_file();
            if path.exists() { Config::read(&path)? } else { Config::default() }
        }
    };

    match cli.command {
        Commands::Replay { trace, validate } => {
            let driver = replay::replay(&trace, config.settings)
                .with_context(|| format!("replaying {}", trace.display()))?;
            let items = driver.mediator.engine().items();
            if validate {
                println!("ok: {} ({} items projected)", trace.display(), items.len());
                return Ok(());
            }
            for (index, item) in items.iter().enumerate() {
                let marker = if item.selected { "*" } else { " " };
                println!(
                    "{index:>3} {marker} {key:>6} x{count:<3} {title}",
                    key = item.key,
                    count = item.count,
                    title = item.title,
                );
            }
        }
        Commands::DefaultConfig => {
            print!("{}", toml::to_string_pretty(&Config::default())?);
        }
    }
    Ok(())
}
