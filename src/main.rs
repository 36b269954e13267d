mod buckets;
mod categorizer;
mod cli;
mod dialect;
mod error;
mod fmt;
mod importer;
mod models;
mod publish;
mod settings;
mod sorter;
mod store;
mod tui;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, RulesCommands};

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => cli::menu::run(),
        Some(Commands::Init {
            sheet_url,
            data_dir,
        }) => cli::init::run(sheet_url, data_dir),
        Some(Commands::Import { dir }) => cli::import::run(dir.as_deref()),
        Some(Commands::Sort { dir }) => cli::sort::run(dir.as_deref()),
        Some(Commands::Rules { command }) => match command {
            RulesCommands::List => cli::rules::list(),
            RulesCommands::Add { trigger, category } => cli::rules::add(&trigger, &category),
            RulesCommands::Remove { trigger, category } => cli::rules::remove(&trigger, &category),
        },
        Some(Commands::Report { month, dir }) => cli::report::run(month, dir.as_deref()),
        Some(Commands::Publish { dir }) => cli::publish::run(dir.as_deref()),
        Some(Commands::Status) => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
