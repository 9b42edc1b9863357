mod cli;
mod commands;
mod error;

use crate::cli::{Cli, Commands};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use std::io;
use std::process::ExitCode;
use surrogate_config::Config;
use surrogate_index::Store;
use tracing_subscriber::EnvFilter;

fn init_tracing(cli: &Cli) {
    // RUST_LOG wins; otherwise the level follows -v/-q. Logs never touch
    // stdout, which carries the reports.
    let fallback = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (false, true) => "error",
        (false, false) => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut out = io::stdout().lock();
    if let Commands::Hash(args) = &cli.command {
        return commands::hash(args, &mut out);
    }

    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(path) = cli.store {
        config.store.path = path;
    }
    let store = Store::open(&config.store.path, &config.store_options()).or_raise(|| ErrorKind::Store)?;

    match &cli.command {
        Commands::Ingest(args) => commands::ingest(&config, &store, args, &mut out),
        Commands::Purge(args) => commands::purge(&store, args, &mut io::stdin().lock(), &mut out),
        Commands::Inspect(args) => commands::inspect(&config, &store, args, &mut out),
        Commands::Verify => commands::verify(&config, &store, &mut out),
        Commands::Hash(args) => commands::hash(args, &mut out),
    }
}
