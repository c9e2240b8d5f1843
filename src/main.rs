//! assetgate CLI entry point

use assetgate::cli::{Cli, Command, EXIT_ERROR, EXIT_SUCCESS};
use assetgate::config::ColorOption;
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let color = ColorOption::from(cli.color);

    let exit_code = match cli.command {
        Command::Init { force } => match assetgate::cli::init::run_init(force) {
            Ok(result) => {
                for path in &result.created {
                    println!("Created {}", path);
                }
                for path in &result.overwritten {
                    println!("Overwrote {}", path);
                }
                for path in &result.skipped {
                    println!("Skipped {} (already exists)", path);
                }
                EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                EXIT_ERROR
            }
        },
        Command::Classify { paths, format } => {
            assetgate::cli::classify::run_classify(&paths, format, color)
        }
        Command::List { format } => assetgate::cli::list::run_list(format, color),
        Command::Rule { action } => assetgate::cli::rule::run_rule(action),
        Command::Scope { action } => assetgate::cli::scope::run_scope(action),
        Command::Blacklist { action } => assetgate::cli::blacklist::run_blacklist(action),
        Command::Export => assetgate::cli::export::run_export(),
        Command::Run(args) => assetgate::cli::run::run_run(&args, color),
    };

    process::exit(exit_code);
}

/// Logs go to stderr; `ASSETGATE_LOG` takes an env-filter directive
fn init_tracing() {
    let filter = EnvFilter::try_from_env("ASSETGATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
