mod cli;
mod commands;
mod config;
mod input;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use kappa_core::config::load_dotenv;
use kappa_core::Config;

use crate::cli::CliArgs;
use crate::config::Settings;

fn main() -> Result<()> {
    load_dotenv();
    let env = Config::from_env();

    // Logs go to stderr so stdout carries only the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&env.log_filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    env.log_summary();

    let args = CliArgs::parse();
    let settings = Settings::resolve(&args, &env).context("failed to resolve configuration")?;

    let start = std::time::Instant::now();
    let value = commands::run(&args.command, &settings)?;
    info!("Done in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

    let rendered = if settings.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    println!("{}", rendered);
    Ok(())
}
