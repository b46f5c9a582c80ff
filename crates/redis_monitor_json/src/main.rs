use std::io;
use std::process::ExitCode;

use clap::Parser;
use redis_monitor::{convert, ConvertConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "redis-monitor-to-json", version)]
#[command(about = "Convert a MONITOR command trace on stdin into JSON lines on stdout")]
struct Cli {}

fn main() -> ExitCode {
    let _cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    match convert(stdin.lock(), stdout.lock(), ConvertConfig::default()) {
        Ok(summary) => {
            debug!(events = summary.events, "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            debug!(kind = ?err.kind(), "conversion failed");
            eprintln!("redis-monitor-to-json: {err}");
            ExitCode::FAILURE
        }
    }
}
