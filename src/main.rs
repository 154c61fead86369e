use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

/// Debug adapter for BlitzMax programs. Speaks DAP on stdin/stdout.
#[derive(Debug, Parser)]
#[command(name = "bmx-debugger", version)]
struct Cli {
    /// Append the adapter log to this file instead of stderr.
    #[arg(long, env = "BMX_DEBUGGER_LOG")]
    log_file: Option<PathBuf>,
}

fn init_logger(log_file: Option<&Path>) -> std::io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    // stdout carries the DAP stream.
    builder.target(env_logger::Target::Stderr);

    if let Some(path) = log_file {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn main() -> bmx_debugger::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.log_file.as_deref())?;

    log::info!("=== bmx-debugger {} started ===", env!("CARGO_PKG_VERSION"));
    bmx_debugger::dap::run_dap_mode()?;
    log::info!("=== bmx-debugger exiting ===");

    Ok(())
}
