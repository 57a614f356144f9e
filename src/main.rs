//! Trama CLI — provider-agnostic infrastructure graph compiler.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "trama",
    version,
    about = "Provider-agnostic infrastructure graph compiler — typed components, dependency resolution, diff-driven reconciliation"
)]
struct Cli {
    #[command(subcommand)]
    command: trama::cli::Commands,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = trama::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
