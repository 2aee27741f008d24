//! Binary entry point for the `rabbit-ops` CLI.

use clap::Parser;
use rabbit_ops_cli::{run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
