#![recursion_limit = "256"]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bert_nmt=info".parse().context("invalid log directive")?),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
