//! CLI entry point for the localise-crop-segment pipeline

use clap::Parser;
use jawseg::io::cli::{Cli, InferenceCommand};

fn main() -> jawseg::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    InferenceCommand::new(cli).run().map(|_| ())
}
