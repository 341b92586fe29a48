use clap::Parser;
use fitbridge_core::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    run(Cli::parse())
}
