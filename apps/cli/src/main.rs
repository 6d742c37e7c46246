//! PaperDigest CLI.
//!
//! Ingests the HTML rendering of scientific papers: extracts the key
//! sections, crawls linked repository and project pages for figures, and
//! downloads validated image assets.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
