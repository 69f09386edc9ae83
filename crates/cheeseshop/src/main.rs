//! Cheeseshop CLI binary.
//!
//! This binary provides command-line access to the package index:
//! - Query releases, release files and search upstream and locally
//! - Mirror upstream packages and fetch their files into storage

use cheeseshop::{Cheeseshop, CheeseshopConfig, init_tracing};
use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{
        Cli, Commands, handle_fetch, handle_mirror, handle_release, handle_releases, handle_search,
    };

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CheeseshopConfig::from_file(path)?,
        None => CheeseshopConfig::load()?,
    };

    init_tracing(config.logging(), cli.verbose)?;

    let shop = Cheeseshop::from_config(&config).await?;

    #[cfg(unix)]
    let _signals = shop.watch_signals()?;

    // Execute the requested command
    match cli.command {
        Commands::Releases { name } => {
            handle_releases(&shop, &name).await?;
        }

        Commands::Release { name, version } => {
            handle_release(&shop, &name, &version).await?;
        }

        Commands::Search {
            terms,
            description,
            operator,
        } => {
            handle_search(&shop, terms, description, &operator).await?;
        }

        Commands::Mirror { name } => {
            handle_mirror(&shop, &name).await?;
        }

        Commands::Fetch {
            name,
            version,
            filename,
            output,
        } => {
            handle_fetch(&shop, &name, &version, &filename, &output).await?;
        }
    }

    Ok(())
}
