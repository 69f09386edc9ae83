//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cheeseshop - PyPI-compatible package index with upstream proxying
#[derive(Parser, Debug)]
#[command(name = "cheeseshop")]
#[command(about = "PyPI-compatible package index with upstream proxying", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to the layered lookup)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the releases of a package
    Releases {
        /// Package name (any spelling)
        name: String,
    },

    /// Show metadata and files of one release
    Release {
        /// Package name
        name: String,

        /// Release version
        version: String,
    },

    /// Search package names and descriptions
    Search {
        /// Terms matched against package names
        terms: Vec<String>,

        /// Terms looked for in package descriptions
        #[arg(long)]
        description: Vec<String>,

        /// How name and description matches combine ("and" or "or")
        #[arg(long, default_value = "or")]
        operator: String,
    },

    /// Copy upstream releases of a package into the local catalog
    Mirror {
        /// Package name
        name: String,
    },

    /// Download a release file through the mirror
    Fetch {
        /// Package name
        name: String,

        /// Release version
        version: String,

        /// File name as listed in the release
        filename: String,

        /// Where to write the file
        #[arg(short, long)]
        output: PathBuf,
    },
}
