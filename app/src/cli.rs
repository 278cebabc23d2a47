//! Command-line surface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Scrape job boards (LinkedIn, SEEK, Indeed) into a local buffer.
#[derive(Debug, Parser)]
#[command(name = "jobharvest", version, about)]
pub struct Cli {
    /// Alternative config file (defaults to the XDG config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape the listing (or posting) at a URL
    Scrape(ScrapeArgs),
    /// Keep a page open and answer START_SCRAPING requests read from stdin
    Serve(ServeArgs),
    /// Show or clear the stored results
    Buffer {
        /// Remove every stored record
        #[arg(long)]
        clear: bool,
    },
    /// Print the effective configuration
    Config {
        /// Also write it to the default config location
        #[arg(long)]
        write: bool,
    },
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Search results or posting URL
    pub url: String,

    /// Visit at most this many cards per page
    #[arg(long)]
    pub max_cards: Option<usize>,

    /// Follow next-page links up to this many pages
    #[arg(long)]
    pub pages: Option<u32>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Treat the URL as a single posting page
    #[arg(long)]
    pub detail: bool,

    /// Replay a saved HTML snapshot of the URL instead of launching a browser
    #[arg(long, value_name = "HTML_FILE")]
    pub replay: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Page to open before the first request
    pub url: String,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Replay a saved HTML snapshot of the URL instead of launching a browser
    #[arg(long, value_name = "HTML_FILE")]
    pub replay: Option<PathBuf>,
}
