use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::harvest::HarvestConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Harvest a whole show: the show-level review page plus every
    /// discovered season, episode by episode.
    Show(ShowArgs),
    /// Harvest one season listing plus the show-level review page.
    Season(SeasonArgs),
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Show title page URL (must be http/https).
    #[arg(long)]
    pub url: String,

    /// Output path for the CSV artifact.
    #[arg(long)]
    pub out: String,

    #[command(flatten)]
    pub pacing: PacingArgs,
}

#[derive(Debug, Args)]
pub struct SeasonArgs {
    /// Season listing URL (e.g. `<title page>/episodes/?season=1`).
    #[arg(long)]
    pub season_url: String,

    /// Show title page URL, for the show-level review page.
    #[arg(long)]
    pub show_url: String,

    /// Output path for the CSV artifact.
    #[arg(long)]
    pub out: String,

    #[command(flatten)]
    pub pacing: PacingArgs,
}

#[derive(Debug, Args)]
pub struct PacingArgs {
    /// Pause between consecutive page visits (politeness).
    #[arg(long, default_value_t = 5000)]
    pub delay_ms: u64,

    /// Settle wait after the first render of a page.
    #[arg(long, default_value_t = 5000)]
    pub settle_ms: u64,

    /// Settle wait after each reveal-more action.
    #[arg(long, default_value_t = 2000)]
    pub reveal_settle_ms: u64,

    /// Safety cap on reveal-more actions per page.
    #[arg(long, default_value_t = 500)]
    pub max_reveals: u32,

    /// User-Agent header sent with page requests.
    #[arg(long, default_value = "review-harvest/0.1")]
    pub user_agent: String,
}

impl PacingArgs {
    pub fn to_config(&self) -> HarvestConfig {
        HarvestConfig {
            initial_settle: Duration::from_millis(self.settle_ms),
            reveal_settle: Duration::from_millis(self.reveal_settle_ms),
            politeness_delay: Duration::from_millis(self.delay_ms),
            max_reveals: self.max_reveals,
        }
    }
}
