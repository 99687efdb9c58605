use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    review_harvest::logging::init().context("init logging")?;

    let cli = review_harvest::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        review_harvest::cli::Command::Show(args) => {
            review_harvest::run::show(args).await.context("show")?;
        }
        review_harvest::cli::Command::Season(args) => {
            review_harvest::run::season(args).await.context("season")?;
        }
    }

    Ok(())
}
