use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::cli::{PacingArgs, SeasonArgs, ShowArgs};
use crate::export;
use crate::fetch::HttpFetcher;
use crate::harvest::{HarvestResult, Harvester};
use crate::pages::PageReference;

pub async fn show(args: ShowArgs) -> anyhow::Result<()> {
    let out_path = PathBuf::from(&args.out);
    export::ensure_artifact_path_is_free(&out_path)?;

    let root = parse_page_url(&args.url).context("parse --url")?;

    let (fetcher, cancel) = setup(&args.pacing)?;
    let harvester = Harvester::new(&fetcher, args.pacing.to_config(), cancel);

    let started = Instant::now();
    let result = harvester.run_show(&root).await?;
    finish(result, &out_path, started)
}

pub async fn season(args: SeasonArgs) -> anyhow::Result<()> {
    let out_path = PathBuf::from(&args.out);
    export::ensure_artifact_path_is_free(&out_path)?;

    let listing = parse_page_url(&args.season_url).context("parse --season-url")?;
    let show_root = parse_page_url(&args.show_url).context("parse --show-url")?;

    let (fetcher, cancel) = setup(&args.pacing)?;
    let harvester = Harvester::new(&fetcher, args.pacing.to_config(), cancel);

    let started = Instant::now();
    let result = harvester.run_season(&listing, &show_root).await?;
    finish(result, &out_path, started)
}

fn parse_page_url(input: &str) -> anyhow::Result<PageReference> {
    let reference = PageReference::parse(input)?;
    let scheme = reference.url().scheme();
    if scheme != "http" && scheme != "https" {
        anyhow::bail!("page url must be http/https: {reference}");
    }
    Ok(reference)
}

/// Builds the fetcher and wires Ctrl-C to a cancellation token so an
/// interrupted run still flushes whatever it accumulated.
fn setup(pacing: &PacingArgs) -> anyhow::Result<(HttpFetcher, CancellationToken)> {
    let fetcher = HttpFetcher::new(&pacing.user_agent).context("build http fetcher")?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping after the current page");
            signal_cancel.cancel();
        }
    });

    Ok((fetcher, cancel))
}

fn finish(result: HarvestResult, out_path: &std::path::Path, started: Instant) -> anyhow::Result<()> {
    export::write_csv(&result.records, out_path)?;

    for skipped in &result.skipped {
        tracing::warn!(
            season = skipped.season_index,
            episode = skipped.episode_index,
            url = %skipped.url,
            "page was skipped during this run"
        );
    }
    tracing::info!(
        pages_visited = result.pages_visited,
        pages_skipped = result.pages_skipped(),
        records = result.records.len(),
        aborted = result.aborted,
        elapsed_secs = started.elapsed().as_secs(),
        "harvest run finished"
    );

    Ok(())
}
