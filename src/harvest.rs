use std::time::Duration;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::discover;
use crate::expand;
use crate::extract;
use crate::fetch::{Document, DocumentFetcher, FetchError};
use crate::formats::{ReviewRecord, SkippedPage};
use crate::pages::{PageReference, SITE_ORIGIN};

/// Pacing and hardening knobs for one run. Defaults mirror the pacing the
/// target site is known to tolerate.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Settle wait after the first render of a page.
    pub initial_settle: Duration,
    /// Settle wait after each reveal-more action.
    pub reveal_settle: Duration,
    /// Pause between consecutive page visits.
    pub politeness_delay: Duration,
    /// Safety cap on reveal-more actions per page.
    pub max_reveals: u32,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            initial_settle: Duration::from_secs(5),
            reveal_settle: Duration::from_secs(2),
            politeness_delay: Duration::from_secs(5),
            max_reveals: 500,
        }
    }
}

/// Everything one run accumulated, in traversal order. Append-only while
/// the run is live; pages that failed to load are recorded, not retried.
#[derive(Debug, Default)]
pub struct HarvestResult {
    pub records: Vec<ReviewRecord>,
    pub pages_visited: u32,
    pub skipped: Vec<SkippedPage>,
    pub aborted: bool,
}

impl HarvestResult {
    pub fn pages_skipped(&self) -> u32 {
        self.skipped.len() as u32
    }
}

/// Drives the show -> season -> episode traversal: derives review pages,
/// expands and extracts them, tags records with provenance, paces visits,
/// and skips (but records) pages that fail to load.
pub struct Harvester<'a, F: DocumentFetcher + ?Sized> {
    fetcher: &'a F,
    config: HarvestConfig,
    cancel: CancellationToken,
    origin: Url,
}

impl<'a, F: DocumentFetcher + ?Sized> Harvester<'a, F> {
    pub fn new(fetcher: &'a F, config: HarvestConfig, cancel: CancellationToken) -> Self {
        let origin = Url::parse(SITE_ORIGIN).expect("site origin is a valid url");
        Self {
            fetcher,
            config,
            cancel,
            origin,
        }
    }

    /// Harvests a whole show: the show-level review page first (provenance
    /// 0/0), then every discovered season, episode by episode.
    pub async fn run_show(&self, root: &PageReference) -> anyhow::Result<HarvestResult> {
        let mut result = HarvestResult::default();

        let show_reviews = root.reviews_page().context("derive show review page")?;
        self.harvest_page(&show_reviews, 0, 0, &mut result).await;

        let first_listing = root.season_listing(1).context("derive season listing")?;
        if self.check_abort(&mut result) {
            return Ok(result);
        }

        let listing_doc = match self.fetch_listing(&first_listing).await {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(url = %first_listing, %err, "season discovery listing failed to load; keeping what was harvested");
                result.skipped.push(SkippedPage {
                    season_index: 1,
                    episode_index: 0,
                    url: first_listing.as_str().to_owned(),
                });
                return Ok(result);
            }
        };
        self.pause().await;

        let mut seasons = discover::discover_seasons(&listing_doc);
        if seasons.is_empty() {
            tracing::warn!(url = %first_listing, "no season selector found; assuming a single season");
            seasons = vec![1];
        }
        tracing::info!(seasons = seasons.len(), "discovered season set");

        for season in seasons {
            if self.check_abort(&mut result) {
                return Ok(result);
            }

            let listing = root
                .season_listing(season)
                .context("derive season listing")?;
            let doc = match self.fetch_listing(&listing).await {
                Ok(doc) => doc,
                Err(err) => {
                    tracing::warn!(url = %listing, season, %err, "skipping season after listing fetch failure");
                    result.skipped.push(SkippedPage {
                        season_index: season,
                        episode_index: 0,
                        url: listing.as_str().to_owned(),
                    });
                    continue;
                }
            };
            self.pause().await;

            self.harvest_season(&doc, season, &mut result).await?;
        }

        Ok(result)
    }

    /// Harvests one season listing plus the show-level review page. The
    /// season index is read from the listing URL's `season` query.
    pub async fn run_season(
        &self,
        listing: &PageReference,
        show_root: &PageReference,
    ) -> anyhow::Result<HarvestResult> {
        let mut result = HarvestResult::default();

        let show_reviews = show_root
            .reviews_page()
            .context("derive show review page")?;
        self.harvest_page(&show_reviews, 0, 0, &mut result).await;

        if self.check_abort(&mut result) {
            return Ok(result);
        }

        let season = listing.season_number().unwrap_or_else(|| {
            tracing::warn!(url = %listing, "no season query in listing url; tagging as season 1");
            1
        });

        let doc = match self.fetch_listing(listing).await {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(url = %listing, season, %err, "season listing failed to load; keeping what was harvested");
                result.skipped.push(SkippedPage {
                    season_index: season,
                    episode_index: 0,
                    url: listing.as_str().to_owned(),
                });
                return Ok(result);
            }
        };
        self.pause().await;

        self.harvest_season(&doc, season, &mut result).await?;
        Ok(result)
    }

    async fn harvest_season(
        &self,
        listing_doc: &Document,
        season: u32,
        result: &mut HarvestResult,
    ) -> anyhow::Result<()> {
        let episodes = discover::discover_episode_links(listing_doc, &self.origin);
        if episodes.is_empty() {
            tracing::info!(season, "season listing yielded no episode links");
            return Ok(());
        }
        tracing::info!(season, episodes = episodes.len(), "harvesting season");

        for (position, episode_ref) in episodes.iter().enumerate() {
            if self.check_abort(result) {
                return Ok(());
            }

            let episode = episode_ref.episode_index().unwrap_or_else(|| {
                tracing::warn!(url = %episode_ref, "no episode marker in reference; using listing position");
                position as u32 + 1
            });
            let reviews = episode_ref
                .reviews_page()
                .context("derive episode review page")?;
            self.harvest_page(&reviews, season, episode, result).await;
        }

        Ok(())
    }

    /// Expands and extracts one review page. A fetch failure skips the page
    /// and records its provenance; the run continues.
    async fn harvest_page(
        &self,
        page: &PageReference,
        season: u32,
        episode: u32,
        result: &mut HarvestResult,
    ) {
        match expand::expand(self.fetcher, page, &self.config).await {
            Ok(doc) => {
                let mut records = extract::extract(&doc);
                for record in &mut records {
                    record.season_index = season;
                    record.episode_index = episode;
                }
                tracing::info!(
                    url = %page,
                    season,
                    episode,
                    reviews = records.len(),
                    "harvested review page"
                );
                result.records.extend(records);
                result.pages_visited += 1;
            }
            Err(err) => {
                tracing::warn!(url = %page, season, episode, %err, "skipping review page after fetch failure");
                result.skipped.push(SkippedPage {
                    season_index: season,
                    episode_index: episode,
                    url: page.as_str().to_owned(),
                });
            }
        }

        self.pause().await;
    }

    async fn fetch_listing(&self, listing: &PageReference) -> Result<Document, FetchError> {
        self.fetcher.fetch_and_render(listing.url()).await
    }

    /// Cancellation is honored between page visits, never mid-fetch.
    fn check_abort(&self, result: &mut HarvestResult) -> bool {
        if self.cancel.is_cancelled() {
            if !result.aborted {
                tracing::warn!(
                    records = result.records.len(),
                    "run aborted; keeping accumulated records"
                );
            }
            result.aborted = true;
        }
        result.aborted
    }

    async fn pause(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(self.config.politeness_delay) => {}
        }
    }
}
