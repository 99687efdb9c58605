use std::sync::OnceLock;

use anyhow::Context as _;
use regex::Regex;
use url::Url;

/// Origin that relative episode hrefs are resolved against.
pub const SITE_ORIGIN: &str = "https://www.imdb.com";

/// Fixed suffix that turns a title or episode page into its review listing.
const REVIEWS_SUFFIX: &str = "/reviews?ref_=tt_urv";

fn episode_index_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ttep_(?:ep)?(\d+)$").expect("valid episode index regex"))
}

fn season_query_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]season=(\d+)").expect("valid season query regex"))
}

/// An absolute URL to one page of the target site. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageReference(Url);

impl PageReference {
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let url = Url::parse(input).with_context(|| format!("parse page url: {input}"))?;
        Ok(Self(url))
    }

    /// Resolves a (possibly relative) href against an origin page.
    pub fn from_href(origin: &Url, href: &str) -> anyhow::Result<Self> {
        let url = origin
            .join(href)
            .with_context(|| format!("resolve href against {origin}: {href}"))?;
        Ok(Self(url))
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Review listing for this page: everything after the last `/` is
    /// dropped (trailing slash or query suffix alike) and the fixed review
    /// suffix appended.
    pub fn reviews_page(&self) -> anyhow::Result<PageReference> {
        let s = self.0.as_str();
        let base = s.rsplit_once('/').map(|(head, _)| head).unwrap_or(s);
        PageReference::parse(&format!("{base}{REVIEWS_SUFFIX}"))
    }

    /// Episode listing for one season of the show rooted at this title page.
    pub fn season_listing(&self, season: u32) -> anyhow::Result<PageReference> {
        let base = self.0.as_str().trim_end_matches('/');
        PageReference::parse(&format!("{base}/episodes/?season={season}"))
    }

    /// Episode number carried in the reference's trailing episode marker,
    /// e.g. `...?ref_=ttep_ep3` -> 3. None when the marker is absent.
    pub fn episode_index(&self) -> Option<u32> {
        episode_index_regex()
            .captures(self.0.as_str())
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Season number carried in a season listing's query, if any.
    pub fn season_number(&self) -> Option<u32> {
        season_query_regex()
            .captures(self.0.as_str())
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl std::fmt::Display for PageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
