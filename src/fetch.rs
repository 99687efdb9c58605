use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use scraper::{Html, Selector};
use url::Url;

/// Element id of the reveal-more control on a review listing.
pub const LOAD_MORE_TRIGGER: &str = "load-more-trigger";

/// A rendered page. Revealing more content appends a segment rather than
/// replacing the whole page, so the newest segment is always the one that
/// carries (or lacks) the next reveal-more control.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    url: Url,
    segments: Vec<String>,
}

impl Document {
    pub fn new(url: Url, html: String) -> Self {
        Self {
            url,
            segments: vec![html],
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Full page markup, initial render plus every revealed segment.
    pub fn html(&self) -> String {
        self.segments.concat()
    }

    /// The most recently loaded segment.
    pub fn latest(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn push_segment(&mut self, html: String) {
        self.segments.push(html);
    }
}

/// Failure to load or render a page. Distinct from structural absence
/// (a pattern matching zero elements), which is never an error.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetch {url}: {reason}")]
    Transport { url: String, reason: String },
    #[error("fetch {url}: server returned status {status}")]
    Status { url: String, status: u16 },
}

/// Fetch-and-render capability, injected into discovery, expansion and the
/// orchestrator so they stay independent of any one transport.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch_and_render(&self, url: &Url) -> Result<Document, FetchError>;

    /// Invokes the reveal-more control identified by `marker` and returns the
    /// refreshed document, or `None` when the control is absent.
    async fn trigger(&self, doc: &Document, marker: &str) -> Result<Option<Document>, FetchError>;
}

/// reqwest-backed fetcher. Reveal-more is served by the site as an ajax
/// continuation: the listing carries a pagination key, and each fetched
/// fragment carries the next key until the listing is exhausted.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(user_agent.to_owned())
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }

    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|err| FetchError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|err| FetchError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch_and_render(&self, url: &Url) -> Result<Document, FetchError> {
        let html = self.get_text(url).await?;
        Ok(Document::new(url.clone(), html))
    }

    async fn trigger(&self, doc: &Document, marker: &str) -> Result<Option<Document>, FetchError> {
        let Some(state) = pagination_state(doc.latest(), marker) else {
            return Ok(None);
        };

        let continuation = continuation_url(doc.url(), &state).map_err(|err| {
            FetchError::Transport {
                url: doc.url().to_string(),
                reason: format!("build continuation url: {err}"),
            }
        })?;

        let fragment = self.get_text(&continuation).await?;
        let mut next = doc.clone();
        next.push_segment(fragment);
        Ok(Some(next))
    }
}

struct PaginationState {
    key: String,
    ajax_path: Option<String>,
}

/// Reads the reveal-more control out of one page segment. None when either
/// the trigger element or its pagination key is missing, which is the
/// normal end-of-listing signal.
fn pagination_state(segment: &str, marker: &str) -> Option<PaginationState> {
    let html = Html::parse_document(segment);

    let trigger_selector =
        Selector::parse(&format!("#{marker}")).expect("valid trigger selector");
    html.select(&trigger_selector).next()?;

    let data_selector = Selector::parse("div.load-more-data").expect("valid data selector");
    let data = html.select(&data_selector).next()?;
    let key = data.value().attr("data-key")?.trim();
    if key.is_empty() {
        return None;
    }

    Some(PaginationState {
        key: key.to_owned(),
        ajax_path: data.value().attr("data-ajaxurl").map(str::to_owned),
    })
}

fn continuation_url(page: &Url, state: &PaginationState) -> anyhow::Result<Url> {
    let mut url = match &state.ajax_path {
        Some(path) => page.join(path)?,
        None => {
            let mut base = page.clone();
            base.set_query(None);
            let path = base.path().trim_end_matches('/').to_owned();
            base.set_path(&format!("{path}/_ajax"));
            base
        }
    };
    url.query_pairs_mut()
        .clear()
        .append_pair("paginationKey", &state.key);
    Ok(url)
}
