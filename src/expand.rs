use crate::fetch::{Document, DocumentFetcher, FetchError, LOAD_MORE_TRIGGER};
use crate::harvest::HarvestConfig;
use crate::pages::PageReference;

/// Fully expands a dynamically paginated page.
///
/// Loading: fetch the page, then wait the initial settle interval.
/// Revealing: while the reveal-more control is present, invoke it and wait
/// the (shorter) reveal settle interval. Done: the control is absent, which
/// is the sole normal termination; fetch failures propagate as
/// [`FetchError`]. `max_reveals` caps the loop against a control that never
/// disappears; hitting it returns the page expanded so far.
pub async fn expand<F: DocumentFetcher + ?Sized>(
    fetcher: &F,
    page: &PageReference,
    config: &HarvestConfig,
) -> Result<Document, FetchError> {
    let mut doc = fetcher.fetch_and_render(page.url()).await?;
    tokio::time::sleep(config.initial_settle).await;

    let mut reveals = 0u32;
    loop {
        if reveals >= config.max_reveals {
            tracing::warn!(
                url = %page,
                reveals,
                "reveal cap reached; continuing with partially expanded page"
            );
            break;
        }

        match fetcher.trigger(&doc, LOAD_MORE_TRIGGER).await? {
            Some(next) => {
                doc = next;
                reveals += 1;
                tokio::time::sleep(config.reveal_settle).await;
            }
            None => break,
        }
    }

    tracing::debug!(url = %page, reveals, "review page expanded");
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use url::Url;

    use super::*;

    /// Serves one canned page, then reveals queued fragments one trigger at
    /// a time. Counts successful reveals.
    struct ScriptedFetcher {
        initial: String,
        fragments: Mutex<Vec<String>>,
        reveals: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(initial: &str, fragments: Vec<String>) -> Self {
            Self {
                initial: initial.to_owned(),
                fragments: Mutex::new(fragments),
                reveals: AtomicUsize::new(0),
            }
        }

        fn reveal_count(&self) -> usize {
            self.reveals.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentFetcher for ScriptedFetcher {
        async fn fetch_and_render(&self, url: &Url) -> Result<Document, FetchError> {
            Ok(Document::new(url.clone(), self.initial.clone()))
        }

        async fn trigger(
            &self,
            doc: &Document,
            marker: &str,
        ) -> Result<Option<Document>, FetchError> {
            if !doc.latest().contains(&format!("id=\"{marker}\"")) {
                return Ok(None);
            }
            let mut fragments = self.fragments.lock().unwrap();
            if fragments.is_empty() {
                return Ok(None);
            }
            self.reveals.fetch_add(1, Ordering::SeqCst);
            let mut next = doc.clone();
            next.push_segment(fragments.remove(0));
            Ok(Some(next))
        }
    }

    fn fast_config() -> HarvestConfig {
        HarvestConfig {
            initial_settle: std::time::Duration::ZERO,
            reveal_settle: std::time::Duration::ZERO,
            politeness_delay: std::time::Duration::ZERO,
            ..HarvestConfig::default()
        }
    }

    fn reviews_page() -> PageReference {
        PageReference::parse("https://www.imdb.com/title/tt1/reviews?ref_=tt_urv").unwrap()
    }

    const TRIGGER: &str = r#"<button id="load-more-trigger"></button>"#;

    #[tokio::test]
    async fn expand_terminates_after_queued_reveals_are_exhausted() {
        let fetcher = ScriptedFetcher::new(
            &format!(r#"<div class="lister-item">r1</div>{TRIGGER}"#),
            vec![
                format!(r#"<div class="lister-item">r2</div>{TRIGGER}"#),
                r#"<div class="lister-item">r3</div>"#.to_owned(),
            ],
        );

        let doc = expand(&fetcher, &reviews_page(), &fast_config())
            .await
            .unwrap();

        assert_eq!(fetcher.reveal_count(), 2);
        assert_eq!(doc.html().matches("lister-item").count(), 3);
    }

    #[tokio::test]
    async fn expand_of_already_expanded_page_performs_zero_reveals() {
        let fetcher = ScriptedFetcher::new(r#"<div class="lister-item">only</div>"#, vec![]);

        let first = expand(&fetcher, &reviews_page(), &fast_config())
            .await
            .unwrap();
        let second = expand(&fetcher, &reviews_page(), &fast_config())
            .await
            .unwrap();

        assert_eq!(fetcher.reveal_count(), 0);
        assert_eq!(first.html(), second.html());
    }

    #[tokio::test]
    async fn expand_stops_at_reveal_cap_when_trigger_never_disappears() {
        let page_with_trigger = format!(r#"<div class="lister-item">r</div>{TRIGGER}"#);
        let fragments: Vec<String> = (0..50).map(|_| page_with_trigger.clone()).collect();
        let fetcher = ScriptedFetcher::new(&page_with_trigger, fragments);

        let config = HarvestConfig {
            max_reveals: 3,
            ..fast_config()
        };
        let doc = expand(&fetcher, &reviews_page(), &config).await.unwrap();

        assert_eq!(fetcher.reveal_count(), 3);
        assert_eq!(doc.html().matches("lister-item").count(), 4);
    }

    #[tokio::test]
    async fn expand_propagates_fetch_failure() {
        struct FailingFetcher;

        #[async_trait]
        impl DocumentFetcher for FailingFetcher {
            async fn fetch_and_render(&self, url: &Url) -> Result<Document, FetchError> {
                Err(FetchError::Transport {
                    url: url.to_string(),
                    reason: "connection reset".to_owned(),
                })
            }

            async fn trigger(
                &self,
                _doc: &Document,
                _marker: &str,
            ) -> Result<Option<Document>, FetchError> {
                Ok(None)
            }
        }

        let err = expand(&FailingFetcher, &reviews_page(), &fast_config())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
