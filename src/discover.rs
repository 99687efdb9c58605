use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::fetch::Document;
use crate::pages::PageReference;

/// Episode links end with this marker. The site writes it as `ttep_epN`;
/// the bare `ttep_N` shape is accepted too, and N may be any digit run.
fn episode_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ttep_(?:ep)?\d+$").expect("valid episode marker regex"))
}

/// Scans a season listing for episode links: every href ending with the
/// episode marker, deduplicated, sorted lexicographically for deterministic
/// ordering, and resolved against `origin`. Zero matches is a valid empty
/// result; the caller decides whether that is fatal.
pub fn discover_episode_links(doc: &Document, origin: &Url) -> Vec<PageReference> {
    let html = Html::parse_document(&doc.html());
    let anchors = Selector::parse("a[href]").expect("valid anchor selector");

    let hrefs: BTreeSet<&str> = html
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| episode_marker_regex().is_match(href))
        .collect();

    hrefs
        .into_iter()
        .filter_map(|href| match PageReference::from_href(origin, href) {
            Ok(reference) => Some(reference),
            Err(err) => {
                tracing::debug!(href, %err, "dropping unresolvable episode href");
                None
            }
        })
        .collect()
}

/// Reads the set of seasons out of a season listing's selector dropdown,
/// ascending and deduplicated. Empty when the dropdown is absent.
pub fn discover_seasons(doc: &Document) -> Vec<u32> {
    let html = Html::parse_document(&doc.html());
    let options = Selector::parse("select#bySeason option").expect("valid season selector");

    let seasons: BTreeSet<u32> = html
        .select(&options)
        .filter_map(|option| option.value().attr("value"))
        .filter_map(|value| value.trim().parse().ok())
        .collect();

    seasons.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(body: &str) -> Document {
        let url = Url::parse("https://www.imdb.com/title/tt1/episodes/?season=1").unwrap();
        Document::new(url, format!("<html><body>{body}</body></html>"))
    }

    fn origin() -> Url {
        Url::parse(crate::pages::SITE_ORIGIN).unwrap()
    }

    #[test]
    fn discover_dedupes_filters_and_sorts() {
        let doc = listing(
            r#"
            <a href="/a?x=ttep_1">Ep 1</a>
            <a href="/a?x=ttep_1">Ep 1 again</a>
            <a href="/b?x=ttep_2">Ep 2</a>
            <a href="/c?y=other">Not an episode</a>
            "#,
        );

        let refs = discover_episode_links(&doc, &origin());
        let urls: Vec<&str> = refs.iter().map(PageReference::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.imdb.com/a?x=ttep_1",
                "https://www.imdb.com/b?x=ttep_2",
            ]
        );
    }

    #[test]
    fn discover_accepts_site_shaped_markers_with_many_digits() {
        let doc = listing(
            r#"
            <a href="/title/tt902/?ref_=ttep_ep12">Ep 12</a>
            <a href="/title/tt901/?ref_=ttep_ep2">Ep 2</a>
            "#,
        );

        let refs = discover_episode_links(&doc, &origin());
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.episode_index().is_some()));
    }

    #[test]
    fn discover_returns_empty_set_for_linkless_listing() {
        let doc = listing("<p>No episodes here.</p>");
        assert!(discover_episode_links(&doc, &origin()).is_empty());
    }

    #[test]
    fn seasons_read_from_dropdown_sorted_and_deduped() {
        let doc = listing(
            r#"
            <select id="bySeason">
              <option value="2">2</option>
              <option value="1">1</option>
              <option value="2">2</option>
              <option value="unknown">?</option>
            </select>
            "#,
        );
        assert_eq!(discover_seasons(&doc), vec![1, 2]);
    }

    #[test]
    fn seasons_empty_without_dropdown() {
        let doc = listing("<p>nothing</p>");
        assert!(discover_seasons(&doc).is_empty());
    }
}
