use scraper::{ElementRef, Html, Selector};

use crate::fetch::Document;
use crate::formats::ReviewRecord;

/// Parses a fully expanded review listing into records, one per review
/// block. Provenance indices are zeroed here and filled in by the
/// orchestrator. Each field is extracted independently: a missing or
/// malformed sub-element nulls that field and nothing else.
pub fn extract(doc: &Document) -> Vec<ReviewRecord> {
    let html = Html::parse_document(&doc.html());
    let blocks = Selector::parse("div.lister-item").expect("valid review block selector");

    html.select(&blocks).map(|block| extract_block(&block)).collect()
}

fn extract_block(block: &ElementRef) -> ReviewRecord {
    let (helpful_count, total_count) = text_of(block, "div.actions")
        .map(|text| parse_reactions(&text))
        .unwrap_or((None, None));

    ReviewRecord {
        rating: text_of(block, "div.ipl-ratings-bar").and_then(|text| parse_rating(&text)),
        author: text_of(block, "div.display-name-date")
            .and_then(|text| text.split_whitespace().next().map(str::to_owned)),
        date: text_of(block, "span.review-date"),
        title: text_of(block, "a.title"),
        body: text_of(block, "div.text"),
        helpful_count,
        total_count,
        episode_index: 0,
        season_index: 0,
    }
}

/// Whitespace-normalized text of the first element matching `selector`
/// inside the block. None when the element is absent or textless.
fn text_of(block: &ElementRef, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).expect("valid field selector");
    let element = block.select(&selector).next()?;
    let text = normalize_whitespace(&element.text().collect::<String>());
    if text.is_empty() { None } else { Some(text) }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"7/10"` -> 7.0. Takes the numerator of the slash-separated pair; any
/// parse failure nulls the field.
fn parse_rating(text: &str) -> Option<f64> {
    text.split('/').next()?.trim().parse().ok()
}

/// Reaction counts out of text like `"128 out of 150 found this helpful"`.
/// The first token is the helpful count; the total is the next token that
/// parses as a number, wherever the phrasing puts it. Unless both counts
/// parse, both are None.
fn parse_reactions(text: &str) -> (Option<u64>, Option<u64>) {
    let mut tokens = text.split_whitespace();
    let helpful = tokens.next().and_then(parse_count);
    let total = tokens.find_map(parse_count);

    match (helpful, total) {
        (Some(helpful), Some(total)) => (Some(helpful), Some(total)),
        _ => (None, None),
    }
}

fn parse_count(token: &str) -> Option<u64> {
    token.replace(',', "").parse().ok()
}
