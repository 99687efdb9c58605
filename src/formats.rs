use serde::{Deserialize, Serialize};

/// One harvested review. Every content field is optional: a sub-element
/// missing from the review block degrades that field to `None`, never the
/// whole record. Provenance indices use 0 for the show-level review page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub rating: Option<f64>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub helpful_count: Option<u64>,
    pub total_count: Option<u64>,
    pub episode_index: u32,
    pub season_index: u32,
}

impl ReviewRecord {
    pub fn has_reaction_counts(&self) -> bool {
        self.helpful_count.is_some() && self.total_count.is_some()
    }
}

/// Provenance of a review page that failed to load and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPage {
    pub season_index: u32,
    pub episode_index: u32,
    pub url: String,
}
