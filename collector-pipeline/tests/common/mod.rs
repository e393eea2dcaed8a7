#![allow(dead_code)]

use collector_core::{CoreError, PostSource, RawPost};
use std::collections::VecDeque;

/// Hands out one queued listing per call, in call order.
#[derive(Default)]
pub struct QueuedSource {
    pub listings: VecDeque<Vec<RawPost>>,
    pub requested: Vec<(String, u32)>,
}

impl QueuedSource {
    pub fn new(listings: Vec<Vec<RawPost>>) -> Self {
        Self {
            listings: listings.into(),
            requested: Vec::new(),
        }
    }

    fn next_listing(&mut self, subreddit: &str, limit: u32) -> Vec<RawPost> {
        self.requested.push((subreddit.to_string(), limit));
        let listing = self.listings.pop_front().unwrap_or_default();
        listing.into_iter().take(limit as usize).collect()
    }
}

impl PostSource for QueuedSource {
    async fn fetch_trending(
        &mut self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError> {
        Ok(self.next_listing(subreddit, limit))
    }

    async fn search(
        &mut self,
        subreddit: &str,
        _keyword: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>, CoreError> {
        Ok(self.next_listing(subreddit, limit))
    }
}

pub fn raw_post(id: &str, title: &str) -> RawPost {
    RawPost {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        author: Some(format!("author_{}", id)),
        score: Some(42),
        created_utc: Some(1_700_000_000.0),
        permalink: Some(format!("/r/test/comments/{}/", id)),
        selftext: Some(String::new()),
        subreddit: Some("test".to_string()),
    }
}
