use crate::csv_writer::write_csv;
use crate::dedupe::dedupe_report;
use crate::extract::{extract, ExtractOptions};
use collector_core::{CoreError, PostRecord, PostSource, QuerySpec, RawPost, RunConfig};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Every extracted record in retrieval order, duplicates included.
    pub records: Vec<PostRecord>,
    pub fetched: usize,
    pub malformed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub written: usize,
    pub output: PathBuf,
}

pub async fn fetch<S: PostSource>(
    source: &mut S,
    query: &QuerySpec,
) -> Result<Vec<RawPost>, CoreError> {
    match query {
        QuerySpec::Trending { subreddit, limit } => source.fetch_trending(subreddit, *limit).await,
        QuerySpec::Search {
            subreddit,
            keyword,
            limit,
        } => source.search(subreddit, keyword, *limit).await,
    }
}

/// Runs each query to completion in order. Posts without an id are dropped
/// with a warning; any fetch error ends the collection.
pub async fn collect<S: PostSource>(
    source: &mut S,
    queries: &[QuerySpec],
    options: &ExtractOptions,
) -> Result<Collection, CoreError> {
    let mut collection = Collection {
        records: Vec::new(),
        fetched: 0,
        malformed: 0,
    };

    for query in queries {
        info!("Downloading {}...", query);
        let posts = fetch(source, query).await?;
        collection.fetched += posts.len();

        let mut kept = 0;
        for post in &posts {
            match extract(post, query, options) {
                Ok(record) => {
                    collection.records.push(record);
                    kept += 1;
                }
                Err(e) => {
                    warn!("Skipping post from r/{}: {}", query.subreddit(), e);
                    collection.malformed += 1;
                }
            }
        }

        info!(
            "Successfully downloaded {} posts from r/{}",
            kept,
            query.subreddit()
        );
    }

    Ok(collection)
}

/// collect, dedupe, write. Nothing is written unless every query succeeded.
pub async fn run<S: PostSource>(
    source: &mut S,
    config: &RunConfig,
) -> Result<RunSummary, CoreError> {
    config.validate()?;

    let options = ExtractOptions::from(config);
    let collection = collect(source, &config.queries, &options).await?;

    let report = dedupe_report(collection.records);
    info!("Removed {} duplicate posts.", report.removed);
    info!(
        "Saving {} cleaned posts to '{}'...",
        report.records.len(),
        config.output.display()
    );

    write_csv(&config.output, &report.records)?;

    Ok(RunSummary {
        fetched: collection.fetched,
        malformed: collection.malformed,
        duplicates: report.removed,
        written: report.records.len(),
        output: config.output.clone(),
    })
}
