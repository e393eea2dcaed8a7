use collector_core::PostRecord;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeReport {
    pub records: Vec<PostRecord>,
    pub removed: usize,
}

/// Drops every record whose `id` was already seen. Stable: the first
/// occurrence of each id keeps its position.
pub fn dedupe(records: Vec<PostRecord>) -> Vec<PostRecord> {
    dedupe_report(records).records
}

pub fn dedupe_report(records: Vec<PostRecord>) -> DedupeReport {
    let before = records.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(before);

    let records: Vec<PostRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .collect();

    DedupeReport {
        removed: before - records.len(),
        records,
    }
}
