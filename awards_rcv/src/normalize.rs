use std::collections::HashSet;

use log::{debug, warn};

use crate::config::*;

/// Reduces a ballot record to its canonical preference list.
///
/// The explicit rank array is used when it is a complete ranking of
/// `rank_count` distinct seen movies. Otherwise the list is rebuilt from the
/// legacy per-movie ranks, skipping out-of-range ranks, repeated ranks and
/// repeated movies. The result may be shorter than `rank_count`, and empty.
pub fn canonical_ranks(record: &BallotRecord, rank_count: usize) -> Vec<String> {
    let seen_ids: HashSet<&str> = record
        .movies
        .iter()
        .filter(|m| m.seen)
        .map(|m| m.id.as_str())
        .collect();

    if let Some(entries) = record.best_picture_ranks.as_deref() {
        if let Some(ranks) = accept_explicit(entries, &seen_ids, rank_count) {
            return ranks;
        }
        warn!(
            "canonical_ranks: ballot {}: rejected explicit ranks {:?}, using legacy ranks",
            record.id, entries
        );
    }

    legacy_ranks(record, rank_count)
}

fn accept_explicit(
    entries: &[RankEntry],
    seen_ids: &HashSet<&str>,
    rank_count: usize,
) -> Option<Vec<String>> {
    if entries.len() != rank_count {
        return None;
    }
    let mut ids: Vec<String> = Vec::with_capacity(entries.len());
    let mut distinct: HashSet<&str> = HashSet::new();
    for entry in entries {
        match entry {
            RankEntry::Candidate(id) if seen_ids.contains(id.as_str()) => {
                if !distinct.insert(id.as_str()) {
                    return None;
                }
                ids.push(id.clone());
            }
            _ => return None,
        }
    }
    Some(ids)
}

fn legacy_ranks(record: &BallotRecord, rank_count: usize) -> Vec<String> {
    let max_rank = rank_count as i64;
    let mut ranked: Vec<(i64, &str)> = record
        .movies
        .iter()
        .filter_map(|m| match m.rank {
            Some(r) if m.seen && r >= 1 && r <= max_rank => Some((r, m.id.as_str())),
            _ => None,
        })
        .collect();
    // Stable: marks sharing a rank keep their order on the ballot.
    ranked.sort_by_key(|(r, _)| *r);

    let mut used_ranks: HashSet<i64> = HashSet::new();
    let mut ordered: Vec<String> = Vec::new();
    for (rank, id) in ranked {
        if used_ranks.contains(&rank) || ordered.iter().any(|o| o == id) {
            debug!(
                "legacy_ranks: ballot {}: skipping {} at rank {}",
                record.id, id, rank
            );
            continue;
        }
        used_ranks.insert(rank);
        ordered.push(id.to_string());
    }
    ordered
}

/// Normalizes a batch of records.
pub fn normalize_all(records: &[BallotRecord], rank_count: usize) -> Vec<NormalizedBallot> {
    records
        .iter()
        .map(|r| NormalizedBallot {
            ballot_id: r.id.clone(),
            ranks: canonical_ranks(r, rank_count),
        })
        .collect()
}
