use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::debug;

use crate::config::*;

const FALLBACK_VOTER_NAME: &str = "Anonymous";

/// Participation figures for the ballots retained in the analysis.
///
/// `total_ballots` is the size of the collection before the exclusion
/// filter was applied.
pub fn participation(included: &[BallotRecord], total_ballots: usize) -> ParticipationStats {
    let unique_seen: HashSet<&str> = included
        .iter()
        .flat_map(|b| b.movies.iter())
        .filter(|m| m.seen)
        .map(|m| m.id.as_str())
        .collect();

    let stats = ParticipationStats {
        included_ballots: included.len() as u64,
        total_ballots: total_ballots as u64,
        excluded_ballots: total_ballots.saturating_sub(included.len()) as u64,
        unique_movies_seen: unique_seen.len() as u64,
        most_movies_seen: top_viewer(included),
    };
    debug!("participation: {:?}", stats);
    stats
}

struct ViewerKey<'a> {
    ballot_id: &'a str,
    voter_name: String,
    seen: usize,
    submitted_at: Option<i64>,
}

fn compare_viewers(left: &ViewerKey, right: &ViewerKey) -> Ordering {
    right
        .seen
        .cmp(&left.seen)
        .then_with(|| match (left.submitted_at, right.submitted_at) {
            (Some(l), Some(r)) => l.cmp(&r),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| left.voter_name.cmp(&right.voter_name))
        .then_with(|| left.ballot_id.cmp(right.ballot_id))
}

/// The ballot with the most movies seen. Ties go to the earliest submission,
/// then to the voter name and the ballot id.
fn top_viewer(ballots: &[BallotRecord]) -> Option<ParticipationLeader> {
    let best = ballots
        .iter()
        .map(|b| ViewerKey {
            ballot_id: b.id.as_str(),
            voter_name: display_name(b.voter_name.as_deref()),
            seen: b.seen_count(),
            submitted_at: b.timestamp.as_deref().and_then(parse_timestamp),
        })
        .min_by(compare_viewers)?;
    Some(ParticipationLeader {
        ballot_id: best.ballot_id.to_string(),
        voter_name: best.voter_name,
        count: best.seen as u64,
    })
}

fn display_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => FALLBACK_VOTER_NAME.to_string(),
    }
}

/// Milliseconds since the epoch. Timestamps without an offset are read as UTC.
pub(crate) fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive).timestamp_millis());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(id: &str, name: Option<&str>, ts: Option<&str>, seen: &[&str]) -> BallotRecord {
        let mut b = BallotRecord::new(id);
        b.voter_name = name.map(|s| s.to_string());
        b.timestamp = ts.map(|s| s.to_string());
        b.movies = seen
            .iter()
            .map(|m| MovieMark {
                id: m.to_string(),
                title: None,
                seen: true,
                rank: None,
            })
            .collect();
        b.movies.push(MovieMark {
            id: "unseen".to_string(),
            title: None,
            seen: false,
            rank: None,
        });
        b
    }

    #[test]
    fn counts() {
        let included = vec![
            ballot("1", Some("Ann"), None, &["a", "b"]),
            ballot("2", Some("Bo"), None, &["b", "c", "d"]),
        ];
        let stats = participation(&included, 5);
        assert_eq!(stats.included_ballots, 2);
        assert_eq!(stats.total_ballots, 5);
        assert_eq!(stats.excluded_ballots, 3);
        assert_eq!(stats.unique_movies_seen, 4);
        let top = stats.most_movies_seen.unwrap();
        assert_eq!(top.voter_name, "Bo");
        assert_eq!(top.count, 3);
    }

    #[test]
    fn no_ballots() {
        let stats = participation(&[], 0);
        assert_eq!(stats.included_ballots, 0);
        assert_eq!(stats.excluded_ballots, 0);
        assert_eq!(stats.unique_movies_seen, 0);
        assert_eq!(stats.most_movies_seen, None);
    }

    #[test]
    fn ties_go_to_earliest_then_name_then_id() {
        let included = vec![
            ballot("3", Some("Zed"), Some("2024-03-01T20:00:00Z"), &["a"]),
            ballot("2", Some("Amy"), None, &["b"]),
            ballot("1", Some("Bea"), Some("2024-03-01T19:00:00+00:00"), &["c"]),
        ];
        let top = participation(&included, 3).most_movies_seen.unwrap();
        assert_eq!(top.ballot_id, "1");

        let untimed = vec![
            ballot("9", Some("  Cy "), None, &["a"]),
            ballot("8", None, None, &["b"]),
            ballot("7", Some("Cy"), Some("not a date"), &["c"]),
        ];
        let top = participation(&untimed, 3).most_movies_seen.unwrap();
        assert_eq!(top.voter_name, "Anonymous");
        assert_eq!(top.ballot_id, "8");

        let same_name = vec![
            ballot("9", Some("Cy"), None, &["a"]),
            ballot("7", Some("Cy"), None, &["c"]),
        ];
        let top = participation(&same_name, 2).most_movies_seen.unwrap();
        assert_eq!(top.ballot_id, "7");
    }

    #[test]
    fn timestamps() {
        assert_eq!(parse_timestamp("1970-01-01T00:00:01Z"), Some(1000));
        assert_eq!(parse_timestamp("1970-01-01T00:00:01.500"), Some(1500));
        assert_eq!(parse_timestamp("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
