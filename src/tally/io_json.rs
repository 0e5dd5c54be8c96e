use std::path::Path;

use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::tally::*;

fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |idx| format!("{}-{:08}", simplified_file_name, idx)
}

/// Reads a ballot export: a JSON array of ballot records.
pub fn read_ballots(path: &str) -> TallyResult<Vec<BallotRecord>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    let entries = match js {
        JSValue::Array(entries) => entries,
        _ => whatever!("read_ballots: {:?} does not contain an array of ballots", path),
    };
    let default_id = make_default_id(path);
    let mut res: Vec<BallotRecord> = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let obj = entry.as_object().context(MalformedBallotSnafu {
            position: idx,
            reason: "not an object",
        })?;
        let record = parse_record(obj, &default_id(idx))?;
        debug!("read_ballots: idx: {:?} record: {:?}", idx, record);
        res.push(record);
    }
    info!("read_ballots: {} ballots in {:?}", res.len(), path);
    Ok(res)
}

fn parse_record(obj: &JSMap<String, JSValue>, default_id: &str) -> TallyResult<BallotRecord> {
    let id = match obj.get("id") {
        Some(JSValue::String(s)) if !s.is_empty() => s.clone(),
        Some(JSValue::Number(n)) => n.to_string(),
        _ => default_id.to_string(),
    };
    let mut record = BallotRecord::new(&id);
    record.voter_name = read_string(obj.get("voterName"));
    record.timestamp = read_string(obj.get("timestamp"));
    record.flagged = obj
        .get("flagged")
        .and_then(|x| x.as_bool())
        .unwrap_or(false);
    record.best_picture_ranks = match obj.get("bestPictureRanks") {
        None | Some(JSValue::Null) => None,
        Some(JSValue::Array(l)) => Some(l.iter().map(read_rank_entry).collect()),
        Some(x) => {
            warn!(
                "parse_record: ballot {}: bestPictureRanks is not an array: {:?}",
                id, x
            );
            Some(vec![RankEntry::Malformed])
        }
    };
    if let Some(JSValue::Array(marks)) = obj.get("movies") {
        for mark in marks.iter() {
            match read_mark(mark) {
                Some(m) => record.movies.push(m),
                None => {
                    warn!("parse_record: ballot {}: skipping movie {:?}", id, mark);
                }
            }
        }
    }
    Ok(record)
}

fn read_string(x: Option<&JSValue>) -> Option<String> {
    match x {
        Some(JSValue::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn read_rank_entry(x: &JSValue) -> RankEntry {
    match x {
        JSValue::String(s) => RankEntry::Candidate(s.clone()),
        _ => RankEntry::Malformed,
    }
}

// Ranks written as 2.0 are accepted, 2.5 is not.
fn read_rank(x: Option<&JSValue>) -> Option<i64> {
    match x {
        Some(JSValue::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

fn read_mark(x: &JSValue) -> Option<MovieMark> {
    let obj = x.as_object()?;
    let id = match obj.get("id") {
        Some(JSValue::String(s)) if !s.is_empty() => s.clone(),
        _ => return None,
    };
    Some(MovieMark {
        id,
        title: read_string(obj.get("title")),
        seen: obj.get("seen").and_then(|x| x.as_bool()).unwrap_or(false),
        rank: read_rank(obj.get("rank")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(js: JSValue) -> BallotRecord {
        parse_record(js.as_object().unwrap(), "default").unwrap()
    }

    #[test]
    fn both_schemas() {
        let r = parse(json!({
            "id": "b1",
            "voterName": "Sam",
            "bestPictureRanks": ["m1", 3, null],
            "movies": [
                {"id": "m1", "title": "Anora", "seen": true, "rank": 2},
                {"id": "m2", "seen": true, "rank": 1.0},
                {"id": "m3", "seen": true, "rank": 1.5},
                {"title": "No id"}
            ]
        }));
        assert_eq!(r.id, "b1");
        assert_eq!(r.voter_name, Some("Sam".to_string()));
        assert!(!r.flagged);
        assert_eq!(
            r.best_picture_ranks,
            Some(vec![
                RankEntry::Candidate("m1".to_string()),
                RankEntry::Malformed,
                RankEntry::Malformed
            ])
        );
        assert_eq!(r.movies.len(), 3);
        assert_eq!(r.movies[0].title, Some("Anora".to_string()));
        assert_eq!(r.movies[1].rank, Some(1));
        assert_eq!(r.movies[2].rank, None);
    }

    #[test]
    fn defaults() {
        let r = parse(json!({"flagged": true, "bestPictureRanks": "m1"}));
        assert_eq!(r.id, "default");
        assert!(r.flagged);
        assert!(r.movies.is_empty());
        assert_eq!(r.best_picture_ranks, Some(vec![RankEntry::Malformed]));
        assert_eq!(parse(json!({"bestPictureRanks": null})).best_picture_ranks, None);
    }

    #[test]
    fn default_ids() {
        let f = make_default_id("/tmp/party/ballots.json");
        assert_eq!(f(3), "ballots.json-00000003");
    }
}
