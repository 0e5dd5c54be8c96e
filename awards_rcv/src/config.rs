// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

use serde::Serialize;

/// One entry of the explicit rank array of a ballot.
///
/// Older exports sometimes carry numbers or nulls in that array. They are
/// kept as `Malformed` so that the normalizer can reject the whole array.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum RankEntry {
    Candidate(String),
    Malformed,
}

/// The state of one movie on a ballot.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MovieMark {
    pub id: String,
    pub title: Option<String>,
    pub seen: bool,
    /// Legacy per-movie rank (1 is the favorite). Only integral values are kept.
    pub rank: Option<i64>,
}

/// A ballot as stored by the ballot repository.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotRecord {
    pub id: String,
    pub voter_name: Option<String>,
    /// ISO-8601 submission time, if any.
    pub timestamp: Option<String>,
    pub movies: Vec<MovieMark>,
    /// The explicit ordering of the favorites, highest preference first.
    pub best_picture_ranks: Option<Vec<RankEntry>>,
    /// Set by organizers to exclude a ballot from every analysis.
    pub flagged: bool,
}

impl BallotRecord {
    pub fn new(id: &str) -> BallotRecord {
        BallotRecord {
            id: id.to_string(),
            voter_name: None,
            timestamp: None,
            movies: Vec::new(),
            best_picture_ranks: None,
            flagged: false,
        }
    }

    pub fn is_included(&self) -> bool {
        !self.flagged
    }

    pub fn seen_count(&self) -> usize {
        self.movies.iter().filter(|m| m.seen).count()
    }
}

/// A ballot reduced to its canonical preference list.
#[derive(Eq, PartialEq, Debug, Clone, Hash, PartialOrd, Ord)]
pub struct NormalizedBallot {
    pub ballot_id: String,
    pub ranks: Vec<String>,
}

/// An entry of the movie catalog.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
}

/// Display titles for candidate ids.
///
/// The catalog wins over titles found on ballots. A candidate without any
/// known title is displayed with its id.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct TitleBook {
    titles: BTreeMap<String, String>,
}

impl TitleBook {
    pub fn from_catalog(catalog: &[CatalogEntry]) -> TitleBook {
        let mut book = TitleBook::default();
        for entry in catalog {
            book.titles
                .entry(entry.id.clone())
                .or_insert_with(|| entry.title.clone());
        }
        book
    }

    /// Adds the titles carried by ballot marks, without overriding known ones.
    /// Records are visited in ballot id order so the outcome does not depend
    /// on the order of the export.
    pub fn learn_from_records(&mut self, records: &[BallotRecord]) {
        let mut sorted: Vec<&BallotRecord> = records.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        for record in sorted {
            for mark in record.movies.iter() {
                if mark.id.is_empty() || self.titles.contains_key(&mark.id) {
                    continue;
                }
                let title = match &mark.title {
                    Some(t) if !t.is_empty() => t.clone(),
                    _ => mark.id.clone(),
                };
                self.titles.insert(mark.id.clone(), title);
            }
        }
    }

    pub fn insert(&mut self, id: &str, title: &str) {
        self.titles.insert(id.to_string(), title.to_string());
    }

    pub fn title_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.titles.get(id).map(|s| s.as_str()).unwrap_or(id)
    }
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub candidate_id: String,
    pub title: String,
    pub votes: u64,
}

/// Aggregated movement of ballots from an eliminated candidate.
/// A missing destination means the ballots were exhausted.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub from_candidate_id: String,
    pub from_title: String,
    pub to_candidate_id: Option<String>,
    pub to_title: String,
    pub count: u64,
}

/// One ballot currently counted for a candidate.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteToken {
    pub ballot_id: String,
    /// Position of the candidate in the ballot's preference list (0 is the favorite).
    pub rank_index: usize,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Active,
    Eliminated,
    Winner,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateStepState {
    pub candidate_id: String,
    pub title: String,
    pub votes: u64,
    pub status: CandidateStatus,
    pub tokens: Vec<VoteToken>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteMovement {
    pub ballot_id: String,
    pub from_candidate_id: String,
    pub from_rank_index: usize,
    pub to_candidate_id: Option<String>,
    pub to_rank_index: Option<usize>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Standings,
    Redistribution,
    ThresholdUpdate,
    Winner,
}

/// A unit of the reveal, meant to be displayed in order.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationStep {
    pub id: String,
    pub round: u32,
    pub kind: StepKind,
    pub title: String,
    pub explanation: String,
    pub active_ballots: u64,
    pub threshold: u64,
    pub exhausted_ballots: u64,
    pub newly_eliminated: Vec<String>,
    pub candidates: Vec<CandidateStepState>,
    pub vote_movements: Vec<VoteMovement>,
}

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub round: u32,
    /// Sorted by decreasing votes, ties in candidate order.
    pub tally: Vec<CandidateTally>,
    pub eliminated: Vec<String>,
    /// Candidates that no ballot reached, removed before this round's standings.
    pub dropped: Vec<String>,
    pub transfers: Vec<TransferSummary>,
    pub active_ballots: u64,
    pub threshold: u64,
    pub winner: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabulationResult {
    pub rounds: Vec<RoundSummary>,
    pub winner: Option<String>,
    pub steps: Vec<PresentationStep>,
    pub candidate_order: Vec<String>,
    pub titles: BTreeMap<String, String>,
    /// Ballots with at least one preference.
    pub ranked_ballots: u64,
    /// Ballots without any usable preference.
    pub blank_ballots: u64,
}

impl TabulationResult {
    pub fn empty(blank_ballots: u64) -> TabulationResult {
        TabulationResult {
            rounds: Vec::new(),
            winner: None,
            steps: Vec::new(),
            candidate_order: Vec::new(),
            titles: BTreeMap::new(),
            ranked_ballots: 0,
            blank_ballots,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationLeader {
    pub ballot_id: String,
    pub voter_name: String,
    pub count: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationStats {
    pub included_ballots: u64,
    pub total_ballots: u64,
    pub excluded_ballots: u64,
    pub unique_movies_seen: u64,
    pub most_movies_seen: Option<ParticipationLeader>,
}

/// Errors that prevent the tabulation from starting.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyErrors {
    InvalidRankCount(usize),
    InvalidIterationGuard,
}

impl Error for TallyErrors {}

impl Display for TallyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyErrors::InvalidRankCount(n) => {
                write!(f, "invalid rank count {}: at least one rank is required", n)
            }
            TallyErrors::InvalidIterationGuard => {
                write!(f, "the iteration guard must allow at least one round")
            }
        }
    }
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRules {
    /// The number of favorites each voter ranks.
    pub rank_count: usize,
    /// Upper bound on the iterations of the elimination loop.
    pub max_iterations: u32,
}

impl TallyRules {
    pub const DEFAULT_RANK_COUNT: usize = 5;

    pub const DEFAULT_RULES: TallyRules = TallyRules {
        rank_count: TallyRules::DEFAULT_RANK_COUNT,
        max_iterations: 500,
    };

    pub fn validate(&self) -> Result<(), TallyErrors> {
        if self.rank_count == 0 {
            return Err(TallyErrors::InvalidRankCount(self.rank_count));
        }
        if self.max_iterations == 0 {
            return Err(TallyErrors::InvalidIterationGuard);
        }
        Ok(())
    }
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules::DEFAULT_RULES
    }
}
