// Construction of the presentation steps and of the transfer summaries.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::{count_active, get_threshold, Assignment, CandidateId, Contest, RoundId};

const EXHAUSTED_TITLE: &str = "Exhausted";

/// One ballot leaving an eliminated candidate.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub(crate) struct Movement {
    /// Index of the ballot in the contest.
    pub ballot: usize,
    pub from: Assignment,
    pub to: Option<Assignment>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub(crate) enum WinnerReason {
    /// Reached the threshold, or was the last candidate running.
    Majority,
    /// Won the tie-break while every candidate had this many votes.
    TieBreak(u64),
}

/// The state of every candidate, in candidate order, for the given assignments.
fn candidate_states(
    contest: &Contest,
    assignments: &[Option<Assignment>],
    eliminated: &BTreeSet<CandidateId>,
    winner: Option<CandidateId>,
) -> Vec<CandidateStepState> {
    let mut tokens: BTreeMap<CandidateId, Vec<VoteToken>> = BTreeMap::new();
    for (ballot, a) in assignments.iter().enumerate() {
        if let Some(a) = a {
            tokens.entry(a.candidate).or_default().push(VoteToken {
                ballot_id: contest.ballots[ballot].ballot_id.clone(),
                rank_index: a.rank_index,
            });
        }
    }

    contest
        .all_candidates()
        .into_iter()
        .map(|cid| {
            let mut cand_tokens = tokens.remove(&cid).unwrap_or_default();
            cand_tokens.sort_by(|t1, t2| {
                t1.rank_index
                    .cmp(&t2.rank_index)
                    .then_with(|| t1.ballot_id.cmp(&t2.ballot_id))
            });
            let status = if winner == Some(cid) {
                CandidateStatus::Winner
            } else if eliminated.contains(&cid) {
                CandidateStatus::Eliminated
            } else {
                CandidateStatus::Active
            };
            CandidateStepState {
                candidate_id: contest.id(cid).to_string(),
                title: contest.title(cid).to_string(),
                votes: cand_tokens.len() as u64,
                status,
                tokens: cand_tokens,
            }
        })
        .collect()
}

struct StepHeader {
    id: String,
    round: RoundId,
    kind: StepKind,
    title: String,
    explanation: String,
}

fn make_step(
    contest: &Contest,
    header: StepHeader,
    assignments: &[Option<Assignment>],
    eliminated: &BTreeSet<CandidateId>,
    winner: Option<CandidateId>,
    newly_eliminated: &[CandidateId],
    movements: &[Movement],
) -> PresentationStep {
    let active = count_active(assignments);
    PresentationStep {
        id: header.id,
        round: header.round,
        kind: header.kind,
        title: header.title,
        explanation: header.explanation,
        active_ballots: active.0,
        threshold: get_threshold(active).0,
        exhausted_ballots: contest.ranked_count().0 - active.0,
        newly_eliminated: newly_eliminated
            .iter()
            .map(|cid| contest.id(*cid).to_string())
            .collect(),
        candidates: candidate_states(contest, assignments, eliminated, winner),
        vote_movements: movements
            .iter()
            .map(|m| VoteMovement {
                ballot_id: contest.ballots[m.ballot].ballot_id.clone(),
                from_candidate_id: contest.id(m.from.candidate).to_string(),
                from_rank_index: m.from.rank_index,
                to_candidate_id: m.to.map(|a| contest.id(a.candidate).to_string()),
                to_rank_index: m.to.map(|a| a.rank_index),
            })
            .collect(),
    }
}

/// The standings at the start of a round without majority.
pub(crate) fn standings_step(
    contest: &Contest,
    round: RoundId,
    assignments: &[Option<Assignment>],
    eliminated: &BTreeSet<CandidateId>,
    sorted_tally: &[(CandidateId, crate::VoteCount)],
) -> PresentationStep {
    let active = count_active(assignments);
    let explanation = match sorted_tally.first() {
        Some((leader, votes)) => format!(
            "No majority yet. {} leads with {} of {} votes. {} needed to win.",
            contest.title(*leader),
            votes.0,
            active.0,
            get_threshold(active).0
        ),
        None => "No majority yet.".to_string(),
    };
    let header = StepHeader {
        id: format!("round-{}-standings", round),
        round,
        kind: StepKind::Standings,
        title: format!("Round {}: Standings", round),
        explanation,
    };
    make_step(contest, header, assignments, eliminated, None, &[], &[])
}

/// The elimination of one candidate and the ballots it hands over.
pub(crate) fn redistribution_step(
    contest: &Contest,
    round: RoundId,
    phase: usize,
    loser: CandidateId,
    assignments: &[Option<Assignment>],
    eliminated: &BTreeSet<CandidateId>,
    movements: &[Movement],
) -> PresentationStep {
    let mut received: BTreeMap<CandidateId, u64> = BTreeMap::new();
    let mut exhausted: u64 = 0;
    for m in movements.iter() {
        match m.to {
            Some(a) => *received.entry(a.candidate).or_insert(0) += 1,
            None => exhausted += 1,
        }
    }
    let reassigned: u64 = received.values().sum();
    let parts: Vec<String> = received
        .iter()
        .map(|(cid, n)| format!("{} to {}", n, contest.title(*cid)))
        .collect();
    let summary = if parts.is_empty() {
        "0 to no remaining movies".to_string()
    } else {
        parts.join(", ")
    };

    let header = StepHeader {
        id: format!("round-{}-redistribution-{}", round, phase),
        round,
        kind: StepKind::Redistribution,
        title: "Votes Reassigned".to_string(),
        explanation: format!(
            "{} eliminated. {} vote(s) reassigned: {}. {} ballot(s) exhausted.",
            contest.title(loser),
            reassigned,
            summary,
            exhausted
        ),
    };
    make_step(
        contest,
        header,
        assignments,
        eliminated,
        None,
        &[loser],
        movements,
    )
}

/// The majority recomputed after ballots were exhausted.
pub(crate) fn threshold_step(
    contest: &Contest,
    round: RoundId,
    exhausted: u64,
    assignments: &[Option<Assignment>],
    eliminated: &BTreeSet<CandidateId>,
) -> PresentationStep {
    let active = count_active(assignments);
    let header = StepHeader {
        id: format!("round-{}-threshold-update", round),
        round,
        kind: StepKind::ThresholdUpdate,
        title: "Checking for a Majority...".to_string(),
        explanation: format!(
            "{} ballot(s) exhausted. Majority is now {} of {} active ballots.",
            exhausted,
            get_threshold(active).0,
            active.0
        ),
    };
    make_step(contest, header, assignments, eliminated, None, &[], &[])
}

pub(crate) fn winner_step(
    contest: &Contest,
    round: RoundId,
    winner: CandidateId,
    reason: WinnerReason,
    assignments: &[Option<Assignment>],
    eliminated: &BTreeSet<CandidateId>,
) -> PresentationStep {
    let active = count_active(assignments);
    let title = contest.title(winner);
    let votes = assignments
        .iter()
        .flatten()
        .filter(|a| a.candidate == winner)
        .count();
    let (id, explanation) = match reason {
        WinnerReason::Majority if active.0 > 0 => (
            format!("round-{}-winner", round),
            format!(
                "{} wins with {} of {} active votes.",
                title, votes, active.0
            ),
        ),
        WinnerReason::Majority => (
            format!("round-{}-winner", round),
            format!(
                "{} is the final remaining movie and wins after all ballots were exhausted.",
                title
            ),
        ),
        WinnerReason::TieBreak(tied) if active.0 > 0 => (
            format!("round-{}-winner-tiebreak", round),
            format!(
                "All remaining movies are tied at {} vote(s). {} wins via tie-break.",
                tied, title
            ),
        ),
        WinnerReason::TieBreak(_) => (
            format!("round-{}-winner-tiebreak", round),
            format!(
                "{} wins via tie-break after all ballots were exhausted.",
                title
            ),
        ),
    };
    let header = StepHeader {
        id,
        round,
        kind: StepKind::Winner,
        title: "We Have a Winner!".to_string(),
        explanation,
    };
    make_step(
        contest,
        header,
        assignments,
        eliminated,
        Some(winner),
        &[],
        &[],
    )
}

/// Movements of a round aggregated per path, ordered by source candidate,
/// then destination, with exhausted ballots last.
pub(crate) fn transfer_summaries(
    contest: &Contest,
    movements: &[Movement],
) -> Vec<TransferSummary> {
    let mut counts: BTreeMap<(CandidateId, bool, Option<CandidateId>), u64> = BTreeMap::new();
    for m in movements.iter() {
        let to = m.to.map(|a| a.candidate);
        *counts.entry((m.from.candidate, to.is_none(), to)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|((from, _, to), count)| TransferSummary {
            from_candidate_id: contest.id(from).to_string(),
            from_title: contest.title(from).to_string(),
            to_candidate_id: to.map(|cid| contest.id(cid).to_string()),
            to_title: match to {
                Some(cid) => contest.title(cid).to_string(),
                None => EXHAUSTED_TITLE.to_string(),
            },
            count,
        })
        .collect()
}
