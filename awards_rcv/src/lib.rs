mod config;
use log::{debug, info, warn};

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::AddAssign,
};

pub mod builder;
pub mod manual;
pub mod normalize;
pub mod stats;
mod steps;

pub use crate::config::*;

use crate::steps::{Movement, WinnerReason};

// **** Private structures ****

type RoundId = u32;

/// Position of a candidate in the display order. Comparing two ids compares
/// the candidates by title, then by their public id: this is the tie-break
/// order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub(crate) struct CandidateId(u32);

impl CandidateId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
pub(crate) struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

/// Where a ballot currently counts. A ballot without assignment is exhausted.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub(crate) struct Assignment {
    candidate: CandidateId,
    rank_index: usize,
}

// Invariant: the ranks are never empty.
#[derive(Eq, PartialEq, Debug, Clone)]
pub(crate) struct RankedBallot {
    ballot_id: String,
    ranks: Vec<CandidateId>,
}

/// The ballots and candidates of one tabulation, with interned candidate ids.
pub(crate) struct Contest {
    ballots: Vec<RankedBallot>,
    ids: Vec<String>,
    titles: Vec<String>,
}

impl Contest {
    /// Builds the contest and returns it with the number of blank ballots.
    fn new(ballots: &[NormalizedBallot], titles: &TitleBook) -> (Contest, u64) {
        let mut sorted: Vec<&NormalizedBallot> = ballots.iter().collect();
        sorted.sort();

        let universe: BTreeSet<&str> = sorted
            .iter()
            .flat_map(|b| b.ranks.iter())
            .map(|s| s.as_str())
            .collect();
        let mut ordered: Vec<(&str, &str)> = universe
            .into_iter()
            .map(|id| (titles.title_of(id), id))
            .collect();
        ordered.sort();

        let by_id: BTreeMap<&str, CandidateId> = ordered
            .iter()
            .enumerate()
            .map(|(idx, (_, id))| (*id, CandidateId(idx as u32)))
            .collect();

        let mut blank: u64 = 0;
        let mut ranked: Vec<RankedBallot> = Vec::new();
        for b in sorted {
            let ranks: Vec<CandidateId> = b
                .ranks
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).cloned())
                .collect();
            if ranks.is_empty() {
                debug!("Contest: ballot {} has no preference", b.ballot_id);
                blank += 1;
            } else {
                ranked.push(RankedBallot {
                    ballot_id: b.ballot_id.clone(),
                    ranks,
                });
            }
        }

        let contest = Contest {
            ballots: ranked,
            ids: ordered.iter().map(|(_, id)| id.to_string()).collect(),
            titles: ordered.iter().map(|(t, _)| t.to_string()).collect(),
        };
        (contest, blank)
    }

    fn id(&self, cid: CandidateId) -> &str {
        self.ids[cid.idx()].as_str()
    }

    fn title(&self, cid: CandidateId) -> &str {
        self.titles[cid.idx()].as_str()
    }

    fn all_candidates(&self) -> BTreeSet<CandidateId> {
        (0..self.ids.len()).map(|idx| CandidateId(idx as u32)).collect()
    }

    fn ranked_count(&self) -> VoteCount {
        VoteCount(self.ballots.len() as u64)
    }
}

/// Runs the instant-runoff tabulation over normalized ballots.
///
/// Arguments:
/// * `ballots` the normalized ballots, in any order
/// * `titles` the display titles, which also define the tie-break order
/// * `rules` the rank count and the iteration guard
///
/// The result is fully determined by the content of the ballots. When the
/// iteration guard runs out, the rounds computed so far are returned
/// without a winner.
pub fn tabulate(
    ballots: &[NormalizedBallot],
    titles: &TitleBook,
    rules: &TallyRules,
) -> Result<TabulationResult, TallyErrors> {
    rules.validate()?;
    info!("Processing {:?} ballots, rules: {:?}", ballots.len(), rules);

    let (contest, blank) = Contest::new(ballots, titles);
    info!(
        "Processing {:?} ranked ballots ({:?} blank)",
        contest.ballots.len(),
        blank
    );
    for (idx, (id, title)) in contest.ids.iter().zip(contest.titles.iter()).enumerate() {
        info!("Candidate: {}: {} ({})", idx + 1, title, id);
    }
    if contest.ballots.is_empty() {
        return Ok(TabulationResult::empty(blank));
    }

    let mut remaining: BTreeSet<CandidateId> = contest.all_candidates();
    let mut tab = Tabulation::new(&contest);
    let mut winner: Option<CandidateId> = None;
    let mut iterations: u32 = 0;
    while !remaining.is_empty() && iterations < rules.max_iterations {
        iterations += 1;
        match tab.run_one_round(&remaining) {
            RoundOutcome::Elected(cid) => {
                winner = Some(cid);
                break;
            }
            RoundOutcome::Dropped(cids) => {
                remaining.retain(|cid| !cids.contains(cid));
            }
            RoundOutcome::Eliminated(cids) => {
                let before = remaining.len();
                remaining.retain(|cid| !cids.contains(cid));
                assert!(
                    remaining.len() < before,
                    "The number of candidates did not decrease in round {}",
                    tab.round
                );
                tab.round += 1;
            }
        }
    }

    match winner {
        Some(cid) => info!("Winner: {} ({})", contest.title(cid), contest.id(cid)),
        None if !remaining.is_empty() => warn!(
            "tabulate: iteration guard of {} exhausted with {} candidates left, no winner",
            rules.max_iterations,
            remaining.len()
        ),
        None => warn!("tabulate: all candidates eliminated without a winner"),
    }
    Ok(tab.finish(winner, blank))
}

enum RoundOutcome {
    /// A winner was found, the tabulation is over.
    Elected(CandidateId),
    /// Candidates without any vote were removed. The round is run again.
    Dropped(Vec<CandidateId>),
    /// The last placed candidates were eliminated and the round recorded.
    Eliminated(Vec<CandidateId>),
}

struct Tabulation<'a> {
    contest: &'a Contest,
    round: RoundId,
    rounds: Vec<RoundSummary>,
    steps: Vec<PresentationStep>,
    eliminated: BTreeSet<CandidateId>,
    // Zero-vote candidates waiting to be reported with the next recorded round.
    dropped: Vec<CandidateId>,
}

impl<'a> Tabulation<'a> {
    fn new(contest: &'a Contest) -> Tabulation<'a> {
        Tabulation {
            contest,
            round: 1,
            rounds: Vec::new(),
            steps: Vec::new(),
            eliminated: BTreeSet::new(),
            dropped: Vec::new(),
        }
    }

    fn run_one_round(&mut self, remaining: &BTreeSet<CandidateId>) -> RoundOutcome {
        let contest = self.contest;
        let assignments = assign_all(&contest.ballots, remaining);
        let tally = compute_tally(&assignments, remaining);
        let active = count_active(&assignments);
        let threshold = get_threshold(active);
        let sorted = sorted_tally(&tally);
        debug!(
            "run_one_round: round {}: tally: {:?} active: {:?} threshold: {:?}",
            self.round, sorted, active, threshold
        );
        debug_assert_eq!(
            tally.values().cloned().sum::<VoteCount>().0 + (contest.ranked_count().0 - active.0),
            contest.ranked_count().0
        );

        let majority = if active > VoteCount::EMPTY {
            sorted
                .iter()
                .find(|(_, vc)| *vc >= threshold)
                .map(|(cid, _)| *cid)
        } else {
            None
        };
        // Only one candidate. It is the winner by any standard.
        let last_standing = if remaining.len() == 1 {
            remaining.iter().next().cloned()
        } else {
            None
        };
        if let Some(cid) = majority.or(last_standing) {
            debug!("run_one_round: {:?} reached the threshold", cid);
            return self.elect(
                cid,
                WinnerReason::Majority,
                &sorted,
                &assignments,
                active,
                threshold,
            );
        }

        let lowest = match sorted.last() {
            Some((_, vc)) => *vc,
            None => return RoundOutcome::Dropped(Vec::new()),
        };
        // In candidate order, since the tally is keyed by candidate id.
        let losers: Vec<CandidateId> = tally
            .iter()
            .filter_map(|(cid, vc)| if *vc == lowest { Some(*cid) } else { None })
            .collect();
        debug!("run_one_round: lowest {:?}: {:?}", lowest, losers);

        // Everyone is tied: eliminating them would leave nobody.
        if losers.len() == remaining.len() {
            let cid = sorted[0].0;
            debug!("run_one_round: full tie, {:?} wins the tie-break", cid);
            return self.elect(
                cid,
                WinnerReason::TieBreak(lowest.0),
                &sorted,
                &assignments,
                active,
                threshold,
            );
        }

        if lowest == VoteCount::EMPTY {
            debug!("run_one_round: dropping zero-vote candidates {:?}", losers);
            self.eliminated.extend(losers.iter().cloned());
            self.dropped.extend(losers.iter().cloned());
            return RoundOutcome::Dropped(losers);
        }

        self.steps.push(steps::standings_step(
            contest,
            self.round,
            &assignments,
            &self.eliminated,
            &sorted,
        ));

        let next_remaining: BTreeSet<CandidateId> = remaining
            .iter()
            .filter(|cid| !losers.contains(cid))
            .cloned()
            .collect();
        let next_assignments = assign_all(&contest.ballots, &next_remaining);

        // Each elimination is narrated on its own, with the ballots moved so far.
        let mut progressive = assignments.clone();
        let mut round_movements: Vec<Movement> = Vec::new();
        for (phase, loser) in losers.iter().enumerate() {
            self.eliminated.insert(*loser);
            let mut movements: Vec<Movement> = Vec::new();
            for (ballot, current) in assignments.iter().enumerate() {
                match current {
                    Some(from) if from.candidate == *loser => {
                        let to = next_assignments[ballot];
                        movements.push(Movement {
                            ballot,
                            from: *from,
                            to,
                        });
                        progressive[ballot] = to;
                    }
                    _ => {}
                }
            }
            self.steps.push(steps::redistribution_step(
                contest,
                self.round,
                phase + 1,
                *loser,
                &progressive,
                &self.eliminated,
                &movements,
            ));
            round_movements.extend(movements);
        }

        let exhausted = round_movements.iter().filter(|m| m.to.is_none()).count() as u64;
        let next_active = count_active(&next_assignments);
        let next_threshold = get_threshold(next_active);
        if exhausted > 0 && next_threshold != threshold && next_active > VoteCount::EMPTY {
            self.steps.push(steps::threshold_step(
                contest,
                self.round,
                exhausted,
                &next_assignments,
                &self.eliminated,
            ));
        }

        let transfers = steps::transfer_summaries(contest, &round_movements);
        self.record(&sorted, &losers, transfers, active, threshold, None);
        RoundOutcome::Eliminated(losers)
    }

    fn elect(
        &mut self,
        cid: CandidateId,
        reason: WinnerReason,
        sorted: &[(CandidateId, VoteCount)],
        assignments: &[Option<Assignment>],
        active: VoteCount,
        threshold: VoteCount,
    ) -> RoundOutcome {
        self.steps.push(steps::winner_step(
            self.contest,
            self.round,
            cid,
            reason,
            assignments,
            &self.eliminated,
        ));
        self.record(sorted, &[], Vec::new(), active, threshold, Some(cid));
        RoundOutcome::Elected(cid)
    }

    fn record(
        &mut self,
        sorted: &[(CandidateId, VoteCount)],
        eliminated: &[CandidateId],
        transfers: Vec<TransferSummary>,
        active: VoteCount,
        threshold: VoteCount,
        winner: Option<CandidateId>,
    ) {
        let contest = self.contest;
        let dropped: Vec<String> = self
            .dropped
            .drain(..)
            .map(|cid| contest.id(cid).to_string())
            .collect();
        let summary = RoundSummary {
            round: self.round,
            tally: sorted
                .iter()
                .map(|(cid, vc)| CandidateTally {
                    candidate_id: contest.id(*cid).to_string(),
                    title: contest.title(*cid).to_string(),
                    votes: vc.0,
                })
                .collect(),
            eliminated: eliminated
                .iter()
                .map(|cid| contest.id(*cid).to_string())
                .collect(),
            dropped,
            transfers,
            active_ballots: active.0,
            threshold: threshold.0,
            winner: winner.map(|cid| contest.id(cid).to_string()),
        };
        info!(
            "Round {} (winning threshold: {}): eliminated {:?}, winner {:?}",
            summary.round, summary.threshold, summary.eliminated, summary.winner
        );
        self.rounds.push(summary);
    }

    fn finish(self, winner: Option<CandidateId>, blank: u64) -> TabulationResult {
        let contest = self.contest;
        TabulationResult {
            rounds: self.rounds,
            winner: winner.map(|cid| contest.id(cid).to_string()),
            steps: self.steps,
            candidate_order: contest.ids.clone(),
            titles: contest
                .ids
                .iter()
                .cloned()
                .zip(contest.titles.iter().cloned())
                .collect(),
            ranked_ballots: contest.ranked_count().0,
            blank_ballots: blank,
        }
    }
}

fn get_threshold(active: VoteCount) -> VoteCount {
    if active == VoteCount::EMPTY {
        VoteCount::EMPTY
    } else {
        VoteCount((active.0 / 2) + 1)
    }
}

/// The first preference of the ballot that is still running, if any.
fn first_remaining(
    ranks: &[CandidateId],
    remaining: &BTreeSet<CandidateId>,
) -> Option<Assignment> {
    ranks
        .iter()
        .enumerate()
        .find(|(_, cid)| remaining.contains(*cid))
        .map(|(rank_index, cid)| Assignment {
            candidate: *cid,
            rank_index,
        })
}

fn assign_all(
    ballots: &[RankedBallot],
    remaining: &BTreeSet<CandidateId>,
) -> Vec<Option<Assignment>> {
    ballots
        .iter()
        .map(|b| first_remaining(&b.ranks, remaining))
        .collect()
}

fn count_active(assignments: &[Option<Assignment>]) -> VoteCount {
    VoteCount(assignments.iter().filter(|a| a.is_some()).count() as u64)
}

fn compute_tally(
    assignments: &[Option<Assignment>],
    remaining: &BTreeSet<CandidateId>,
) -> BTreeMap<CandidateId, VoteCount> {
    // Initialize the tally with all the running candidates, including those without votes.
    let mut tally: BTreeMap<CandidateId, VoteCount> =
        remaining.iter().map(|cid| (*cid, VoteCount::EMPTY)).collect();
    for a in assignments.iter().flatten() {
        if let Some(vc) = tally.get_mut(&a.candidate) {
            *vc += VoteCount(1);
        }
    }
    tally
}

/// Decreasing votes, ties in candidate order.
fn sorted_tally(tally: &BTreeMap<CandidateId, VoteCount>) -> Vec<(CandidateId, VoteCount)> {
    let mut sorted: Vec<(CandidateId, VoteCount)> =
        tally.iter().map(|(cid, vc)| (*cid, *vc)).collect();
    sorted.sort_by(|(c1, v1), (c2, v2)| v2.cmp(v1).then(c1.cmp(c2)));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ballots(rows: &[(&str, &str)]) -> Vec<NormalizedBallot> {
        rows.iter()
            .map(|(id, ranks)| NormalizedBallot {
                ballot_id: id.to_string(),
                ranks: ranks.split_whitespace().map(|s| s.to_string()).collect(),
            })
            .collect()
    }

    fn run(rows: &[(&str, &str)]) -> TabulationResult {
        tabulate(&ballots(rows), &TitleBook::default(), &TallyRules::DEFAULT_RULES).unwrap()
    }

    fn votes(round: &RoundSummary) -> Vec<(&str, u64)> {
        round
            .tally
            .iter()
            .map(|t| (t.candidate_id.as_str(), t.votes))
            .collect()
    }

    fn kinds(res: &TabulationResult) -> Vec<StepKind> {
        res.steps.iter().map(|s| s.kind).collect()
    }

    /// Conservation, monotonic elimination and majority correctness.
    fn check_properties(res: &TabulationResult) {
        for step in res.steps.iter() {
            let total: u64 = step.candidates.iter().map(|c| c.votes).sum();
            assert_eq!(total + step.exhausted_ballots, res.ranked_ballots, "{}", step.id);
            for c in step.candidates.iter() {
                assert_eq!(c.votes, c.tokens.len() as u64);
            }
        }
        let mut gone: HashSet<String> = HashSet::new();
        for round in res.rounds.iter() {
            for t in round.tally.iter() {
                assert!(!gone.contains(&t.candidate_id), "{} came back", t.candidate_id);
            }
            if let Some(w) = &round.winner {
                let wt = round.tally.iter().find(|t| &t.candidate_id == w).unwrap();
                let majority = wt.votes >= round.active_ballots / 2 + 1;
                let sole = round.tally.len() == 1;
                let full_tie = round.tally.iter().all(|t| t.votes == wt.votes);
                assert!(majority || sole || full_tie, "round {}", round.round);
            }
            gone.extend(round.eliminated.iter().cloned());
            gone.extend(round.dropped.iter().cloned());
        }
        for step in res.steps.iter() {
            for c in step.candidates.iter() {
                if c.status == CandidateStatus::Eliminated {
                    assert_eq!(c.votes, 0);
                }
            }
        }
    }

    #[test]
    fn single_round_majority() {
        init();
        let res = run(&[("1", "X Y"), ("2", "X Z"), ("3", "X Y")]);
        check_properties(&res);
        assert_eq!(res.winner, Some("X".to_string()));
        assert_eq!(res.rounds.len(), 1);
        let r1 = &res.rounds[0];
        assert_eq!(votes(r1), vec![("X", 3), ("Y", 0), ("Z", 0)]);
        assert_eq!(r1.active_ballots, 3);
        assert_eq!(r1.threshold, 2);
        assert!(r1.eliminated.is_empty());
        assert_eq!(kinds(&res), vec![StepKind::Winner]);
        assert_eq!(res.steps[0].id, "round-1-winner");
    }

    #[test]
    fn one_elimination_then_majority() {
        init();
        let res = run(&[
            ("1", "A B"),
            ("2", "A B"),
            ("3", "B A"),
            ("4", "C"),
        ]);
        check_properties(&res);
        assert_eq!(res.winner, Some("A".to_string()));
        assert_eq!(res.rounds.len(), 2);

        let r1 = &res.rounds[0];
        assert_eq!(votes(r1), vec![("A", 2), ("B", 1), ("C", 1)]);
        assert_eq!(r1.threshold, 3);
        assert_eq!(r1.eliminated, vec!["B", "C"]);
        assert_eq!(r1.winner, None);
        let transfers: Vec<(&str, Option<&str>, u64)> = r1
            .transfers
            .iter()
            .map(|t| (t.from_candidate_id.as_str(), t.to_candidate_id.as_deref(), t.count))
            .collect();
        assert_eq!(transfers, vec![("B", Some("A"), 1), ("C", None, 1)]);

        let r2 = &res.rounds[1];
        assert_eq!(votes(r2), vec![("A", 3)]);
        assert_eq!(r2.active_ballots, 3);
        assert_eq!(r2.threshold, 2);
        assert_eq!(r2.winner, Some("A".to_string()));

        assert_eq!(
            kinds(&res),
            vec![
                StepKind::Standings,
                StepKind::Redistribution,
                StepKind::Redistribution,
                StepKind::ThresholdUpdate,
                StepKind::Winner
            ]
        );
        let ids: Vec<&str> = res.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "round-1-standings",
                "round-1-redistribution-1",
                "round-1-redistribution-2",
                "round-1-threshold-update",
                "round-2-winner"
            ]
        );
        // The first redistribution only moves B's ballot.
        let first = &res.steps[1];
        assert_eq!(first.newly_eliminated, vec!["B"]);
        assert_eq!(first.vote_movements.len(), 1);
        assert_eq!(first.vote_movements[0].ballot_id, "3");
        assert_eq!(first.vote_movements[0].to_candidate_id.as_deref(), Some("A"));
        assert_eq!(first.vote_movements[0].to_rank_index, Some(1));
        assert_eq!(first.active_ballots, 4);
        let second = &res.steps[2];
        assert_eq!(second.vote_movements[0].to_candidate_id, None);
        assert_eq!(second.active_ballots, 3);
        assert_eq!(second.exhausted_ballots, 1);
        let update = &res.steps[3];
        assert_eq!(update.threshold, 2);
        assert_eq!(update.active_ballots, 3);
    }

    #[test]
    fn full_tie_resolution() {
        init();
        let mut titles = TitleBook::default();
        titles.insert("m2", "Alpha");
        titles.insert("m1", "Beta");
        let res = tabulate(
            &ballots(&[("1", "m1 m2"), ("2", "m2 m1")]),
            &titles,
            &TallyRules::DEFAULT_RULES,
        )
        .unwrap();
        check_properties(&res);
        assert_eq!(res.winner, Some("m2".to_string()));
        assert_eq!(res.candidate_order, vec!["m2", "m1"]);
        assert_eq!(res.rounds.len(), 1);
        assert_eq!(res.steps.len(), 1);
        assert_eq!(res.steps[0].id, "round-1-winner-tiebreak");
        assert_eq!(res.steps[0].candidates[0].status, CandidateStatus::Winner);
    }

    #[test]
    fn zero_vote_candidates_are_dropped_before_standings() {
        init();
        let res = run(&[
            ("1", "A D"),
            ("2", "A"),
            ("3", "B D"),
            ("4", "C A"),
        ]);
        check_properties(&res);
        let r1 = &res.rounds[0];
        assert_eq!(r1.round, 1);
        assert_eq!(r1.dropped, vec!["D"]);
        assert_eq!(votes(r1), vec![("A", 2), ("B", 1), ("C", 1)]);
        assert_eq!(r1.eliminated, vec!["B", "C"]);
        assert_eq!(res.winner, Some("A".to_string()));
        assert_eq!(res.rounds[1].round, 2);
        assert_eq!(res.rounds[1].dropped, Vec::<String>::new());
        // D is shown as eliminated from the first standings on.
        let d = res.steps[0]
            .candidates
            .iter()
            .find(|c| c.candidate_id == "D")
            .unwrap();
        assert_eq!(d.status, CandidateStatus::Eliminated);
    }

    #[test]
    fn empty_inputs() {
        init();
        let res = run(&[]);
        assert_eq!(res.winner, None);
        assert!(res.rounds.is_empty());
        assert!(res.steps.is_empty());

        let res = run(&[("1", ""), ("2", "")]);
        assert_eq!(res.winner, None);
        assert!(res.rounds.is_empty());
        assert_eq!(res.blank_ballots, 2);
        assert_eq!(res.ranked_ballots, 0);
    }

    #[test]
    fn blank_ballots_are_not_exhausted_votes() {
        init();
        let res = run(&[("1", "A"), ("2", ""), ("3", "A B")]);
        check_properties(&res);
        assert_eq!(res.ranked_ballots, 2);
        assert_eq!(res.blank_ballots, 1);
        assert_eq!(res.rounds[0].active_ballots, 2);
        assert_eq!(res.steps[0].exhausted_ballots, 0);
    }

    #[test]
    fn sole_candidate_wins() {
        init();
        let res = run(&[("1", "A")]);
        assert_eq!(res.winner, Some("A".to_string()));
        assert_eq!(res.rounds[0].threshold, 1);
    }

    #[test]
    fn longer_election() {
        init();
        let res = run(&[
            ("01", "A B C"),
            ("02", "A C"),
            ("03", "A B"),
            ("04", "B C A"),
            ("05", "B A"),
            ("06", "C B"),
            ("07", "C B"),
            ("08", "D C B"),
            ("09", "E"),
        ]);
        check_properties(&res);
        // Round 1: A=3 B=2 C=2 D=1 E=1, D and E go.
        let r1 = &res.rounds[0];
        assert_eq!(r1.eliminated, vec!["D", "E"]);
        assert_eq!(r1.threshold, 5);
        // Round 2: A=3 B=2 C=3, B goes. Ballot 04 goes to C, 05 to A.
        let r2 = &res.rounds[1];
        assert_eq!(votes(r2), vec![("A", 3), ("C", 3), ("B", 2)]);
        assert_eq!(r2.active_ballots, 8);
        assert_eq!(r2.eliminated, vec!["B"]);
        // Round 3: A=4 C=4 over 8 ballots, threshold 5: full tie, A by order.
        let r3 = &res.rounds[2];
        assert_eq!(votes(r3), vec![("A", 4), ("C", 4)]);
        assert_eq!(r3.winner, Some("A".to_string()));
        assert_eq!(res.winner, Some("A".to_string()));
    }

    #[test]
    fn deterministic_under_reordering() {
        init();
        let rows: Vec<(&str, &str)> = vec![
            ("a", "X Y Z"),
            ("b", "Y Z"),
            ("c", "Z X"),
            ("d", "W Y"),
            ("e", "X"),
            ("f", "Y X"),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();
        let mut rotated = rows.clone();
        rotated.rotate_left(2);

        let first = serde_json::to_string(&run(&rows)).unwrap();
        assert_eq!(first, serde_json::to_string(&run(&reversed)).unwrap());
        assert_eq!(first, serde_json::to_string(&run(&rotated)).unwrap());
        check_properties(&run(&rows));
    }

    #[test]
    fn iteration_guard_returns_partial_result() {
        init();
        let rules = TallyRules {
            rank_count: 5,
            max_iterations: 1,
        };
        let res = tabulate(
            &ballots(&[
                ("1", "A B"),
                ("2", "A B"),
                ("3", "B A"),
                ("4", "C"),
            ]),
            &TitleBook::default(),
            &rules,
        )
        .unwrap();
        assert_eq!(res.winner, None);
        assert_eq!(res.rounds.len(), 1);
        assert_eq!(res.steps.len(), 4);
    }

    #[test]
    fn invalid_rules() {
        let rules = TallyRules {
            rank_count: 0,
            max_iterations: 10,
        };
        assert_eq!(
            tabulate(&[], &TitleBook::default(), &rules),
            Err(TallyErrors::InvalidRankCount(0))
        );
    }
}
