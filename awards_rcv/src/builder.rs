pub use crate::config::*;

use log::debug;

use crate::normalize::normalize_all;

/// A builder for collecting ballots before the tabulation.
///
/// It keeps every record it receives, so that the participation figures can
/// report the ballots excluded by the organizers.
///
/// ```
/// pub use awards_rcv::builder::Builder;
/// pub use awards_rcv::{CatalogEntry, TallyRules};
/// # use awards_rcv::TallyErrors;
///
/// let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)?.catalog(&[
///     CatalogEntry { id: "m1".to_string(), title: "Anora".to_string() },
///     CatalogEntry { id: "m2".to_string(), title: "Dune".to_string() },
/// ])?;
///
/// builder.add_vote_simple("ballot-1", &["m1".to_string(), "m2".to_string()])?;
/// builder.add_vote_simple("ballot-2", &["m2".to_string()])?;
/// builder.add_vote_simple("ballot-3", &["m1".to_string()])?;
///
/// let result = builder.tabulate()?;
/// assert_eq!(result.winner, Some("m1".to_string()));
/// assert_eq!(builder.participation().included_ballots, 3);
///
/// # Ok::<(), TallyErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TallyRules,
    pub(crate) _catalog: Vec<CatalogEntry>,
    pub(crate) _records: Vec<BallotRecord>,
}

impl Builder {
    pub fn new(rules: &TallyRules) -> Result<Builder, TallyErrors> {
        rules.validate()?;
        Ok(Builder {
            _rules: rules.clone(),
            _catalog: Vec::new(),
            _records: Vec::new(),
        })
    }

    /// Sets the movie catalog, which provides the display titles.
    pub fn catalog(self, entries: &[CatalogEntry]) -> Result<Builder, TallyErrors> {
        Ok(Builder {
            _rules: self._rules,
            _catalog: entries.to_vec(),
            _records: self._records,
        })
    }

    /// Adds a ballot that ranks the given movies, favorite first.
    ///
    /// Every ranked movie is marked as seen. The ranking is stored both as an
    /// explicit rank array (when it has exactly the rank count of the rules)
    /// and as legacy per-movie ranks.
    pub fn add_vote_simple(
        &mut self,
        ballot_id: &str,
        ranks: &[String],
    ) -> Result<(), TallyErrors> {
        let mut record = BallotRecord::new(ballot_id);
        record.movies = ranks
            .iter()
            .enumerate()
            .map(|(idx, id)| MovieMark {
                id: id.clone(),
                title: None,
                seen: true,
                rank: Some(idx as i64 + 1),
            })
            .collect();
        if ranks.len() == self._rules.rank_count {
            record.best_picture_ranks = Some(
                ranks
                    .iter()
                    .map(|id| RankEntry::Candidate(id.clone()))
                    .collect(),
            );
        }
        self.add_record(&record)
    }

    pub fn add_record(&mut self, record: &BallotRecord) -> Result<(), TallyErrors> {
        self._records.push(record.clone());
        Ok(())
    }

    pub fn add_records(&mut self, records: &[BallotRecord]) -> Result<(), TallyErrors> {
        for r in records {
            self.add_record(r)?;
        }
        Ok(())
    }

    /// The number of records received, including the excluded ones.
    pub fn total(&self) -> usize {
        self._records.len()
    }

    /// The records that are not excluded from the analysis.
    pub fn included(&self) -> Vec<BallotRecord> {
        self._records
            .iter()
            .filter(|r| r.is_included())
            .cloned()
            .collect()
    }

    pub fn titles(&self) -> TitleBook {
        let mut titles = TitleBook::from_catalog(&self._catalog);
        titles.learn_from_records(&self.included());
        titles
    }

    pub fn normalized(&self) -> Vec<NormalizedBallot> {
        normalize_all(&self.included(), self._rules.rank_count)
    }

    pub fn participation(&self) -> ParticipationStats {
        crate::stats::participation(&self.included(), self.total())
    }

    pub fn tabulate(&self) -> Result<TabulationResult, TallyErrors> {
        let ballots = self.normalized();
        debug!(
            "Builder::tabulate: {} of {} records included",
            ballots.len(),
            self.total()
        );
        crate::tabulate(&ballots, &self.titles(), &self._rules)
    }
}
