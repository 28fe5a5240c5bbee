use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::outcome::Outcome;
use crate::rating::DEFAULT_RATING;

/// Cumulative record of one team. Counters only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub goals_scored: u32,
    #[serde(default)]
    pub goals_conceded: u32,
    #[serde(default)]
    pub yellow_cards: u32,
    #[serde(default)]
    pub red_cards: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub draws: u32,
    #[serde(default)]
    pub losses: u32,
    /// Roster keys this crate does not interpret, kept for round-tripping.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, i64>,
}

/// One side's share of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchLine {
    pub scored: u32,
    pub conceded: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub outcome: Outcome,
    /// Which side of `outcome` this team was on.
    pub is_home: bool,
}

impl TeamRecord {
    pub fn with_rating(rating: f64) -> Self {
        Self {
            rating: Some(rating),
            ..Self::default()
        }
    }

    /// Strength used for expected goals and possession; a missing or zero
    /// rating counts as the default.
    pub fn rating(&self) -> f64 {
        match self.rating {
            Some(r) if r != 0.0 && r.is_finite() => r,
            _ => DEFAULT_RATING,
        }
    }

    /// Strength used for quoting odds. An explicit zero stays zero; only a
    /// missing rating falls back to the default.
    pub fn quote_rating(&self) -> f64 {
        self.rating
            .filter(|r| r.is_finite())
            .unwrap_or(DEFAULT_RATING)
    }

    pub fn matches_played(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    pub fn apply(&mut self, line: &MatchLine) {
        match (line.outcome, line.is_home) {
            (Outcome::Draw, _) => self.draws += 1,
            (Outcome::Home, true) | (Outcome::Away, false) => self.wins += 1,
            (Outcome::Home, false) | (Outcome::Away, true) => self.losses += 1,
        }
        self.goals_scored += line.scored;
        self.goals_conceded += line.conceded;
        self.yellow_cards += line.yellow_cards;
        self.red_cards += line.red_cards;
    }
}

/// Named team records in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamBook {
    order: Vec<String>,
    records: HashMap<String, TeamRecord>,
}

impl TeamBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces; a replaced team keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, record: TeamRecord) {
        let name = name.into();
        if self.records.insert(name.clone(), record).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&TeamRecord> {
        self.records.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TeamRecord> {
        self.records.get_mut(name)
    }

    pub fn require(&self, name: &str) -> Result<&TeamRecord, SimError> {
        self.get(name)
            .ok_or_else(|| SimError::UnknownTeam(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TeamRecord)> {
        self.order
            .iter()
            .filter_map(|name| self.records.get(name).map(|r| (name.as_str(), r)))
    }

    /// Records one match for both sides. Both names are checked before either
    /// record is touched.
    pub fn record_match(
        &mut self,
        home: &str,
        away: &str,
        home_line: &MatchLine,
        away_line: &MatchLine,
    ) -> Result<(), SimError> {
        self.require(home)?;
        self.require(away)?;
        if let Some(rec) = self.records.get_mut(home) {
            rec.apply(home_line);
        }
        if let Some(rec) = self.records.get_mut(away) {
            rec.apply(away_line);
        }
        Ok(())
    }
}

impl FromIterator<(String, TeamRecord)> for TeamBook {
    fn from_iter<I: IntoIterator<Item = (String, TeamRecord)>>(iter: I) -> Self {
        let mut book = TeamBook::new();
        for (name, record) in iter {
            book.insert(name, record);
        }
        book
    }
}

#[cfg(test)]
mod tests {
    use super::{MatchLine, TeamBook, TeamRecord};
    use crate::error::SimError;
    use crate::outcome::Outcome;

    fn line(scored: u32, conceded: u32, outcome: Outcome, is_home: bool) -> MatchLine {
        MatchLine {
            scored,
            conceded,
            yellow_cards: 2,
            red_cards: 1,
            outcome,
            is_home,
        }
    }

    #[test]
    fn missing_or_zero_rating_uses_default() {
        assert_eq!(TeamRecord::default().rating(), 1000.0);
        assert_eq!(TeamRecord::with_rating(0.0).rating(), 1000.0);
        assert_eq!(TeamRecord::with_rating(955.0).rating(), 955.0);
    }

    #[test]
    fn quoting_keeps_an_explicit_zero() {
        assert_eq!(TeamRecord::with_rating(0.0).quote_rating(), 0.0);
        assert_eq!(TeamRecord::default().quote_rating(), 1000.0);
        assert_eq!(TeamRecord::with_rating(f64::NAN).quote_rating(), 1000.0);
        assert_eq!(TeamRecord::with_rating(955.0).quote_rating(), 955.0);
    }

    #[test]
    fn record_match_books_exactly_one_result_per_side() {
        let mut book: TeamBook = [
            ("A".to_string(), TeamRecord::with_rating(1000.0)),
            ("B".to_string(), TeamRecord::with_rating(900.0)),
        ]
        .into_iter()
        .collect();

        book.record_match(
            "A",
            "B",
            &line(2, 1, Outcome::Home, true),
            &line(1, 2, Outcome::Home, false),
        )
        .expect("both teams exist");

        let a = book.get("A").expect("A");
        let b = book.get("B").expect("B");
        assert_eq!((a.wins, a.draws, a.losses), (1, 0, 0));
        assert_eq!((b.wins, b.draws, b.losses), (0, 0, 1));
        assert_eq!((a.goals_scored, a.goals_conceded), (2, 1));
        assert_eq!((b.yellow_cards, b.red_cards), (2, 1));
    }

    #[test]
    fn unknown_team_leaves_book_untouched() {
        let mut book = TeamBook::new();
        book.insert("A", TeamRecord::default());
        let before = book.clone();
        let err = book
            .record_match(
                "A",
                "Nobody",
                &line(0, 0, Outcome::Draw, true),
                &line(0, 0, Outcome::Draw, false),
            )
            .unwrap_err();
        assert_eq!(err, SimError::UnknownTeam("Nobody".to_string()));
        assert_eq!(book, before);
    }

    #[test]
    fn insert_keeps_first_position() {
        let mut book = TeamBook::new();
        book.insert("A", TeamRecord::default());
        book.insert("B", TeamRecord::default());
        book.insert("A", TeamRecord::with_rating(1200.0));
        assert_eq!(book.names(), ["A".to_string(), "B".to_string()]);
        assert_eq!(book.get("A").map(|r| r.rating()), Some(1200.0));
    }
}
