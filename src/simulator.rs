use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;
use crate::outcome::{Outcome, classify_outcome};
use crate::random::RandomSource;
use crate::rating::expected_goals;
use crate::schedule::{
    EventCounts, MatchEvent, REGULATION_MINUTES, Side, Timeline, draw_stoppage,
};
use crate::team::{MatchLine, TeamBook, TeamRecord};

/// Multiplier on the home side's expected goals.
pub const HOME_SCORING_BOOST: f64 = 1.1;
/// Relative weights of 0..=5 home cautions.
pub const HOME_CAUTION_WEIGHTS: [u32; 6] = [30, 35, 20, 10, 4, 1];
/// Relative weights of 0..=6 away cautions.
pub const AWAY_CAUTION_WEIGHTS: [u32; 7] = [25, 35, 20, 10, 7, 2, 1];
/// A team's cumulative red cards divided by this is its dismissal chance.
pub const DISMISSAL_RATE_DIVISOR: f64 = 100.0;

/// Per-side ranges for the display statistics.
#[derive(Debug, Clone, Copy)]
struct StatProfile {
    on_target_spread: u32,
    fouls: (u32, u32),
}

const HOME_PROFILE: StatProfile = StatProfile {
    on_target_spread: 6,
    fouls: (5, 12),
};
const AWAY_PROFILE: StatProfile = StatProfile {
    on_target_spread: 4,
    fouls: (7, 14),
};

/// Counts drawn for one match, before any minute is assigned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPlan {
    pub expected_home: f64,
    pub expected_away: f64,
    pub counts: EventCounts,
    pub stoppage: u32,
}

impl MatchPlan {
    pub fn total_minutes(&self) -> u32 {
        REGULATION_MINUTES + self.stoppage
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub goals: u32,
    pub shots: u32,
    pub shots_on_target: u32,
    pub possession: u32,
    pub corners: u32,
    pub offsides: u32,
    pub fouls: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub home: String,
    pub away: String,
    pub home_goals: u32,
    pub away_goals: u32,
    pub outcome: Outcome,
    pub home_stats: MatchStatistics,
    pub away_stats: MatchStatistics,
    pub timeline: Timeline,
    pub stoppage: u32,
}

impl MatchResult {
    pub fn total_minutes(&self) -> u32 {
        REGULATION_MINUTES + self.stoppage
    }

    pub fn scoreline(&self) -> String {
        format!(
            "{} {} - {} {}",
            self.home, self.home_goals, self.away_goals, self.away
        )
    }

    pub fn stats(&self, side: Side) -> &MatchStatistics {
        match side {
            Side::Home => &self.home_stats,
            Side::Away => &self.away_stats,
        }
    }

    /// What the match adds to each team's cumulative record.
    pub fn lines(&self) -> (MatchLine, MatchLine) {
        let home = MatchLine {
            scored: self.home_goals,
            conceded: self.away_goals,
            yellow_cards: self.home_stats.yellow_cards,
            red_cards: self.home_stats.red_cards,
            outcome: self.outcome,
            is_home: true,
        };
        let away = MatchLine {
            scored: self.away_goals,
            conceded: self.home_goals,
            yellow_cards: self.away_stats.yellow_cards,
            red_cards: self.away_stats.red_cards,
            outcome: self.outcome,
            is_home: false,
        };
        (home, away)
    }
}

/// Samples matches from an injected random source.
#[derive(Debug, Clone)]
pub struct MatchSimulator<R> {
    rng: R,
}

impl<R: RandomSource> MatchSimulator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Goals first (home, away), then cautions, dismissals and added time.
    pub fn draw_plan(&mut self, home: &TeamRecord, away: &TeamRecord) -> MatchPlan {
        let (exp_home, exp_away) = expected_goals(home.rating(), away.rating());
        let exp_home = exp_home * HOME_SCORING_BOOST;

        let goals_home = self.rng.poisson(exp_home);
        let goals_away = self.rng.poisson(exp_away);
        let cautions_home = self.rng.weighted_index(&HOME_CAUTION_WEIGHTS) as u32;
        let cautions_away = self.rng.weighted_index(&AWAY_CAUTION_WEIGHTS) as u32;
        let dismissals_home = u32::from(self.rng.chance(dismissal_chance(home)));
        let dismissals_away = u32::from(self.rng.chance(dismissal_chance(away)));
        let stoppage = draw_stoppage(&mut self.rng);

        let plan = MatchPlan {
            expected_home: exp_home,
            expected_away: exp_away,
            counts: EventCounts {
                goals_home,
                goals_away,
                cautions_home,
                cautions_away,
                dismissals_home,
                dismissals_away,
            },
            stoppage,
        };
        debug!(
            exp_home,
            exp_away,
            goals_home,
            goals_away,
            stoppage,
            "drew match plan"
        );
        plan
    }

    /// Samples a whole match between two records without touching any store.
    pub fn play(
        &mut self,
        home_name: &str,
        home: &TeamRecord,
        away_name: &str,
        away: &TeamRecord,
    ) -> MatchResult {
        let plan = self.draw_plan(home, away);
        self.complete(plan, home_name, home, away_name, away)
    }

    /// Builds the timeline and statistics for an already drawn plan.
    pub fn complete(
        &mut self,
        plan: MatchPlan,
        home_name: &str,
        home: &TeamRecord,
        away_name: &str,
        away: &TeamRecord,
    ) -> MatchResult {
        let counts = plan.counts;
        let timeline = Timeline::build(&counts, plan.total_minutes(), &mut self.rng);

        let home_possession = if home.rating() > away.rating() {
            self.rng.uniform_int(51, 75)
        } else {
            self.rng.uniform_int(25, 49)
        };
        let home_stats = derive_stats(
            &mut self.rng,
            HOME_PROFILE,
            counts.goals_home,
            counts.cautions_home,
            counts.dismissals_home,
            home_possession,
        );
        let away_stats = derive_stats(
            &mut self.rng,
            AWAY_PROFILE,
            counts.goals_away,
            counts.cautions_away,
            counts.dismissals_away,
            100 - home_possession,
        );

        MatchResult {
            home: home_name.to_string(),
            away: away_name.to_string(),
            home_goals: counts.goals_home,
            away_goals: counts.goals_away,
            outcome: classify_outcome(counts.goals_home, counts.goals_away),
            home_stats,
            away_stats,
            timeline,
            stoppage: plan.stoppage,
        }
    }

    /// Validates the pairing and samples the match. Nothing in `book` changes
    /// until the returned replay is finished.
    pub fn kick_off(&mut self, book: &TeamBook, home: &str, away: &str) -> Result<Replay, SimError> {
        if home == away {
            return Err(SimError::SameTeam(home.to_string()));
        }
        let home_rec = book.require(home)?;
        let away_rec = book.require(away)?;
        let result = self.play(home, home_rec, away, away_rec);
        Ok(Replay::new(result))
    }

    /// Instant mode: kick off and consume every minute in one pass.
    pub fn simulate(
        &mut self,
        book: &mut TeamBook,
        home: &str,
        away: &str,
    ) -> Result<MatchResult, SimError> {
        let replay = self.kick_off(book, home, away)?;
        replay.finish(book)
    }
}

fn dismissal_chance(team: &TeamRecord) -> f64 {
    team.red_cards as f64 / DISMISSAL_RATE_DIVISOR
}

fn derive_stats<R: RandomSource + ?Sized>(
    rng: &mut R,
    profile: StatProfile,
    goals: u32,
    yellow_cards: u32,
    red_cards: u32,
    possession: u32,
) -> MatchStatistics {
    let shots = rng.uniform_int(4, 8) + goals * rng.uniform_int(2, 4);
    let spread = rng.uniform_int(1, profile.on_target_spread);
    let shots_on_target = rng.uniform_int(goals, goals + spread).min(shots);
    let corners = rng.uniform_int(1, 5) + goals;
    let offsides = rng.uniform_int(0, 3);
    let fouls = rng.uniform_int(profile.fouls.0, profile.fouls.1) + yellow_cards;
    MatchStatistics {
        goals,
        shots,
        shots_on_target,
        possession,
        corners,
        offsides,
        fouls,
        yellow_cards,
        red_cards,
    }
}

/// Everything that happened in one minute; `events` may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MinuteTick {
    pub minute: u32,
    pub events: Vec<MatchEvent>,
}

/// Minute-by-minute reveal of a sampled match. Yields one tick for every
/// minute from 1 to the final whistle and cannot be restarted. Dropping it
/// abandons the match without recording anything.
#[derive(Debug, Clone)]
pub struct Replay {
    result: MatchResult,
    next_minute: u32,
}

impl Replay {
    fn new(result: MatchResult) -> Self {
        Self {
            result,
            next_minute: 1,
        }
    }

    pub fn home(&self) -> &str {
        &self.result.home
    }

    pub fn away(&self) -> &str {
        &self.result.away
    }

    pub fn total_minutes(&self) -> u32 {
        self.result.total_minutes()
    }

    /// Last minute delivered, 0 before kick-off.
    pub fn minute(&self) -> u32 {
        self.next_minute - 1
    }

    pub fn is_finished(&self) -> bool {
        self.next_minute > self.total_minutes()
    }

    /// Delivers any remaining minutes to nobody, then books the match into
    /// both team records.
    pub fn finish(mut self, book: &mut TeamBook) -> Result<MatchResult, SimError> {
        self.by_ref().for_each(drop);
        let (home_line, away_line) = self.result.lines();
        book.record_match(&self.result.home, &self.result.away, &home_line, &away_line)?;
        Ok(self.result)
    }
}

impl Iterator for Replay {
    type Item = MinuteTick;

    fn next(&mut self) -> Option<MinuteTick> {
        if self.is_finished() {
            return None;
        }
        let minute = self.next_minute;
        self.next_minute += 1;
        Some(MinuteTick {
            minute,
            events: self.result.timeline.at_minute(minute),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total_minutes() + 1 - self.next_minute) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Replay {}
impl FusedIterator for Replay {}
