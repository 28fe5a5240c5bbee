use rayon::prelude::*;

use crate::outcome::{Outcome, classify_outcome};
use crate::random::RngSource;
use crate::rating::{OddsQuote, calc_odds};
use crate::simulator::MatchSimulator;
use crate::team::TeamRecord;

const CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedFrequencies {
    pub samples: usize,
    pub probs: Prob3,
    pub mean_home_goals: f64,
    pub mean_away_goals: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationReport {
    pub quote: OddsQuote,
    pub implied: Prob3,
    pub overround: f64,
    pub simulated: SimulatedFrequencies,
}

impl CalibrationReport {
    /// Expected return per unit staked on `outcome` if the simulator is the
    /// truth.
    pub fn expected_return(&self, outcome: Outcome) -> f64 {
        self.simulated.probs.get(outcome) * self.quote.for_outcome(outcome)
    }
}

/// Sum of inverse odds; 1.0 is a fair book.
pub fn overround(quote: &OddsQuote) -> f64 {
    1.0 / quote.home + 1.0 / quote.draw + 1.0 / quote.away
}

/// Inverse odds normalized to sum to one.
pub fn implied_probs(quote: &OddsQuote) -> Prob3 {
    let total = overround(quote);
    Prob3 {
        home: (1.0 / quote.home) / total,
        draw: (1.0 / quote.draw) / total,
        away: (1.0 / quote.away) / total,
    }
}

/// Plays `samples` independent matches and counts outcomes. Chunks run in
/// parallel, each on its own source seeded from `seed` and the chunk index,
/// so results do not depend on the thread count.
pub fn simulate_frequencies(
    home: &TeamRecord,
    away: &TeamRecord,
    samples: usize,
    seed: u64,
) -> SimulatedFrequencies {
    if samples == 0 {
        return SimulatedFrequencies {
            samples: 0,
            probs: Prob3 {
                home: 0.0,
                draw: 0.0,
                away: 0.0,
            },
            mean_home_goals: 0.0,
            mean_away_goals: 0.0,
        };
    }

    let chunks = samples.div_ceil(CHUNK);
    let tally = (0..chunks)
        .into_par_iter()
        .map(|chunk| {
            let n = CHUNK.min(samples - chunk * CHUNK);
            let chunk_seed = seed ^ (chunk as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
            let mut sim = MatchSimulator::new(RngSource::seeded(chunk_seed));
            let mut t = Tally::default();
            for _ in 0..n {
                let plan = sim.draw_plan(home, away);
                let (h, a) = (plan.counts.goals_home, plan.counts.goals_away);
                t.add(h, a);
            }
            t
        })
        .reduce(Tally::default, Tally::merge);

    let n = samples as f64;
    SimulatedFrequencies {
        samples,
        probs: Prob3 {
            home: tally.home as f64 / n,
            draw: tally.draw as f64 / n,
            away: tally.away as f64 / n,
        },
        mean_home_goals: tally.home_goals as f64 / n,
        mean_away_goals: tally.away_goals as f64 / n,
    }
}

pub fn calibrate(
    home: &TeamRecord,
    away: &TeamRecord,
    samples: usize,
    seed: u64,
) -> CalibrationReport {
    let quote = calc_odds(home.quote_rating(), away.quote_rating());
    CalibrationReport {
        quote,
        implied: implied_probs(&quote),
        overround: overround(&quote),
        simulated: simulate_frequencies(home, away, samples, seed),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    home: u64,
    draw: u64,
    away: u64,
    home_goals: u64,
    away_goals: u64,
}

impl Tally {
    fn add(&mut self, home_goals: u32, away_goals: u32) {
        match classify_outcome(home_goals, away_goals) {
            Outcome::Home => self.home += 1,
            Outcome::Draw => self.draw += 1,
            Outcome::Away => self.away += 1,
        }
        self.home_goals += home_goals as u64;
        self.away_goals += away_goals as u64;
    }

    fn merge(a: Tally, b: Tally) -> Tally {
        Tally {
            home: a.home + b.home,
            draw: a.draw + b.draw,
            away: a.away + b.away,
            home_goals: a.home_goals + b.home_goals,
            away_goals: a.away_goals + b.away_goals,
        }
    }
}
