use serde::{Deserialize, Serialize};

use crate::outcome::Outcome;

pub const DEFAULT_RATING: f64 = 1000.0;

pub const ODDS_MIN: f64 = 1.01;
pub const ODDS_MAX: f64 = 150.0;
/// Home odds shrink and away odds grow by this share.
pub const HOME_ADVANTAGE: f64 = 0.12;
/// Draw odds are the two win odds summed and divided by this.
pub const DRAW_DIVISOR: f64 = 1.7;

pub const GOALS_LOG_BASE: f64 = 1.25;
pub const MIN_EXPECTED_GOALS: f64 = 0.2;
pub const MAX_EXPECTED_GOALS: f64 = 20.0;
const RATIO_FLOOR: f64 = 1e-8;

/// Decimal odds for one fixture, captured when the bettor asks for them and
/// kept until the match is settled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl OddsQuote {
    pub fn for_outcome(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}

/// Elo-style expectation of `r_a` scoring against `r_b`.
pub fn expected_score(r_a: f64, r_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((r_b - r_a) / 400.0))
}

pub fn calc_odds(r_home: f64, r_away: f64) -> OddsQuote {
    let e_home = expected_score(r_home, r_away);
    let e_away = expected_score(r_away, r_home);

    let k1 = clamp_odds(1.0 / e_home);
    let k2 = clamp_odds(1.0 / e_away);

    // The adjustment can push an odd past the bounds again, so re-clamp.
    let home = clamp_odds(k1 * (1.0 - HOME_ADVANTAGE));
    let away = clamp_odds(k2 * (1.0 + HOME_ADVANTAGE));
    let draw = clamp_odds((home + away) / DRAW_DIVISOR);

    OddsQuote { home, draw, away }
}

/// Poisson rates for both sides, before any home boost.
pub fn expected_goals(r_home: f64, r_away: f64) -> (f64, f64) {
    let ratio = (r_home + 1.0) / (r_away + 1.0);
    let base = GOALS_LOG_BASE.ln();
    let g1 = ratio.max(RATIO_FLOOR).ln() / base;
    let g2 = (1.0 / ratio).max(RATIO_FLOOR).ln() / base;
    (
        clamp(g1, MIN_EXPECTED_GOALS, MAX_EXPECTED_GOALS),
        clamp(g2, MIN_EXPECTED_GOALS, MAX_EXPECTED_GOALS),
    )
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn clamp_odds(x: f64) -> f64 {
    round2(clamp(x, ODDS_MIN, ODDS_MAX))
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    // NaN collapses to the lower bound.
    if v.is_nan() { lo } else { v.max(lo).min(hi) }
}
