use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{SimError, StakeIssue};
use crate::outcome::Outcome;
use crate::rating::{OddsQuote, round2};

pub const MIN_STAKE: f64 = 0.5;
pub const MAX_STAKE: f64 = 10_000.0;
pub const DEFAULT_BALANCE: f64 = 10_000.0;

/// Odds as quoted for a team pair. Settlement always uses these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedQuote {
    pub home: String,
    pub away: String,
    pub odds: OddsQuote,
}

impl LockedQuote {
    pub fn covers(&self, home: &str, away: &str) -> bool {
        self.home == home && self.away == away
    }
}

/// A wager on one fixture. The ticket carries the quote it was written
/// against, so later quotes cannot change what it pays or which match it
/// is played on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetTicket {
    pub pick: Outcome,
    pub stake: f64,
    pub quote: LockedQuote,
}

impl BetTicket {
    pub fn new(pick: Outcome, stake: f64, quote: LockedQuote) -> Result<Self, SimError> {
        validate_stake(stake)?;
        Ok(Self { pick, stake, quote })
    }

    pub fn odds(&self) -> &OddsQuote {
        &self.quote.odds
    }
}

/// Parses free-form stake input ("10", " 2.5 ").
pub fn parse_stake(raw: &str) -> Result<f64, SimError> {
    let stake = raw
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| SimError::InvalidStake(StakeIssue::NotANumber))?;
    validate_stake(stake)?;
    Ok(stake)
}

pub fn validate_stake(stake: f64) -> Result<(), SimError> {
    if !stake.is_finite() {
        return Err(SimError::InvalidStake(StakeIssue::NotANumber));
    }
    if stake < MIN_STAKE {
        return Err(SimError::InvalidStake(StakeIssue::BelowMinimum));
    }
    if stake > MAX_STAKE {
        return Err(SimError::InvalidStake(StakeIssue::AboveMaximum));
    }
    Ok(())
}

pub fn check_funds(stake: f64, balance: f64) -> Result<(), SimError> {
    if stake > balance {
        return Err(SimError::InsufficientFunds { stake, balance });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub pick: Outcome,
    pub outcome: Outcome,
    pub stake: f64,
    /// Quoted odd of the actual outcome.
    pub odd: f64,
    pub won: bool,
    /// Credited amount on a win, 0 on a loss.
    pub payout: f64,
    pub balance_before: f64,
    pub balance_after: f64,
}

impl Settlement {
    /// Signed balance change.
    pub fn net(&self) -> f64 {
        round2(self.balance_after - self.balance_before)
    }
}

/// Settles one ticket against the match outcome. A win credits
/// `round2(stake * odd)`; a loss debits the stake. The new balance is rounded
/// to cents.
pub fn settle(ticket: &BetTicket, outcome: Outcome, balance: f64) -> Result<Settlement, SimError> {
    check_funds(ticket.stake, balance)?;

    let odd = ticket.odds().for_outcome(outcome);
    let won = ticket.pick == outcome;
    let (payout, balance_after) = if won {
        let payout = round2(ticket.stake * odd);
        (payout, round2(balance + payout))
    } else {
        (0.0, round2(balance - ticket.stake))
    };

    info!(
        pick = %ticket.pick,
        outcome = %outcome,
        stake = ticket.stake,
        odd,
        won,
        balance_after,
        "settled bet"
    );

    Ok(Settlement {
        pick: ticket.pick,
        outcome,
        stake: ticket.stake,
        odd,
        won,
        payout,
        balance_before: balance,
        balance_after,
    })
}
