use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::clamp_rounds;
use crate::error::SimError;
use crate::history::Ledger;
use crate::outcome::Outcome;
use crate::persist::Store;
use crate::random::RandomSource;
use crate::rating::{OddsQuote, calc_odds};
use crate::roster::default_roster;
use crate::settlement::{BetTicket, Settlement, check_funds, parse_stake, settle};
use crate::simulator::{MatchResult, MatchSimulator, MinuteTick, Replay};
use crate::team::TeamBook;

pub use crate::settlement::LockedQuote;

#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: u32,
    pub result: MatchResult,
    pub settlement: Settlement,
}

/// Outcome of a multi-round run: the rounds that settled, and why the run
/// ended early if it did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionRun {
    pub rounds: Vec<RoundReport>,
    pub stopped: Option<SimError>,
}

/// Owns the team book and balance for one bettor, backed by a store.
pub struct Session<S: Store> {
    store: S,
    book: TeamBook,
    balance: f64,
    quote: Option<LockedQuote>,
    ledger: Option<Ledger>,
    rounds_played: u32,
}

impl<S: Store> Session<S> {
    /// Loads state from `store`, seeding the default roster when the store
    /// holds no teams.
    pub fn open(store: S) -> Self {
        let mut book = store.load_teams();
        if book.is_empty() {
            book = default_roster();
            if let Err(err) = store.save_teams(&book) {
                warn!(%err, "could not save default roster");
            }
        }
        let balance = store.load_balance();
        info!(teams = book.len(), balance, "session opened");
        Self {
            store,
            book,
            balance,
            quote: None,
            ledger: None,
            rounds_played: 0,
        }
    }

    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn book(&self) -> &TeamBook {
        &self.book
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_ref()
    }

    pub fn locked_quote(&self) -> Option<&LockedQuote> {
        self.quote.as_ref()
    }

    pub fn clear_quote(&mut self) {
        self.quote = None;
    }

    /// Quotes and locks odds for `home` against `away`.
    pub fn request_odds(&mut self, home: &str, away: &str) -> Result<OddsQuote, SimError> {
        if home == away {
            return Err(SimError::SameTeam(home.to_string()));
        }
        let home_rec = self.book.require(home)?;
        let away_rec = self.book.require(away)?;
        let odds = calc_odds(home_rec.quote_rating(), away_rec.quote_rating());
        self.quote = Some(LockedQuote {
            home: home.to_string(),
            away: away.to_string(),
            odds,
        });
        Ok(odds)
    }

    /// Builds a ticket from the locked quote. Nothing is debited yet.
    pub fn place_bet(&self, pick: Option<Outcome>, stake: &str) -> Result<BetTicket, SimError> {
        let quote = self.quote.as_ref().ok_or(SimError::NoQuote)?;
        let pick = pick.ok_or(SimError::NoPick)?;
        let stake = parse_stake(stake)?;
        check_funds(stake, self.balance)?;
        BetTicket::new(pick, stake, quote.clone())
    }

    /// Samples the next round for the pair the ticket was written on, which
    /// may differ from the quote locked now. Funds are checked against the
    /// balance as it stands now, so later rounds see earlier results.
    pub fn kick_off<R: RandomSource>(
        &self,
        sim: &mut MatchSimulator<R>,
        ticket: &BetTicket,
    ) -> Result<Replay, SimError> {
        check_funds(ticket.stake, self.balance)?;
        sim.kick_off(&self.book, &ticket.quote.home, &ticket.quote.away)
    }

    /// Books the match into the team records, settles the ticket and
    /// persists both. Either all of it happens or none of it.
    pub fn settle_round(
        &mut self,
        replay: Replay,
        ticket: &BetTicket,
    ) -> Result<RoundReport, SimError> {
        if !ticket.quote.covers(replay.home(), replay.away()) {
            return Err(SimError::FixtureMismatch {
                home: ticket.quote.home.clone(),
                away: ticket.quote.away.clone(),
            });
        }
        check_funds(ticket.stake, self.balance)?;
        let mut next_book = self.book.clone();
        let result = replay.finish(&mut next_book)?;
        let settlement = settle(ticket, result.outcome, self.balance)?;

        self.book = next_book;
        self.balance = settlement.balance_after;
        self.rounds_played += 1;
        self.persist();
        if let Some(ledger) = &self.ledger {
            if let Err(err) = ledger.record(&result, &settlement) {
                warn!(%err, "could not append round to ledger");
            }
        }

        info!(
            round = self.rounds_played,
            score = %result.scoreline(),
            won = settlement.won,
            balance = self.balance,
            "round settled"
        );
        Ok(RoundReport {
            round: self.rounds_played,
            result,
            settlement,
        })
    }

    /// Instant mode for a single round.
    pub fn play_round<R: RandomSource>(
        &mut self,
        sim: &mut MatchSimulator<R>,
        ticket: &BetTicket,
    ) -> Result<RoundReport, SimError> {
        let replay = self.kick_off(sim, ticket)?;
        self.settle_round(replay, ticket)
    }

    /// Plays `rounds` rounds back to back (clamped to 1..=20). Every minute
    /// is handed to `on_minute` with its event descriptions; a non-zero
    /// `speed` sleeps between minutes. `cancel` is checked between minutes
    /// and abandons the current round without booking it.
    pub fn play_rounds<R, F>(
        &mut self,
        sim: &mut MatchSimulator<R>,
        ticket: &BetTicket,
        rounds: u32,
        speed: Duration,
        cancel: &AtomicBool,
        mut on_minute: F,
    ) -> SessionRun
    where
        R: RandomSource,
        F: FnMut(u32, &[String]),
    {
        let mut run = SessionRun::default();
        for _ in 0..clamp_rounds(rounds) {
            let mut replay = match self.kick_off(sim, ticket) {
                Ok(replay) => replay,
                Err(err) => {
                    run.stopped = Some(err);
                    return run;
                }
            };
            let home = replay.home().to_string();
            let away = replay.away().to_string();
            let total = replay.total_minutes();

            while let Some(tick) = replay.next() {
                if cancel.load(Ordering::Relaxed) {
                    run.stopped = Some(SimError::ReplayCancelled);
                    return run;
                }
                on_minute(tick.minute, &describe_tick(&tick, &home, &away));
                if !speed.is_zero() && tick.minute < total {
                    thread::sleep(speed);
                }
            }

            match self.settle_round(replay, ticket) {
                Ok(report) => run.rounds.push(report),
                Err(err) => {
                    run.stopped = Some(err);
                    return run;
                }
            }
        }
        run
    }

    fn persist(&self) {
        if let Err(err) = self.store.save_teams(&self.book) {
            warn!(%err, "could not save team records");
        }
        if let Err(err) = self.store.save_balance(self.balance) {
            warn!(%err, "could not save balance");
        }
    }
}

pub fn describe_tick(tick: &MinuteTick, home: &str, away: &str) -> Vec<String> {
    tick.events.iter().map(|e| e.describe(home, away)).collect()
}
