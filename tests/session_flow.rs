use std::sync::atomic::AtomicBool;
use std::time::Duration;

use matchbet_terminal::error::{SimError, StakeIssue};
use matchbet_terminal::history::Ledger;
use matchbet_terminal::outcome::Outcome;
use matchbet_terminal::persist::{MemoryStore, Store};
use matchbet_terminal::random::{RngSource, ScriptedSource};
use matchbet_terminal::rating::{OddsQuote, calc_odds};
use matchbet_terminal::session::Session;
use matchbet_terminal::simulator::MatchSimulator;
use matchbet_terminal::team::{TeamBook, TeamRecord};

fn two_team_book() -> TeamBook {
    let mut book = TeamBook::new();
    book.insert("A", TeamRecord::with_rating(1000.0));
    book.insert("B", TeamRecord::with_rating(1000.0));
    book
}

fn session_with(balance: f64) -> Session<MemoryStore> {
    Session::open(MemoryStore::with_state(two_team_book(), balance))
}

/// Rating 1000 on both sides: 0.9 then 0.5 yields one goal each.
fn one_all_sim() -> MatchSimulator<ScriptedSource> {
    MatchSimulator::new(ScriptedSource::new([0.9, 0.5]))
}

#[test]
fn draw_bet_on_forced_draw_pays_quoted_odds() {
    let mut session = session_with(10_000.0).with_ledger(Ledger::open_in_memory().expect("sqlite"));
    let odds = session.request_odds("A", "B").expect("valid pair");
    assert_eq!(odds.draw, 2.35);

    let ticket = session
        .place_bet(Some(Outcome::Draw), "10")
        .expect("valid bet");
    let mut sim = one_all_sim();
    let report = session.play_round(&mut sim, &ticket).expect("round");

    assert_eq!(report.round, 1);
    assert_eq!((report.result.home_goals, report.result.away_goals), (1, 1));
    assert_eq!(report.result.outcome, Outcome::Draw);
    assert!(report.settlement.won);
    assert_eq!(report.settlement.payout, 23.5);
    assert_eq!(session.balance(), 10_023.5);

    let a = session.book().get("A").expect("A exists");
    assert_eq!((a.draws, a.goals_scored, a.goals_conceded), (1, 1, 1));
    let b = session.book().get("B").expect("B exists");
    assert_eq!((b.draws, b.goals_scored, b.goals_conceded), (1, 1, 1));

    assert_eq!(session.store().load_balance(), 10_023.5);
    assert_eq!(session.store().load_teams(), *session.book());

    let totals = session.ledger().expect("ledger").totals().expect("totals");
    assert_eq!(totals.rounds, 1);
    assert_eq!(totals.wins, 1);
}

#[test]
fn ticket_plays_its_own_pair_after_a_requote() {
    let mut book = two_team_book();
    book.insert("C", TeamRecord::with_rating(2000.0));
    book.insert("D", TeamRecord::with_rating(100.0));
    let mut session = Session::open(MemoryStore::with_state(book.clone(), 10_000.0));

    session.request_odds("A", "B").expect("valid pair");
    let ticket = session
        .place_bet(Some(Outcome::Draw), "10")
        .expect("valid bet");
    let requoted = session.request_odds("C", "D").expect("valid pair");
    assert_ne!(requoted, ticket.quote.odds);

    let report = session
        .play_round(&mut one_all_sim(), &ticket)
        .expect("round");
    assert_eq!(
        (report.result.home.as_str(), report.result.away.as_str()),
        ("A", "B")
    );
    assert_eq!(report.settlement.odd, 2.35);
    assert_eq!(report.settlement.payout, 23.5);
    assert_eq!(session.balance(), 10_023.5);
    assert_eq!(session.book().get("C"), book.get("C"));
    assert_eq!(session.book().get("D"), book.get("D"));

    let locked = session.locked_quote().expect("quote stays locked");
    assert_eq!((locked.home.as_str(), locked.away.as_str()), ("C", "D"));
}

#[test]
fn replay_for_another_pair_is_not_settled() {
    let mut book = two_team_book();
    book.insert("C", TeamRecord::with_rating(1000.0));
    let mut session = Session::open(MemoryStore::with_state(book.clone(), 10_000.0));
    session.request_odds("A", "B").expect("valid pair");
    let ticket = session
        .place_bet(Some(Outcome::Draw), "10")
        .expect("valid bet");

    let replay = one_all_sim()
        .kick_off(session.book(), "A", "C")
        .expect("valid pair");
    let err = session.settle_round(replay, &ticket).unwrap_err();
    assert_eq!(
        err,
        SimError::FixtureMismatch {
            home: "A".to_string(),
            away: "B".to_string()
        }
    );
    assert_eq!(session.balance(), 10_000.0);
    assert_eq!(*session.book(), book);
}

#[test]
fn explicit_zero_rating_is_quoted_as_zero() {
    let mut book = two_team_book();
    book.insert("Zero", TeamRecord::with_rating(0.0));
    let mut session = Session::open(MemoryStore::with_state(book, 10_000.0));
    let odds = session.request_odds("Zero", "A").expect("valid pair");
    assert_eq!(odds, calc_odds(0.0, 1000.0));
    assert_eq!(
        odds,
        OddsQuote {
            home: 132.0,
            draw: 78.31,
            away: 1.13
        }
    );

    let unrated = session.request_odds("A", "B").expect("valid pair");
    assert_eq!(unrated.draw, 2.35);
}

#[test]
fn losing_pick_debits_the_stake() {
    let mut session = session_with(100.0);
    session.request_odds("A", "B").expect("valid pair");
    let ticket = session
        .place_bet(Some(Outcome::Home), "12,5")
        .expect("comma stake");
    let report = session
        .play_round(&mut one_all_sim(), &ticket)
        .expect("round");
    assert!(!report.settlement.won);
    assert_eq!(report.settlement.payout, 0.0);
    assert_eq!(session.balance(), 87.5);
}

#[test]
fn stake_below_minimum_changes_nothing() {
    let mut session = session_with(10_000.0);
    session.request_odds("A", "B").expect("valid pair");
    let err = session.place_bet(Some(Outcome::Draw), "0.4").unwrap_err();
    assert_eq!(err, SimError::InvalidStake(StakeIssue::BelowMinimum));
    assert_eq!(session.balance(), 10_000.0);
    assert_eq!(*session.book(), two_team_book());
}

#[test]
fn same_team_is_rejected_before_quoting() {
    let mut book = TeamBook::new();
    book.insert("TeamX", TeamRecord::with_rating(900.0));
    let mut session = Session::open(MemoryStore::with_state(book, 10_000.0));
    let err = session.request_odds("TeamX", "TeamX").unwrap_err();
    assert_eq!(err, SimError::SameTeam("TeamX".to_string()));
    assert!(session.locked_quote().is_none());
}

#[test]
fn unknown_team_is_reported() {
    let mut session = session_with(10_000.0);
    let err = session.request_odds("A", "Nobody").unwrap_err();
    assert_eq!(err, SimError::UnknownTeam("Nobody".to_string()));
}

#[test]
fn bet_needs_quote_and_pick_and_funds() {
    let mut session = session_with(5.0);
    assert_eq!(
        session.place_bet(Some(Outcome::Home), "1").unwrap_err(),
        SimError::NoQuote
    );
    session.request_odds("A", "B").expect("valid pair");
    assert_eq!(session.place_bet(None, "1").unwrap_err(), SimError::NoPick);
    assert_eq!(
        session.place_bet(Some(Outcome::Home), "abc").unwrap_err(),
        SimError::InvalidStake(StakeIssue::NotANumber)
    );
    assert_eq!(
        session.place_bet(Some(Outcome::Home), "20001").unwrap_err(),
        SimError::InvalidStake(StakeIssue::AboveMaximum)
    );
    assert_eq!(
        session.place_bet(Some(Outcome::Home), "6").unwrap_err(),
        SimError::InsufficientFunds {
            stake: 6.0,
            balance: 5.0
        }
    );
}

#[test]
fn empty_store_is_seeded_with_default_roster() {
    let session = Session::open(MemoryStore::new());
    assert_eq!(session.book().len(), 61);
    assert_eq!(session.balance(), 10_000.0);
    assert_eq!(session.store().load_teams().len(), 61);
}

#[test]
fn cancelled_run_leaves_state_untouched() {
    let mut session = session_with(10_000.0);
    session.request_odds("A", "B").expect("valid pair");
    let ticket = session
        .place_bet(Some(Outcome::Draw), "10")
        .expect("valid bet");
    let cancel = AtomicBool::new(true);
    let mut minutes = 0;
    let run = session.play_rounds(
        &mut one_all_sim(),
        &ticket,
        3,
        Duration::ZERO,
        &cancel,
        |_, _| minutes += 1,
    );
    assert_eq!(run.stopped, Some(SimError::ReplayCancelled));
    assert!(run.rounds.is_empty());
    assert_eq!(minutes, 0);
    assert_eq!(session.balance(), 10_000.0);
    assert_eq!(*session.book(), two_team_book());
}

#[test]
fn run_stops_when_funds_run_out() {
    let mut session = session_with(15.0);
    session.request_odds("A", "B").expect("valid pair");
    let ticket = session
        .place_bet(Some(Outcome::Home), "10")
        .expect("valid bet");
    let cancel = AtomicBool::new(false);
    let mut goal_lines = 0;
    let run = session.play_rounds(
        &mut one_all_sim(),
        &ticket,
        3,
        Duration::ZERO,
        &cancel,
        |_, lines| goal_lines += lines.iter().filter(|l| l.contains("Goal!")).count(),
    );
    assert_eq!(run.rounds.len(), 1);
    assert_eq!(goal_lines, 2);
    assert_eq!(
        run.stopped,
        Some(SimError::InsufficientFunds {
            stake: 10.0,
            balance: 5.0
        })
    );
    assert_eq!(session.balance(), 5.0);
}

#[test]
fn multi_round_run_books_every_round() {
    let mut session = session_with(10_000.0);
    session.request_odds("A", "B").expect("valid pair");
    let ticket = session
        .place_bet(Some(Outcome::Away), "1")
        .expect("valid bet");
    let cancel = AtomicBool::new(false);
    let mut sim = MatchSimulator::new(RngSource::seeded(8));
    let run = session.play_rounds(&mut sim, &ticket, 4, Duration::ZERO, &cancel, |_, _| {});
    assert!(run.stopped.is_none());
    assert_eq!(run.rounds.len(), 4);
    assert_eq!(run.rounds.last().map(|r| r.round), Some(4));
    let a = session.book().get("A").expect("A exists");
    assert_eq!(a.matches_played(), 4);
    let last = run.rounds.last().expect("rounds");
    assert_eq!(session.balance(), last.settlement.balance_after);
}
