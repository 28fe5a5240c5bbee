use std::fs;

use matchbet_terminal::history::Ledger;
use matchbet_terminal::outcome::Outcome;
use matchbet_terminal::persist::{JsonStore, Store};
use matchbet_terminal::random::ScriptedSource;
use matchbet_terminal::rating::calc_odds;
use matchbet_terminal::roster::{default_roster, parse_roster, render_roster};
use matchbet_terminal::settlement::{BetTicket, DEFAULT_BALANCE, LockedQuote, settle};
use matchbet_terminal::simulator::MatchSimulator;
use matchbet_terminal::team::{TeamBook, TeamRecord};

#[test]
fn missing_state_file_reads_as_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonStore::in_dir(dir.path());
    assert!(store.load_teams().is_empty());
    assert_eq!(store.load_balance(), DEFAULT_BALANCE);
}

#[test]
fn corrupt_state_file_reads_as_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonStore::in_dir(dir.path());
    fs::write(store.path(), "{ not json").expect("write");
    assert!(store.load_teams().is_empty());
    assert_eq!(store.load_balance(), DEFAULT_BALANCE);

    // The next save replaces the broken file.
    store.save_balance(42.5).expect("save");
    assert_eq!(store.load_balance(), 42.5);
}

#[test]
fn teams_and_balance_survive_a_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut book = TeamBook::new();
    let mut rec = TeamRecord::with_rating(870.0);
    rec.wins = 3;
    rec.extra.insert("points".to_string(), 9);
    book.insert("Zeta", rec);
    book.insert("Alpha", TeamRecord::default());

    {
        let store = JsonStore::in_dir(dir.path());
        store.save_teams(&book).expect("save teams");
        store.save_balance(9_876.54).expect("save balance");
    }

    let store = JsonStore::in_dir(dir.path());
    let loaded = store.load_teams();
    assert_eq!(loaded, book);
    assert_eq!(loaded.names(), ["Zeta".to_string(), "Alpha".to_string()]);
    assert_eq!(store.load_balance(), 9_876.54);

    let raw = fs::read_to_string(store.path()).expect("read");
    assert!(raw.contains("sim_teams_v1"));
    assert!(raw.contains("sim_balance_v1"));
}

#[test]
fn ledger_keeps_rounds_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rounds.sqlite");

    let mut book = TeamBook::new();
    book.insert("A", TeamRecord::with_rating(1000.0));
    book.insert("B", TeamRecord::with_rating(1000.0));
    let mut sim = MatchSimulator::new(ScriptedSource::new([0.9, 0.5]));
    let result = sim.simulate(&mut book, "A", "B").expect("valid pair");
    let quote = LockedQuote {
        home: "A".to_string(),
        away: "B".to_string(),
        odds: calc_odds(1000.0, 1000.0),
    };
    let ticket = BetTicket::new(Outcome::Draw, 10.0, quote).expect("valid stake");
    let settlement = settle(&ticket, result.outcome, 100.0).expect("funds");

    {
        let ledger = Ledger::open(&path).expect("open ledger");
        ledger.record(&result, &settlement).expect("record");
        ledger.record(&result, &settlement).expect("record");
    }

    let ledger = Ledger::open(&path).expect("reopen ledger");
    let rounds = ledger.recent_rounds(10).expect("rounds");
    assert_eq!(rounds.len(), 2);
    assert!(rounds[0].id > rounds[1].id);
    let first = &rounds[0];
    assert_eq!((first.home.as_str(), first.away.as_str()), ("A", "B"));
    assert_eq!((first.home_goals, first.away_goals), (1, 1));
    assert_eq!(first.outcome, "X");
    assert!(first.won());
    assert_eq!(first.payout, 23.5);

    let totals = ledger.totals().expect("totals");
    assert_eq!(totals.rounds, 2);
    assert_eq!(totals.wins, 2);
    assert_eq!(totals.staked, 20.0);
    assert_eq!(totals.paid_out, 47.0);
}

#[test]
fn ledger_creates_missing_parent_dirs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("deeper").join("rounds.sqlite");
    let ledger = Ledger::open(&path).expect("open ledger");
    assert_eq!(ledger.totals().expect("totals").rounds, 0);
    assert!(path.exists());
}

#[test]
fn ledger_reports_an_unusable_parent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("taken");
    fs::write(&blocker, "a file, not a dir").expect("write");
    let err = Ledger::open(&blocker.join("rounds.sqlite")).unwrap_err();
    assert!(format!("{err:#}").contains("ledger dir"));
}

#[test]
fn default_roster_round_trips_through_text() {
    let book = default_roster();
    let again = parse_roster(&render_roster(&book));
    assert_eq!(again, book);
    assert_eq!(again.len(), 61);
}
