use std::collections::VecDeque;

use crate::config::{MAX_SPEED_MS, SimConfig, clamp_rounds};
use crate::outcome::Outcome;
use crate::schedule::minute_label;
use crate::session::{LockedQuote, RoundReport};
use crate::settlement::DEFAULT_BALANCE;

const MAX_LOGS: usize = 200;
const MAX_PLAY_LINES: usize = 200;
pub const SPEED_STEP_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Playing { round: u32, of: u32 },
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub teams: Vec<String>,
    pub home_idx: usize,
    pub away_idx: usize,
    pub focus: Focus,
    pub quote: Option<LockedQuote>,
    pub pick: Option<Outcome>,
    pub stake_input: String,
    pub default_stake: String,
    pub rounds: u32,
    pub speed_ms: u64,
    pub phase: Phase,
    /// Last replayed minute of the current round.
    pub minute: u32,
    pub play_lines: VecDeque<String>,
    pub last_round: Option<RoundReport>,
    pub balance: f64,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

/// Everything that can change the screen.
#[derive(Debug, Clone)]
pub enum Delta {
    SetTeams(Vec<String>),
    SetBalance(f64),
    QuoteLocked(LockedQuote),
    Pick(Outcome),
    RoundStarted { round: u32, of: u32 },
    Minute { minute: u32, events: Vec<String> },
    RoundSettled(Box<RoundReport>),
    SessionFinished,
    Log(String),
    Reset,
}

impl AppState {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            teams: Vec::new(),
            home_idx: 0,
            away_idx: 0,
            focus: Focus::Home,
            quote: None,
            pick: None,
            stake_input: config.default_stake.clone(),
            default_stake: config.default_stake.clone(),
            rounds: clamp_rounds(config.rounds),
            speed_ms: config.speed.as_millis().min(MAX_SPEED_MS as u128) as u64,
            phase: Phase::Setup,
            minute: 0,
            play_lines: VecDeque::new(),
            last_round: None,
            balance: DEFAULT_BALANCE,
            logs: VecDeque::new(),
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.phase, Phase::Playing { .. })
    }

    pub fn home_team(&self) -> Option<&str> {
        self.teams.get(self.home_idx).map(String::as_str)
    }

    pub fn away_team(&self) -> Option<&str> {
        self.teams.get(self.away_idx).map(String::as_str)
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Home => Focus::Away,
            Focus::Away => Focus::Home,
        };
    }

    pub fn select_next(&mut self) {
        self.move_selection(1);
    }

    pub fn select_prev(&mut self) {
        self.move_selection(-1);
    }

    fn move_selection(&mut self, step: isize) {
        if self.teams.is_empty() {
            return;
        }
        let len = self.teams.len() as isize;
        let idx = match self.focus {
            Focus::Home => &mut self.home_idx,
            Focus::Away => &mut self.away_idx,
        };
        *idx = ((*idx as isize + step).rem_euclid(len)) as usize;
        // A different pair invalidates the quoted odds.
        if self.quote.is_some() {
            self.quote = None;
            self.pick = None;
        }
    }

    pub fn stake_push(&mut self, ch: char) {
        if (ch.is_ascii_digit() || ch == '.' || ch == ',') && self.stake_input.len() < 12 {
            self.stake_input.push(ch);
        }
    }

    pub fn stake_backspace(&mut self) {
        self.stake_input.pop();
    }

    pub fn adjust_rounds(&mut self, delta: i32) {
        let next = (self.rounds as i32 + delta).max(1) as u32;
        self.rounds = clamp_rounds(next);
    }

    pub fn adjust_speed(&mut self, faster: bool) {
        self.speed_ms = if faster {
            self.speed_ms.saturating_sub(SPEED_STEP_MS)
        } else {
            (self.speed_ms + SPEED_STEP_MS).min(MAX_SPEED_MS)
        };
    }

    /// Label of a pick as shown on its button.
    pub fn pick_label(&self, outcome: Outcome) -> String {
        let Some(q) = &self.quote else {
            return match outcome {
                Outcome::Home => "Home".to_string(),
                Outcome::Draw => "Draw".to_string(),
                Outcome::Away => "Away".to_string(),
            };
        };
        match outcome {
            Outcome::Home => format!("{} ({:.2})", q.home, q.odds.home),
            Outcome::Draw => format!("Draw ({:.2})", q.odds.draw),
            Outcome::Away => format!("{} ({:.2})", q.away, q.odds.away),
        }
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetTeams(teams) => {
            let len = teams.len();
            state.teams = teams;
            state.home_idx = state.home_idx.min(len.saturating_sub(1));
            state.away_idx = if len > 1 {
                state.away_idx.max(1).min(len - 1)
            } else {
                0
            };
        }
        Delta::SetBalance(balance) => state.balance = balance,
        Delta::QuoteLocked(quote) => {
            state.push_log(format!(
                "[INFO] Odds {} - {}: 1 {:.2} | X {:.2} | 2 {:.2}",
                quote.home, quote.away, quote.odds.home, quote.odds.draw, quote.odds.away
            ));
            state.quote = Some(quote);
            state.pick = None;
        }
        Delta::Pick(outcome) => {
            if state.quote.is_some() {
                state.pick = Some(outcome);
            } else {
                state.push_log("[WARN] Compute the odds first (o)");
            }
        }
        Delta::RoundStarted { round, of } => {
            state.phase = Phase::Playing { round, of };
            state.minute = 0;
            state.play_lines.clear();
        }
        Delta::Minute { minute, events } => {
            state.minute = minute;
            if events.is_empty() {
                return;
            }
            let line = format!("{}  {}", minute_label(minute), events.join(" | "));
            state.play_lines.push_back(line);
            while state.play_lines.len() > MAX_PLAY_LINES {
                state.play_lines.pop_front();
            }
        }
        Delta::RoundSettled(report) => {
            let s = &report.settlement;
            let msg = if s.won {
                format!(
                    "[INFO] Good job! You won {:.2} € (balance: {:.2} €)",
                    s.payout, s.balance_after
                )
            } else {
                format!(
                    "[INFO] Unfortunately. You lost {:.2} € (balance: {:.2} €)",
                    s.stake, s.balance_after
                )
            };
            state.push_log(format!("[INFO] {}", report.result.scoreline()));
            state.push_log(msg);
            state.balance = s.balance_after;
            state.last_round = Some(*report);
        }
        Delta::SessionFinished => state.phase = Phase::Setup,
        Delta::Log(msg) => state.push_log(msg),
        Delta::Reset => {
            state.home_idx = 0;
            state.away_idx = if state.teams.len() > 1 { 1 } else { 0 };
            state.quote = None;
            state.pick = None;
            state.stake_input = state.default_stake.clone();
            state.play_lines.clear();
            state.last_round = None;
            state.minute = 0;
            state.phase = Phase::Setup;
        }
    }
}
