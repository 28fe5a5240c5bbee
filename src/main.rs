use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Row, Table};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use matchbet_terminal::config::SimConfig;
use matchbet_terminal::history::{LEDGER_FILE, Ledger};
use matchbet_terminal::outcome::Outcome;
use matchbet_terminal::persist::JsonStore;
use matchbet_terminal::random::RngSource;
use matchbet_terminal::schedule::minute_label;
use matchbet_terminal::session::{Session, describe_tick};
use matchbet_terminal::settlement::BetTicket;
use matchbet_terminal::simulator::{MatchSimulator, MatchStatistics, Replay};
use matchbet_terminal::state::{AppState, Delta, Focus, Phase, apply_delta};

const LOG_FILE: &str = "matchbet.log";

struct ActiveRun {
    ticket: BetTicket,
    replay: Replay,
    round: u32,
    of: u32,
    last_minute: Instant,
}

struct App {
    state: AppState,
    session: Session<JsonStore>,
    sim: MatchSimulator<RngSource>,
    run: Option<ActiveRun>,
    should_quit: bool,
}

impl App {
    fn new(config: &SimConfig, session: Session<JsonStore>) -> Self {
        let mut state = AppState::new(config);
        apply_delta(
            &mut state,
            Delta::SetTeams(session.book().names().to_vec()),
        );
        apply_delta(&mut state, Delta::SetBalance(session.balance()));
        apply_delta(
            &mut state,
            Delta::Log(format!(
                "[INFO] Loaded {} teams, balance {:.2} €",
                session.book().len(),
                session.balance()
            )),
        );
        if let Some(ledger) = session.ledger() {
            match ledger.totals() {
                Ok(totals) if totals.rounds > 0 => apply_delta(
                    &mut state,
                    Delta::Log(format!(
                        "[INFO] Ledger: {} rounds, {} won, {:.2} € staked",
                        totals.rounds, totals.wins, totals.staked
                    )),
                ),
                Ok(_) => {}
                Err(err) => warn!(%err, "could not read ledger totals"),
            }
        }
        Self {
            state,
            session,
            sim: MatchSimulator::new(RngSource::from_seed_opt(config.seed)),
            run: None,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.cancel_run(),
            KeyCode::Char('<') => self.state.adjust_speed(false),
            KeyCode::Char('>') => self.state.adjust_speed(true),
            _ if self.state.is_playing() => {}
            KeyCode::Tab | KeyCode::BackTab => self.state.toggle_focus(),
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.select_next();
                self.session.clear_quote();
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.select_prev();
                self.session.clear_quote();
            }
            KeyCode::Char('o') => self.request_odds(),
            KeyCode::Char('h') => apply_delta(&mut self.state, Delta::Pick(Outcome::Home)),
            KeyCode::Char('d') | KeyCode::Char('x') => {
                apply_delta(&mut self.state, Delta::Pick(Outcome::Draw))
            }
            KeyCode::Char('a') => apply_delta(&mut self.state, Delta::Pick(Outcome::Away)),
            KeyCode::Char('+') => self.state.adjust_rounds(1),
            KeyCode::Char('-') => self.state.adjust_rounds(-1),
            KeyCode::Char('r') => {
                self.session.clear_quote();
                apply_delta(&mut self.state, Delta::Reset);
                self.log("[INFO] Selection reset");
            }
            KeyCode::Backspace => self.state.stake_backspace(),
            KeyCode::Char(ch) if ch.is_ascii_digit() || ch == '.' || ch == ',' => {
                self.state.stake_push(ch)
            }
            KeyCode::Enter => self.place_bet(),
            _ => {}
        }
    }

    fn log(&mut self, line: impl Into<String>) {
        apply_delta(&mut self.state, Delta::Log(line.into()));
    }

    fn request_odds(&mut self) {
        let (Some(home), Some(away)) = (
            self.state.home_team().map(str::to_string),
            self.state.away_team().map(str::to_string),
        ) else {
            self.log("[WARN] No teams loaded");
            return;
        };
        match self.session.request_odds(&home, &away) {
            Ok(_) => {
                if let Some(quote) = self.session.locked_quote().cloned() {
                    apply_delta(&mut self.state, Delta::QuoteLocked(quote));
                }
            }
            Err(err) => self.log(format!("[WARN] {err}")),
        }
    }

    fn place_bet(&mut self) {
        match self
            .session
            .place_bet(self.state.pick, &self.state.stake_input)
        {
            Ok(ticket) => {
                let of = self.state.rounds;
                self.start_round(ticket, 1, of);
            }
            Err(err) => self.log(format!("[WARN] {err}")),
        }
    }

    fn start_round(&mut self, ticket: BetTicket, round: u32, of: u32) {
        match self.session.kick_off(&mut self.sim, &ticket) {
            Ok(replay) => {
                info!(round, of, home = replay.home(), away = replay.away(), "kick-off");
                apply_delta(&mut self.state, Delta::RoundStarted { round, of });
                self.log(format!(
                    "[INFO] Round {round}/{of}: {} vs {}, {:.2} € on {}",
                    replay.home(),
                    replay.away(),
                    ticket.stake,
                    ticket.pick.code()
                ));
                self.run = Some(ActiveRun {
                    ticket,
                    replay,
                    round,
                    of,
                    last_minute: Instant::now(),
                });
            }
            Err(err) => {
                self.log(format!("[WARN] {err}"));
                apply_delta(&mut self.state, Delta::SessionFinished);
            }
        }
    }

    fn cancel_run(&mut self) {
        if let Some(run) = self.run.take() {
            info!(round = run.round, minute = run.replay.minute(), "round abandoned");
            self.log("[WARN] Round abandoned, nothing was booked");
            apply_delta(&mut self.state, Delta::SessionFinished);
        }
    }

    /// Reveals due minutes of the running round and settles it once the
    /// final whistle has been shown.
    fn advance(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let home = run.replay.home().to_string();
        let away = run.replay.away().to_string();
        let speed = Duration::from_millis(self.state.speed_ms);
        if speed.is_zero() {
            for tick in run.replay.by_ref() {
                let events = describe_tick(&tick, &home, &away);
                apply_delta(
                    &mut self.state,
                    Delta::Minute {
                        minute: tick.minute,
                        events,
                    },
                );
            }
        } else if run.last_minute.elapsed() >= speed {
            if let Some(tick) = run.replay.next() {
                let events = describe_tick(&tick, &home, &away);
                apply_delta(
                    &mut self.state,
                    Delta::Minute {
                        minute: tick.minute,
                        events,
                    },
                );
            }
            run.last_minute = Instant::now();
        }
        if !run.replay.is_finished() {
            return;
        }

        let Some(run) = self.run.take() else {
            return;
        };
        match self.session.settle_round(run.replay, &run.ticket) {
            Ok(report) => {
                apply_delta(&mut self.state, Delta::RoundSettled(Box::new(report)));
                apply_delta(&mut self.state, Delta::SetBalance(self.session.balance()));
                if run.round < run.of {
                    self.start_round(run.ticket, run.round + 1, run.of);
                } else {
                    apply_delta(&mut self.state, Delta::SessionFinished);
                }
            }
            Err(err) => {
                self.log(format!("[WARN] {err}"));
                apply_delta(&mut self.state, Delta::SessionFinished);
            }
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = SimConfig::from_env();
    let data_dir = config
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    init_tracing(&data_dir);

    let mut session = Session::open(JsonStore::in_dir(&data_dir));
    if config.ledger {
        match Ledger::open(&data_dir.join(LEDGER_FILE)) {
            Ok(ledger) => session = session.with_ledger(ledger),
            Err(err) => warn!(%err, "ledger disabled"),
        }
    }
    let mut app = App::new(&config, session);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_tracing(dir: &Path) {
    if fs::create_dir_all(dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
    else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        app.advance();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_body(frame, chunks[1], &app.state);

    let footer = Paragraph::new(footer_text(&app.state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let phase = match state.phase {
        Phase::Setup => "SETUP".to_string(),
        Phase::Playing { round, of } => {
            format!("ROUND {round}/{of} | {}", minute_label(state.minute.max(1)))
        }
    };
    format!(
        "MATCHBET | {phase} | Balance: {:.2} € | Speed: {} ms/min",
        state.balance, state.speed_ms
    )
}

fn footer_text(state: &AppState) -> String {
    if state.is_playing() {
        "Esc Abandon round | </> Speed | ? Help | q Quit".to_string()
    } else {
        "Tab Home/Away | j/k Team | o Odds | h/d/a Pick | 0-9 Stake | +/- Rounds | Enter Bet | r Reset | ? Help | q Quit".to_string()
    }
}

fn render_body(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(26),
            Constraint::Min(40),
            Constraint::Percentage(40),
        ])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);
    render_team_list(frame, left[0], state, Focus::Home);
    render_team_list(frame, left[1], state, Focus::Away);

    let middle = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(1)])
        .split(columns[1]);
    let bet = Paragraph::new(bet_panel_lines(state))
        .block(Block::default().title("Bet").borders(Borders::ALL));
    frame.render_widget(bet, middle[0]);
    render_stats(frame, middle[1], state);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(8)])
        .split(columns[2]);
    let plays = Paragraph::new(play_text(state, right[0].height.saturating_sub(2) as usize))
        .block(Block::default().title("Match").borders(Borders::ALL));
    frame.render_widget(plays, right[0]);
    let console = Paragraph::new(console_text(state, right[1].height.saturating_sub(2) as usize))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, right[1]);
}

fn render_team_list(frame: &mut Frame, area: Rect, state: &AppState, side: Focus) {
    let (title, selected) = match side {
        Focus::Home => ("Home", state.home_idx),
        Focus::Away => ("Away", state.away_idx),
    };
    let border_style = if state.focus == side && !state.is_playing() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let visible = area.height.saturating_sub(2) as usize;
    let (start, end) = visible_range(selected, state.teams.len(), visible);
    let lines: Vec<Line> = (start..end)
        .map(|idx| {
            let name = state.teams[idx].as_str();
            if idx == selected {
                Line::from(Span::styled(
                    format!("> {name}"),
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!("  {name}"))
            }
        })
        .collect();
    let list = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(list, area);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn bet_panel_lines(state: &AppState) -> Vec<Line<'static>> {
    let home = state.home_team().unwrap_or("-").to_string();
    let away = state.away_team().unwrap_or("-").to_string();
    let mut lines = vec![Line::from(format!("{home} vs {away}"))];

    match &state.quote {
        Some(q) => lines.push(Line::from(format!(
            "Odds  1 {:.2}   X {:.2}   2 {:.2}",
            q.odds.home, q.odds.draw, q.odds.away
        ))),
        None => lines.push(Line::from(Span::styled(
            "Odds  press o",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    let mut picks = vec![Span::raw("Pick  ")];
    for outcome in Outcome::ALL {
        let label = format!("[{}] {}  ", outcome.code(), state.pick_label(outcome));
        let style = if state.pick == Some(outcome) {
            Style::default().fg(Color::Black).bg(Color::Green)
        } else {
            Style::default()
        };
        picks.push(Span::styled(label, style));
    }
    lines.push(Line::from(picks));
    lines.push(Line::from(format!("Stake {} €", state.stake_input)));
    lines.push(Line::from(format!(
        "Rounds {}   Speed {} ms/min",
        state.rounds, state.speed_ms
    )));
    lines
}

fn render_stats(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(report) = &state.last_round else {
        let empty = Paragraph::new("No match played yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Statistics").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };
    let result = &report.result;
    let header = Row::new(vec![
        result.home.clone(),
        String::new(),
        result.away.clone(),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = stat_rows(&result.home_stats, &result.away_stats)
        .into_iter()
        .map(|(label, home, away)| Row::new(vec![home, label.to_string(), away]))
        .collect();
    let title = format!(
        "Statistics | {} | FT {}",
        result.scoreline(),
        minute_label(result.total_minutes())
    );
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(35),
            Constraint::Percentage(30),
            Constraint::Percentage(35),
        ],
    )
    .header(header)
    .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn stat_rows(home: &MatchStatistics, away: &MatchStatistics) -> Vec<(&'static str, String, String)> {
    vec![
        ("Goals", home.goals.to_string(), away.goals.to_string()),
        ("Shots", home.shots.to_string(), away.shots.to_string()),
        (
            "On target",
            home.shots_on_target.to_string(),
            away.shots_on_target.to_string(),
        ),
        (
            "Possession",
            format!("{}%", home.possession),
            format!("{}%", away.possession),
        ),
        ("Corners", home.corners.to_string(), away.corners.to_string()),
        ("Offsides", home.offsides.to_string(), away.offsides.to_string()),
        ("Fouls", home.fouls.to_string(), away.fouls.to_string()),
        (
            "Yellow cards",
            home.yellow_cards.to_string(),
            away.yellow_cards.to_string(),
        ),
        (
            "Red cards",
            home.red_cards.to_string(),
            away.red_cards.to_string(),
        ),
    ]
}

fn play_text(state: &AppState, height: usize) -> String {
    if state.play_lines.is_empty() {
        return if state.is_playing() {
            "Kick-off".to_string()
        } else {
            "Place a bet to start a match".to_string()
        };
    }
    tail(state.play_lines.iter(), state.play_lines.len(), height)
}

fn console_text(state: &AppState, height: usize) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    tail(state.logs.iter(), state.logs.len(), height)
}

fn tail<'a>(lines: impl Iterator<Item = &'a String>, len: usize, height: usize) -> String {
    lines
        .skip(len.saturating_sub(height.max(1)))
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Matchbet - Help",
        "",
        "Setup:",
        "  Tab          Switch home/away list",
        "  j/k or ↑/↓   Choose team",
        "  o            Compute odds",
        "  h / d / a    Pick home, draw or away",
        "  0-9 . ,      Edit stake, Backspace deletes",
        "  + / -        Rounds (1-20)",
        "  Enter        Place bet and kick off",
        "  r            Reset selection",
        "",
        "Any time:",
        "  < / >        Slower / faster replay",
        "  Esc          Abandon the running round",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
