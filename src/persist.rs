use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::settlement::DEFAULT_BALANCE;
use crate::team::{TeamBook, TeamRecord};

const APP_DIR: &str = "matchbet_terminal";
const STATE_FILE: &str = "state.json";

/// Where team records and the balance live between sessions. Loads never
/// fail: a missing or unreadable store reads as an empty book and the
/// default balance.
pub trait Store {
    fn load_teams(&self) -> TeamBook;
    fn save_teams(&self, teams: &TeamBook) -> Result<()>;
    fn load_balance(&self) -> f64;
    fn save_balance(&self, balance: f64) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedRecord {
    name: String,
    #[serde(flatten)]
    record: TeamRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StateFile {
    #[serde(rename = "sim_teams_v1", default)]
    teams: Option<Vec<NamedRecord>>,
    #[serde(rename = "sim_balance_v1", default)]
    balance: Option<f64>,
}

/// One JSON document on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `state.json` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Option<StateFile> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<StateFile>(&raw) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ignoring unreadable state file");
                None
            }
        }
    }

    fn update(&self, edit: impl FnOnce(&mut StateFile)) -> Result<()> {
        let mut state = self.read().unwrap_or_default();
        edit(&mut state);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create data dir {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&state).context("serialize state")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write state")?;
        fs::rename(&tmp, &self.path).context("swap state")?;
        Ok(())
    }
}

impl Store for JsonStore {
    fn load_teams(&self) -> TeamBook {
        self.read()
            .and_then(|s| s.teams)
            .map(|teams| teams.into_iter().map(|t| (t.name, t.record)).collect())
            .unwrap_or_default()
    }

    fn save_teams(&self, teams: &TeamBook) -> Result<()> {
        let rows = teams
            .iter()
            .map(|(name, record)| NamedRecord {
                name: name.to_string(),
                record: record.clone(),
            })
            .collect();
        self.update(|s| s.teams = Some(rows))
    }

    fn load_balance(&self) -> f64 {
        self.read()
            .and_then(|s| s.balance)
            .filter(|b| b.is_finite())
            .unwrap_or(DEFAULT_BALANCE)
    }

    fn save_balance(&self, balance: f64) -> Result<()> {
        self.update(|s| s.balance = Some(balance))
    }
}

/// In-process store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    teams: RefCell<Option<TeamBook>>,
    balance: RefCell<Option<f64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(teams: TeamBook, balance: f64) -> Self {
        Self {
            teams: RefCell::new(Some(teams)),
            balance: RefCell::new(Some(balance)),
        }
    }
}

impl Store for MemoryStore {
    fn load_teams(&self) -> TeamBook {
        self.teams.borrow().clone().unwrap_or_default()
    }

    fn save_teams(&self, teams: &TeamBook) -> Result<()> {
        *self.teams.borrow_mut() = Some(teams.clone());
        Ok(())
    }

    fn load_balance(&self) -> f64 {
        self.balance.borrow().unwrap_or(DEFAULT_BALANCE)
    }

    fn save_balance(&self, balance: f64) -> Result<()> {
        *self.balance.borrow_mut() = Some(balance);
        Ok(())
    }
}

/// Per-user data directory: `$XDG_DATA_HOME/matchbet_terminal`, else
/// `~/.local/share/matchbet_terminal`.
pub fn app_data_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_DATA_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR),
    )
}
