use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::persist::app_data_dir;

pub const MAX_ROUNDS: u32 = 20;
pub const MAX_SPEED_MS: u64 = 2000;

/// Runtime knobs, read from the environment (after `.env` files are loaded
/// by the binary).
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Delay between replayed minutes; zero plays the match instantly.
    pub speed: Duration,
    pub rounds: u32,
    pub default_stake: String,
    pub seed: Option<u64>,
    pub data_dir: Option<PathBuf>,
    pub ledger: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            speed: Duration::ZERO,
            rounds: 1,
            default_stake: "10".to_string(),
            seed: None,
            data_dir: app_data_dir(),
            ledger: true,
        }
    }
}

impl SimConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let speed_ms = env::var("MATCHBET_SPEED_MS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(0)
            .min(MAX_SPEED_MS);
        let rounds = env::var("MATCHBET_ROUNDS")
            .ok()
            .and_then(|val| val.trim().parse::<u32>().ok())
            .map(clamp_rounds)
            .unwrap_or(defaults.rounds);
        let default_stake = opt_env("MATCHBET_STAKE").unwrap_or(defaults.default_stake);
        let seed = opt_env("MATCHBET_SEED").and_then(|val| val.trim().parse::<u64>().ok());
        let data_dir = opt_env("MATCHBET_DATA_DIR")
            .map(PathBuf::from)
            .or(defaults.data_dir);
        let ledger = opt_env("MATCHBET_LEDGER")
            .map(|val| !matches!(val.trim(), "0" | "false" | "off"))
            .unwrap_or(true);

        Self {
            speed: Duration::from_millis(speed_ms),
            rounds,
            default_stake,
            seed,
            data_dir,
            ledger,
        }
    }
}

pub fn clamp_rounds(rounds: u32) -> u32 {
    rounds.clamp(1, MAX_ROUNDS)
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}
