use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::settlement::Settlement;
use crate::simulator::MatchResult;

/// One settled round as stored in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRound {
    pub id: i64,
    pub home: String,
    pub away: String,
    pub home_goals: u32,
    pub away_goals: u32,
    pub outcome: String,
    pub pick: String,
    pub stake: f64,
    pub odd: f64,
    pub payout: f64,
    pub balance_after: f64,
    pub stoppage: u32,
    pub settled_at: String,
}

impl StoredRound {
    pub fn won(&self) -> bool {
        self.pick == self.outcome
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerTotals {
    pub rounds: u64,
    pub wins: u64,
    pub staked: f64,
    pub paid_out: f64,
}

pub const LEDGER_FILE: &str = "rounds.sqlite";

/// Append-only record of settled rounds.
#[derive(Debug)]
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create ledger dir {}", parent.display()))?;
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn record(&self, result: &MatchResult, settlement: &Settlement) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO rounds (
                    home, away, home_goals, away_goals, outcome, pick,
                    stake, odd, payout, balance_after, stoppage, settled_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
                params![
                    result.home,
                    result.away,
                    result.home_goals as i64,
                    result.away_goals as i64,
                    settlement.outcome.code(),
                    settlement.pick.code(),
                    settlement.stake,
                    settlement.odd,
                    settlement.payout,
                    settlement.balance_after,
                    result.stoppage as i64,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("insert round")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Newest first.
    pub fn recent_rounds(&self, limit: usize) -> Result<Vec<StoredRound>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, home, away, home_goals, away_goals, outcome, pick,
                       stake, odd, payout, balance_after, stoppage, settled_at
                FROM rounds
                ORDER BY id DESC
                LIMIT ?1
                "#,
            )
            .context("prepare recent rounds")?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(StoredRound {
                    id: row.get(0)?,
                    home: row.get(1)?,
                    away: row.get(2)?,
                    home_goals: row.get::<_, u32>(3)?,
                    away_goals: row.get::<_, u32>(4)?,
                    outcome: row.get(5)?,
                    pick: row.get(6)?,
                    stake: row.get(7)?,
                    odd: row.get(8)?,
                    payout: row.get(9)?,
                    balance_after: row.get(10)?,
                    stoppage: row.get::<_, u32>(11)?,
                    settled_at: row.get(12)?,
                })
            })
            .context("query recent rounds")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode round row")?);
        }
        Ok(out)
    }

    pub fn totals(&self) -> Result<LedgerTotals> {
        self.conn
            .query_row(
                r#"
                SELECT COUNT(*),
                       COALESCE(SUM(CASE WHEN pick = outcome THEN 1 ELSE 0 END), 0),
                       COALESCE(SUM(stake), 0.0),
                       COALESCE(SUM(payout), 0.0)
                FROM rounds
                "#,
                [],
                |row| {
                    Ok(LedgerTotals {
                        rounds: row.get::<_, i64>(0)? as u64,
                        wins: row.get::<_, i64>(1)? as u64,
                        staked: row.get(2)?,
                        paid_out: row.get(3)?,
                    })
                },
            )
            .context("query ledger totals")
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS rounds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            home TEXT NOT NULL,
            away TEXT NOT NULL,
            home_goals INTEGER NOT NULL,
            away_goals INTEGER NOT NULL,
            outcome TEXT NOT NULL,
            pick TEXT NOT NULL,
            stake REAL NOT NULL,
            odd REAL NOT NULL,
            payout REAL NOT NULL,
            balance_after REAL NOT NULL,
            stoppage INTEGER NOT NULL,
            settled_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_rounds_settled_at ON rounds(settled_at);
        "#,
    )
    .context("init ledger schema")?;
    Ok(())
}
