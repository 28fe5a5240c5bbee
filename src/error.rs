use thiserror::Error;

/// Why a stake was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StakeIssue {
    #[error("Enter bet, min - 0.5 €")]
    NotANumber,
    #[error("Enter bet, min - 0.5 €")]
    BelowMinimum,
    #[error("Maximal bet is 10000 €")]
    AboveMaximum,
}

/// Recoverable validation failures. None of them leave team records or the
/// balance half-updated: every check runs before any mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("Team does not exist: {0}")]
    UnknownTeam(String),
    #[error("Pick two different teams ({0} twice)")]
    SameTeam(String),
    #[error("{0}")]
    InvalidStake(StakeIssue),
    #[error("Insufficient funds: stake {stake:.2} € exceeds balance {balance:.2} €")]
    InsufficientFunds { stake: f64, balance: f64 },
    #[error("Compute the odds before placing a bet")]
    NoQuote,
    #[error("Click on an odd first")]
    NoPick,
    #[error("Bet was placed on {home} - {away}, not on this match")]
    FixtureMismatch { home: String, away: String },
    #[error("Replay cancelled")]
    ReplayCancelled,
}
