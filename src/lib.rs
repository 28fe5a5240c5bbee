pub mod calibration;
pub mod config;
pub mod error;
pub mod history;
pub mod outcome;
pub mod persist;
pub mod random;
pub mod rating;
pub mod roster;
pub mod schedule;
pub mod session;
pub mod settlement;
pub mod simulator;
pub mod state;
pub mod team;
