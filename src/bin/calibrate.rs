use anyhow::{Context, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use matchbet_terminal::calibration::calibrate;
use matchbet_terminal::outcome::Outcome;
use matchbet_terminal::roster::default_roster;
use matchbet_terminal::team::{TeamBook, TeamRecord};

const DEFAULT_SAMPLES: usize = 100_000;
const DEFAULT_SEED: u64 = 7;

/// Usage: calibrate <home> <away> [samples] [seed]
///
/// A team is a name from the built-in roster, its 1-based index in that
/// roster, or a bare rating prefixed with `@` (e.g. `@1200`).
fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: calibrate <home> <away> [samples] [seed]");
    }
    let samples = match args.get(2) {
        Some(raw) => raw.parse::<usize>().context("samples must be a number")?,
        None => DEFAULT_SAMPLES,
    };
    let seed = match args.get(3) {
        Some(raw) => raw.parse::<u64>().context("seed must be a number")?,
        None => DEFAULT_SEED,
    };

    let roster = default_roster();
    let (home_name, home) = resolve_team(&roster, &args[0])?;
    let (away_name, away) = resolve_team(&roster, &args[1])?;
    info!(%home_name, %away_name, samples, seed, "calibrating");

    let report = calibrate(&home, &away, samples, seed);
    println!(
        "{home_name} ({:.0}) vs {away_name} ({:.0})",
        home.quote_rating(),
        away.quote_rating()
    );
    println!(
        "Quote:      1 {:.2}  X {:.2}  2 {:.2}  (overround {:.3})",
        report.quote.home, report.quote.draw, report.quote.away, report.overround
    );
    println!(
        "Implied:    1 {:.1}%  X {:.1}%  2 {:.1}%",
        report.implied.home * 100.0,
        report.implied.draw * 100.0,
        report.implied.away * 100.0
    );
    let sim = &report.simulated;
    println!(
        "Simulated:  1 {:.1}%  X {:.1}%  2 {:.1}%  over {} matches",
        sim.probs.home * 100.0,
        sim.probs.draw * 100.0,
        sim.probs.away * 100.0,
        sim.samples
    );
    println!(
        "Mean goals: {:.2} - {:.2}",
        sim.mean_home_goals, sim.mean_away_goals
    );
    for outcome in Outcome::ALL {
        println!(
            "Return on {}: {:+.1}%",
            outcome.code(),
            (report.expected_return(outcome) - 1.0) * 100.0
        );
    }
    Ok(())
}

fn resolve_team(roster: &TeamBook, arg: &str) -> anyhow::Result<(String, TeamRecord)> {
    if let Some(raw) = arg.strip_prefix('@') {
        let rating: f64 = raw.parse().context("rating must be a number")?;
        return Ok((format!("rating {rating:.0}"), TeamRecord::with_rating(rating)));
    }
    let by_index = arg
        .parse::<usize>()
        .ok()
        .and_then(|idx| idx.checked_sub(1))
        .and_then(|i| roster.names().get(i))
        .and_then(|name| roster.get(name).map(|record| (name.clone(), record.clone())));
    if let Some(found) = by_index {
        return Ok(found);
    }
    let record = roster
        .get(arg)
        .with_context(|| format!("unknown team: {arg}"))?;
    Ok((arg.to_string(), record.clone()))
}
