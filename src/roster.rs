//! Plain-text roster format: blocks separated by blank lines, one
//! `Key: Value` pair per line, `Team:` naming the block.

use once_cell::sync::Lazy;

use crate::team::{TeamBook, TeamRecord};

const DEFAULT_ROSTER_TEXT: &str = include_str!("../assets/default_roster.txt");

static DEFAULT_ROSTER: Lazy<TeamBook> = Lazy::new(|| parse_roster(DEFAULT_ROSTER_TEXT));

/// The bundled league table used to seed an empty store.
pub fn default_roster() -> TeamBook {
    DEFAULT_ROSTER.clone()
}

pub fn parse_roster(text: &str) -> TeamBook {
    let mut book = TeamBook::new();
    for block in split_blocks(text) {
        let mut name: Option<String> = None;
        let mut record = TeamRecord::default();
        for line in block.iter().copied() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key.eq_ignore_ascii_case("team") {
                name = Some(value.to_string());
            } else {
                apply_field(&mut record, key, value);
            }
        }
        // Blocks without a name are dropped.
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            book.insert(name, record);
        }
    }
    book
}

/// Inverse of `parse_roster`: known fields first, then any extra keys.
pub fn render_roster(book: &TeamBook) -> String {
    let blocks: Vec<String> = book
        .iter()
        .map(|(name, r)| {
            let mut out = format!("Team: {name}\n");
            if let Some(rating) = r.rating {
                out.push_str(&format!("rating: {}\n", format_rating(rating)));
            }
            for (key, value) in [
                ("goals_scored", r.goals_scored),
                ("goals_conceded", r.goals_conceded),
                ("yellow_cards", r.yellow_cards),
                ("red_cards", r.red_cards),
                ("wins", r.wins),
                ("draws", r.draws),
                ("losses", r.losses),
            ] {
                out.push_str(&format!("{key}: {value}\n"));
            }
            for (key, value) in &r.extra {
                out.push_str(&format!("{key}: {value}\n"));
            }
            out
        })
        .collect();
    blocks.join("\n")
}

fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn apply_field(record: &mut TeamRecord, key: &str, value: &str) {
    let lower = key.to_ascii_lowercase();
    if matches!(lower.as_str(), "rating" | "elo") {
        record.rating = parse_rating(value);
        return;
    }

    let number = parse_leading_int(value).unwrap_or(0);
    let counter = u32::try_from(number.max(0)).unwrap_or(u32::MAX);
    match lower.as_str() {
        "goals_scored" => record.goals_scored = counter,
        "goals_conceded" => record.goals_conceded = counter,
        "yellow" | "yellow_cards" => record.yellow_cards = counter,
        "red" | "red_cards" => record.red_cards = counter,
        "win" | "wins" => record.wins = counter,
        "draw" | "draws" => record.draws = counter,
        "loss" | "losses" => record.losses = counter,
        _ => {
            record.extra.insert(key.to_string(), number);
        }
    }
}

/// A rating key that is present always yields a number; text that does not
/// parse counts as an explicit zero.
fn parse_rating(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite())
        .or_else(|| parse_leading_int(value).map(|n| n as f64))
        .or(Some(0.0))
}

/// Optional sign followed by digits; trailing junk is ignored ("12abc" is 12).
fn parse_leading_int(value: &str) -> Option<i64> {
    let s = value.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{}", rating as i64)
    } else {
        format!("{rating}")
    }
}

#[cfg(test)]
mod tests {
    use super::{default_roster, parse_leading_int, parse_roster, render_roster};

    const SAMPLE: &str = "
Team: MŠK Žilina
elo: 999
goals_scored: 12
yellow: 73
red: 8
win: 5
draw: 1
loss: 0

Team: FK Poprad
rating: abc
goals_conceded: n/a
pressing: 4
";

    #[test]
    fn parses_blocks_and_legacy_keys() {
        let book = parse_roster(SAMPLE);
        assert_eq!(book.len(), 2);
        let z = book.get("MŠK Žilina").expect("first team");
        assert_eq!(z.rating, Some(999.0));
        assert_eq!(z.goals_scored, 12);
        assert_eq!((z.yellow_cards, z.red_cards), (73, 8));
        assert_eq!((z.wins, z.draws, z.losses), (5, 1, 0));
    }

    #[test]
    fn bad_values_default_and_unknown_keys_are_kept() {
        let book = parse_roster(SAMPLE);
        let p = book.get("FK Poprad").expect("second team");
        assert_eq!(p.rating, Some(0.0));
        assert_eq!(p.rating(), 1000.0);
        assert_eq!(p.quote_rating(), 0.0);
        assert_eq!(p.goals_conceded, 0);
        assert_eq!(p.extra.get("pressing"), Some(&4));
    }

    #[test]
    fn absent_rating_stays_unset() {
        let book = parse_roster("Team: Quiet\nwins: 1\n\nTeam: Loud\nelo: n/a\n");
        assert_eq!(book.get("Quiet").and_then(|r| r.rating), None);
        assert_eq!(book.get("Loud").and_then(|r| r.rating), Some(0.0));
        assert_eq!(book.get("Quiet").map(|r| r.quote_rating()), Some(1000.0));
    }

    #[test]
    fn unnamed_block_is_skipped() {
        let book = parse_roster("elo: 10\nwins: 2\n\nTeam: Solo\n");
        assert_eq!(book.names(), ["Solo".to_string()]);
    }

    #[test]
    fn render_then_parse_preserves_book() {
        let book = parse_roster(SAMPLE);
        let again = parse_roster(&render_roster(&book));
        assert_eq!(again, book);
    }

    #[test]
    fn leading_int_matches_lenient_parsing() {
        assert_eq!(parse_leading_int("12 "), Some(12));
        assert_eq!(parse_leading_int("12abc"), Some(12));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
    }

    #[test]
    fn default_roster_is_seeded() {
        let book = default_roster();
        assert_eq!(book.len(), 61);
        assert_eq!(book.names()[0], "MŠK Žilina");
        assert_eq!(book.get("ŠK SÁSOVÁ").map(|r| r.rating()), Some(290.0));
    }
}
