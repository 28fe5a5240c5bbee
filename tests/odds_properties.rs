use proptest::prelude::*;

use matchbet_terminal::rating::{ODDS_MAX, ODDS_MIN, calc_odds, expected_goals};

fn has_two_decimals(x: f64) -> bool {
    ((x * 100.0).round() - x * 100.0).abs() < 1e-6
}

proptest! {
    #[test]
    fn odds_stay_in_bounds_and_cents(r_home in 0.0f64..4000.0, r_away in 0.0f64..4000.0) {
        let q = calc_odds(r_home, r_away);
        for odd in [q.home, q.draw, q.away] {
            prop_assert!((ODDS_MIN..=ODDS_MAX).contains(&odd), "odd {odd} out of bounds");
            prop_assert!(has_two_decimals(odd), "odd {odd} not rounded");
        }
    }

    #[test]
    fn home_side_is_favoured_at_equal_ratings(r in 1.0f64..3000.0) {
        let q = calc_odds(r, r);
        prop_assert!(q.home < q.away);
        let (g1, g2) = expected_goals(r, r);
        prop_assert_eq!(g1, g2);
    }

    #[test]
    fn stronger_home_team_is_shorter_odds(base in 200.0f64..2000.0, gap in 1.0f64..800.0) {
        let weaker = calc_odds(base, base + gap);
        let stronger = calc_odds(base + gap, base);
        prop_assert!(stronger.home <= weaker.home);
        prop_assert!(stronger.away >= weaker.away);
    }

    #[test]
    fn expected_goals_are_clamped(r_home in 0.0f64..100_000.0, r_away in 0.0f64..100_000.0) {
        let (g1, g2) = expected_goals(r_home, r_away);
        prop_assert!((0.2..=20.0).contains(&g1));
        prop_assert!((0.2..=20.0).contains(&g2));
    }
}

#[test]
fn quote_for_even_teams() {
    let q = calc_odds(1000.0, 1000.0);
    assert_eq!((q.home, q.draw, q.away), (1.76, 2.35, 2.24));
}
