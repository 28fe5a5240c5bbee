use serde::{Deserialize, Serialize};

use crate::random::RandomSource;

pub const REGULATION_MINUTES: u32 = 90;
pub const STOPPAGE_MIN: u32 = 1;
pub const STOPPAGE_MAX: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

/// What happened, and to whom. Declaration order is the draw order, which is
/// also the order of same-minute events in a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    GoalHome,
    GoalAway,
    CautionHome,
    CautionAway,
    DismissalHome,
    DismissalAway,
}

impl EventCategory {
    pub const DRAW_ORDER: [EventCategory; 6] = [
        EventCategory::GoalHome,
        EventCategory::GoalAway,
        EventCategory::CautionHome,
        EventCategory::CautionAway,
        EventCategory::DismissalHome,
        EventCategory::DismissalAway,
    ];

    pub fn side(self) -> Side {
        match self {
            EventCategory::GoalHome | EventCategory::CautionHome | EventCategory::DismissalHome => {
                Side::Home
            }
            EventCategory::GoalAway | EventCategory::CautionAway | EventCategory::DismissalAway => {
                Side::Away
            }
        }
    }

    pub fn is_goal(self) -> bool {
        matches!(self, EventCategory::GoalHome | EventCategory::GoalAway)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub minute: u32,
    pub category: EventCategory,
}

impl MatchEvent {
    pub fn describe(&self, home: &str, away: &str) -> String {
        let team = match self.category.side() {
            Side::Home => home,
            Side::Away => away,
        };
        match self.category {
            EventCategory::GoalHome | EventCategory::GoalAway => format!("⚽ Goal! {team} scored."),
            EventCategory::CautionHome | EventCategory::CautionAway => {
                format!("🟨 Yellow card for {team}")
            }
            EventCategory::DismissalHome | EventCategory::DismissalAway => {
                format!("🟥 Red card for {team}")
            }
        }
    }
}

/// How many events of each category a match produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub goals_home: u32,
    pub goals_away: u32,
    pub cautions_home: u32,
    pub cautions_away: u32,
    pub dismissals_home: u32,
    pub dismissals_away: u32,
}

impl EventCounts {
    pub fn get(&self, category: EventCategory) -> u32 {
        match category {
            EventCategory::GoalHome => self.goals_home,
            EventCategory::GoalAway => self.goals_away,
            EventCategory::CautionHome => self.cautions_home,
            EventCategory::CautionAway => self.cautions_away,
            EventCategory::DismissalHome => self.dismissals_home,
            EventCategory::DismissalAway => self.dismissals_away,
        }
    }
}

/// All events of one match, ascending by minute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    events: Vec<MatchEvent>,
}

impl Timeline {
    /// Draws minutes for each category in `DRAW_ORDER` and merges them. The
    /// sort is stable, so same-minute events keep category order.
    pub fn build<R: RandomSource + ?Sized>(
        counts: &EventCounts,
        total_minutes: u32,
        rng: &mut R,
    ) -> Self {
        let mut events = Vec::new();
        for category in EventCategory::DRAW_ORDER {
            for minute in draw_minutes(counts.get(category), total_minutes, rng) {
                events.push(MatchEvent { minute, category });
            }
        }
        events.sort_by_key(|e| e.minute);
        Self { events }
    }

    pub fn events(&self) -> &[MatchEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn at_minute(&self, minute: u32) -> Vec<MatchEvent> {
        // Sorted, so binary search the run for this minute.
        let start = self.events.partition_point(|e| e.minute < minute);
        self.events[start..]
            .iter()
            .take_while(|e| e.minute == minute)
            .copied()
            .collect()
    }

    pub fn minutes_of(&self, category: EventCategory) -> Vec<u32> {
        self.events
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.minute)
            .collect()
    }
}

/// `count` distinct minutes from `[1, total_minutes]`, without replacement,
/// ascending. `count` is clamped to the pool size.
pub fn draw_minutes<R: RandomSource + ?Sized>(
    count: u32,
    total_minutes: u32,
    rng: &mut R,
) -> Vec<u32> {
    let mut pool: Vec<u32> = (1..=total_minutes).collect();
    let count = count.min(total_minutes) as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let idx = ((rng.uniform() * pool.len() as f64).floor() as usize).min(pool.len() - 1);
        out.push(pool.remove(idx));
    }
    out.sort_unstable();
    out
}

/// Added time for a match, in `[STOPPAGE_MIN, STOPPAGE_MAX]`.
pub fn draw_stoppage<R: RandomSource + ?Sized>(rng: &mut R) -> u32 {
    rng.uniform_int(STOPPAGE_MIN, STOPPAGE_MAX)
}

/// `"12. min"` in regulation, `"90+3"` in added time.
pub fn minute_label(minute: u32) -> String {
    if minute > REGULATION_MINUTES {
        format!("{REGULATION_MINUTES}+{}", minute - REGULATION_MINUTES)
    } else {
        format!("{minute}. min")
    }
}
