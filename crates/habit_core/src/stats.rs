//! Per-habit score derivation.
//!
//! Everything here is a pure function of `(habit, entries, today)`: callers
//! load the data, this module never touches storage or the clock.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::model::{Entry, EntryValue, Habit, HabitKind};

pub const DEFAULT_MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsOptions {
    /// Upper bound on how many days back the scan goes.
    pub max_window_days: i64,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            max_window_days: DEFAULT_MAX_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Motivation {
    OnFire,
    KeepItUp,
    DontGiveUp,
    GetStarted,
}

impl Motivation {
    pub fn for_rate(rate: u32) -> Self {
        match rate {
            r if r >= 90 => Motivation::OnFire,
            r if r >= 50 => Motivation::KeepItUp,
            r if r > 0 => Motivation::DontGiveUp,
            _ => Motivation::GetStarted,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Motivation::OnFire => "You're on fire!",
            Motivation::KeepItUp => "Keep it up!",
            Motivation::DontGiveUp => "Don't give up!",
            Motivation::GetStarted => "Start building your habit!",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WeekdayStat {
    pub weekday: Weekday,
    pub total: f64,
    pub count: u32,
}

impl WeekdayStat {
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / f64::from(self.count)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumericSummary {
    pub total: f64,
    pub count: u32,
    /// One decimal place.
    pub average: f64,
    pub best: f64,
    /// Monday through Sunday.
    pub weekdays: Vec<WeekdayStat>,
    pub best_weekday: Option<Weekday>,
}

impl Default for NumericSummary {
    fn default() -> Self {
        Self {
            total: 0.0,
            count: 0,
            average: 0.0,
            best: 0.0,
            weekdays: week_order()
                .into_iter()
                .map(|weekday| WeekdayStat {
                    weekday,
                    total: 0.0,
                    count: 0,
                })
                .collect(),
            best_weekday: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitStats {
    pub window_start: NaiveDate,
    pub window_days: i64,
    pub yes_count: u32,
    pub no_count: u32,
    /// Classified days, `yes_count + no_count`.
    pub total_count: u32,
    pub completion_rate: u32,
    pub score: u32,
    pub current_streak: u32,
    pub motivation: Motivation,
    pub numeric: NumericSummary,
}

impl HabitStats {
    pub fn message(&self) -> &'static str {
        self.motivation.message()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayOutcome {
    Success,
    Failure,
    Unclassified,
}

/// Computes the score card for one habit from its complete entry history.
///
/// `habit` may be absent when the record was deleted or never loaded; the
/// window then starts today (or at the earliest entry) and no missed days are
/// inferred.
pub fn compute_stats(
    habit: Option<&Habit>,
    entries: &[Entry],
    today: NaiveDate,
    options: &StatsOptions,
) -> HabitStats {
    let by_date: HashMap<NaiveDate, &Entry> =
        entries.iter().map(|entry| (entry.date, entry)).collect();

    let (window_start, window_days) = statistics_window(habit, entries, today, options);

    let mut yes = 0u32;
    let mut no = 0u32;
    let mut streak = 0u32;
    let mut streak_open = true;

    for offset in 0..window_days {
        let day = today - Duration::days(offset);
        let outcome = classify_day(habit, by_date.get(&day).copied(), day == today);
        match outcome {
            DayOutcome::Success => yes += 1,
            DayOutcome::Failure => no += 1,
            DayOutcome::Unclassified => {}
        }

        if streak_open {
            match outcome {
                DayOutcome::Success => streak += 1,
                // An unresolved today neither extends nor ends the streak.
                DayOutcome::Unclassified if offset == 0 => {}
                _ => streak_open = false,
            }
        }
    }

    let total = yes + no;
    let rate = percentage(yes, total);

    let numeric = match habit.map(|h| h.kind) {
        Some(HabitKind::YesNo) => NumericSummary::default(),
        _ => numeric_summary(entries),
    };

    HabitStats {
        window_start,
        window_days,
        yes_count: yes,
        no_count: no,
        total_count: total,
        completion_rate: rate,
        score: rate,
        current_streak: streak,
        motivation: Motivation::for_rate(rate),
        numeric,
    }
}

/// First day of the scan and the number of days it covers, today included.
pub fn statistics_window(
    habit: Option<&Habit>,
    entries: &[Entry],
    today: NaiveDate,
    options: &StatsOptions,
) -> (NaiveDate, i64) {
    let anchor = habit.map(Habit::created_on).unwrap_or(today);
    let start = entries
        .iter()
        .map(|entry| entry.date)
        .min()
        .map_or(anchor, |earliest| earliest.min(anchor));

    let span = today.signed_duration_since(start).num_days().abs() + 1;
    let days = span.min(options.max_window_days.max(1)).max(1);
    (start, days)
}

fn classify_day(habit: Option<&Habit>, entry: Option<&Entry>, is_today: bool) -> DayOutcome {
    match entry {
        Some(entry) => match entry.value.as_ref().and_then(EntryValue::outcome) {
            Some(true) => DayOutcome::Success,
            Some(false) => DayOutcome::Failure,
            None => DayOutcome::Unclassified,
        },
        None => match habit {
            Some(habit) if habit.infers_missed_days() && !is_today => DayOutcome::Failure,
            _ => DayOutcome::Unclassified,
        },
    }
}

/// Totals over every entry that parses as a number, regardless of window.
pub fn numeric_summary(entries: &[Entry]) -> NumericSummary {
    let mut summary = NumericSummary::default();

    for entry in entries {
        let Some(value) = entry.value.as_ref().and_then(EntryValue::as_number) else {
            continue;
        };
        summary.total += value;
        summary.count += 1;
        if value > summary.best {
            summary.best = value;
        }
        let slot = &mut summary.weekdays[entry.date.weekday().num_days_from_monday() as usize];
        slot.total += value;
        slot.count += 1;
    }

    if summary.count > 0 {
        summary.average = round_half_up(summary.total / f64::from(summary.count) * 10.0) / 10.0;
    }

    let mut best_avg = 0.0;
    for stat in &summary.weekdays {
        let avg = stat.average();
        if stat.count > 0 && avg > best_avg {
            best_avg = avg;
            summary.best_weekday = Some(stat.weekday);
        }
    }

    summary
}

/// `round(part / whole * 100)`, zero when `whole` is zero.
pub fn percentage(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    round_half_up(f64::from(part) / f64::from(whole) * 100.0) as u32
}

pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn week_order() -> [Weekday; 7] {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
}
