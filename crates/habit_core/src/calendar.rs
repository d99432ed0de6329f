use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::DATE_FORMAT;

pub const WINDOW_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// The seven days ending at `reference`, oldest first.
pub fn window_for(reference: NaiveDate) -> [NaiveDate; WINDOW_DAYS] {
    let mut dates = [reference; WINDOW_DAYS];
    for (idx, slot) in dates.iter_mut().enumerate() {
        let back = (WINDOW_DAYS - 1 - idx) as i64;
        *slot = reference - Duration::days(back);
    }
    dates
}

/// Moves the reference date a week in `direction`. Moving forward never
/// passes `today`, and is a no-op once the window already ends on it.
pub fn advance(reference: NaiveDate, direction: Direction, today: NaiveDate) -> NaiveDate {
    match direction {
        Direction::Prev => reference - Duration::days(WINDOW_DAYS as i64),
        Direction::Next => {
            if reference == today {
                return reference;
            }
            let next = reference + Duration::days(WINDOW_DAYS as i64);
            next.min(today)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarWindow {
    reference: NaiveDate,
}

impl CalendarWindow {
    pub fn ending_at(reference: NaiveDate) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    pub fn start(&self) -> NaiveDate {
        self.reference - Duration::days(WINDOW_DAYS as i64 - 1)
    }

    pub fn end(&self) -> NaiveDate {
        self.reference
    }

    pub fn dates(&self) -> [NaiveDate; WINDOW_DAYS] {
        window_for(self.reference)
    }

    pub fn date_keys(&self) -> Vec<String> {
        self.dates()
            .iter()
            .map(|date| date.format(DATE_FORMAT).to_string())
            .collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.end()
    }

    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.reference == today
    }

    pub fn advanced(&self, direction: Direction, today: NaiveDate) -> Self {
        Self::ending_at(advance(self.reference, direction, today))
    }
}
