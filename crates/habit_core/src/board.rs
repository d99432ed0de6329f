use std::collections::HashMap;

use chrono::NaiveDate;

use crate::calendar::{CalendarWindow, WINDOW_DAYS};
use crate::model::{Entry, EntryValue, Habit};

/// What a single day cell shows.
#[derive(Debug, Clone, PartialEq)]
pub enum CellState {
    Future,
    Empty,
    Yes,
    No,
    Value(String),
}

impl CellState {
    pub fn glyph(&self) -> String {
        match self {
            CellState::Future => " ".to_string(),
            CellState::Empty => "·".to_string(),
            CellState::Yes => "✓".to_string(),
            CellState::No => "✗".to_string(),
            CellState::Value(text) => text.clone(),
        }
    }
}

/// A change to one `(habit, day)` cell.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryCommand {
    Upsert(Entry),
    Clear { habit_id: String, date: NaiveDate },
}

impl EntryCommand {
    pub fn habit_id(&self) -> &str {
        match self {
            EntryCommand::Upsert(entry) => &entry.habit_id,
            EntryCommand::Clear { habit_id, .. } => habit_id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            EntryCommand::Upsert(entry) => entry.date,
            EntryCommand::Clear { date, .. } => *date,
        }
    }
}

type CellKey = (String, NaiveDate);

/// In-memory projection of habits and their entries for one calendar window.
#[derive(Debug, Clone)]
pub struct WeekBoard {
    window: CalendarWindow,
    today: NaiveDate,
    habits: Vec<Habit>,
    cells: HashMap<CellKey, Entry>,
}

impl WeekBoard {
    pub fn new(
        window: CalendarWindow,
        today: NaiveDate,
        habits: Vec<Habit>,
        entries: Vec<Entry>,
    ) -> Self {
        let mut board = Self {
            window,
            today,
            habits,
            cells: HashMap::new(),
        };
        board.replace_entries(entries);
        board
    }

    pub fn window(&self) -> CalendarWindow {
        self.window
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn dates(&self) -> [NaiveDate; WINDOW_DAYS] {
        self.window.dates()
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn habit(&self, habit_id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == habit_id)
    }

    pub fn entry(&self, habit_id: &str, date: NaiveDate) -> Option<&Entry> {
        self.cells.get(&(habit_id.to_string(), date))
    }

    pub fn entry_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, habit: &Habit, date: NaiveDate) -> CellState {
        if date > self.today {
            return CellState::Future;
        }
        match self.entry(&habit.id, date).and_then(|entry| entry.value.as_ref()) {
            None => CellState::Empty,
            Some(EntryValue::Flag(true)) if habit.is_yes_no() => CellState::Yes,
            Some(EntryValue::Flag(false)) if habit.is_yes_no() => CellState::No,
            Some(value) if value.is_truthy() || !habit.is_yes_no() => {
                CellState::Value(value.to_string())
            }
            Some(_) => CellState::Empty,
        }
    }

    /// Applies `command` and returns the cell's previous entry. Days outside
    /// the window are not projected.
    pub(crate) fn apply(&mut self, command: &EntryCommand) -> Option<Entry> {
        if !self.window.contains(command.date()) {
            return None;
        }
        let key = (command.habit_id().to_string(), command.date());
        match command {
            EntryCommand::Upsert(entry) => self.cells.insert(key, entry.clone()),
            EntryCommand::Clear { .. } => self.cells.remove(&key),
        }
    }

    pub(crate) fn restore(&mut self, habit_id: &str, date: NaiveDate, previous: Option<Entry>) {
        let key = (habit_id.to_string(), date);
        match previous {
            Some(entry) => {
                self.cells.insert(key, entry);
            }
            None => {
                self.cells.remove(&key);
            }
        }
    }

    pub(crate) fn reset(
        &mut self,
        window: CalendarWindow,
        today: NaiveDate,
        habits: Vec<Habit>,
        entries: Vec<Entry>,
    ) {
        self.window = window;
        self.today = today;
        self.habits = habits;
        self.replace_entries(entries);
    }

    fn replace_entries(&mut self, entries: Vec<Entry>) {
        self.cells.clear();
        for entry in entries {
            if self.window.contains(entry.date) {
                self.cells.insert((entry.habit_id.clone(), entry.date), entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HabitKind;
    use chrono::{TimeZone, Utc};

    fn habit(id: &str, kind: HabitKind) -> Habit {
        Habit {
            id: id.into(),
            name: id.into(),
            question_text: "?".into(),
            kind,
            created_at: Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0).unwrap(),
            frequency: None,
            reminder_time: None,
            description: None,
            notification_id: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[test]
    fn cells_reflect_entries_and_future_days() {
        let yes_no = habit("y", HabitKind::YesNo);
        let fill_in = habit("f", HabitKind::FillIn);
        let board = WeekBoard::new(
            CalendarWindow::ending_at(day(24)),
            day(22),
            vec![yes_no.clone(), fill_in.clone()],
            vec![
                Entry::new("y", day(20), EntryValue::Flag(true)),
                Entry::new("y", day(21), EntryValue::Flag(false)),
                Entry::new("f", day(21), EntryValue::Text("12".into())),
                Entry::new("y", day(1), EntryValue::Flag(true)),
            ],
        );
        assert_eq!(board.entry_count(), 3, "entries outside the window are dropped");
        assert_eq!(board.cell(&yes_no, day(20)), CellState::Yes);
        assert_eq!(board.cell(&yes_no, day(21)), CellState::No);
        assert_eq!(board.cell(&yes_no, day(22)), CellState::Empty);
        assert_eq!(board.cell(&yes_no, day(23)), CellState::Future);
        assert_eq!(board.cell(&fill_in, day(21)), CellState::Value("12".into()));
    }

    #[test]
    fn apply_returns_previous_and_restore_undoes() {
        let mut board = WeekBoard::new(
            CalendarWindow::ending_at(day(24)),
            day(24),
            vec![habit("y", HabitKind::YesNo)],
            vec![Entry::new("y", day(24), EntryValue::Flag(true))],
        );
        let previous = board.apply(&EntryCommand::Clear {
            habit_id: "y".into(),
            date: day(24),
        });
        assert!(board.entry("y", day(24)).is_none());
        board.restore("y", day(24), previous);
        assert_eq!(
            board.entry("y", day(24)).and_then(|e| e.value.clone()),
            Some(EntryValue::Flag(true))
        );
    }
}
