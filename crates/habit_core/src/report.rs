use serde::{Deserialize, Serialize};

use crate::model::{Entry, EntryValue, Habit};
use crate::stats::percentage;

/// Label shown when there is no habit to rank.
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitRate {
    pub habit_id: String,
    pub name: String,
    pub success_count: u32,
    pub entry_count: u32,
    pub rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverallReport {
    pub global_rate: u32,
    pub total_habits: usize,
    /// Highest rate first; equal rates keep their input order.
    pub ranking: Vec<HabitRate>,
}

impl OverallReport {
    pub fn best(&self) -> Option<&HabitRate> {
        self.ranking.first()
    }

    pub fn needs_focus(&self) -> Option<&HabitRate> {
        self.ranking.last()
    }

    pub fn best_label(&self) -> &str {
        self.best().map_or(PLACEHOLDER, |rate| rate.name.as_str())
    }

    pub fn needs_focus_label(&self) -> &str {
        self.needs_focus().map_or(PLACEHOLDER, |rate| rate.name.as_str())
    }
}

/// Any value that is present and not an explicit `false` counts, empty text included.
pub fn counts_as_success(value: Option<&EntryValue>) -> bool {
    !matches!(value, None | Some(EntryValue::Flag(false)))
}

pub fn habit_rate(habit: &Habit, entries: &[Entry]) -> HabitRate {
    let entry_count = entries.len() as u32;
    let success_count = entries
        .iter()
        .filter(|entry| counts_as_success(entry.value.as_ref()))
        .count() as u32;
    HabitRate {
        habit_id: habit.id.clone(),
        name: habit.name.clone(),
        success_count,
        entry_count,
        rate: percentage(success_count, entry_count),
    }
}

/// Builds the cross-habit report. `entries` may hold every stored entry;
/// each habit only sees its own.
pub fn build_report(habits: &[Habit], entries: &[Entry]) -> OverallReport {
    let mut ranking: Vec<HabitRate> = habits
        .iter()
        .map(|habit| {
            let own: Vec<Entry> = entries
                .iter()
                .filter(|entry| entry.habit_id == habit.id)
                .cloned()
                .collect();
            habit_rate(habit, &own)
        })
        .collect();

    let total_entries: u32 = ranking.iter().map(|rate| rate.entry_count).sum();
    let total_success: u32 = ranking.iter().map(|rate| rate.success_count).sum();

    ranking.sort_by(|a, b| b.rate.cmp(&a.rate));

    OverallReport {
        global_rate: percentage(total_success, total_entries),
        total_habits: habits.len(),
        ranking,
    }
}
