use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::model::{Entry, Habit};
use crate::store::{KeyValueStore, ENTRIES_KEY, HABITS_KEY, HAS_LAUNCHED_KEY};

/// Habits and entries persisted as two flat JSON arrays. Every mutation reads
/// the whole array, changes it in memory and writes it back.
#[derive(Clone)]
pub struct HabitRepository {
    store: Arc<dyn KeyValueStore>,
}

impl HabitRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn habits(&self) -> Result<Vec<Habit>> {
        self.read_array(HABITS_KEY)
    }

    pub fn find_habit(&self, habit_id: &str) -> Result<Option<Habit>> {
        Ok(self.habits()?.into_iter().find(|habit| habit.id == habit_id))
    }

    pub fn save_habit(&self, habit: &Habit) -> Result<()> {
        let mut habits = self.habits()?;
        habits.push(habit.clone());
        self.write_array(HABITS_KEY, &habits)
    }

    /// Replaces the stored habit with the same id. Returns `false` when no
    /// habit matched.
    pub fn update_habit(&self, updated: &Habit) -> Result<bool> {
        let mut habits = self.habits()?;
        let mut found = false;
        for habit in habits.iter_mut().filter(|habit| habit.id == updated.id) {
            *habit = updated.clone();
            found = true;
        }
        if found {
            self.write_array(HABITS_KEY, &habits)?;
        }
        Ok(found)
    }

    /// Removes the habit record only; its entries stay in storage.
    pub fn delete_habit(&self, habit_id: &str) -> Result<bool> {
        let mut habits = self.habits()?;
        let before = habits.len();
        habits.retain(|habit| habit.id != habit_id);
        if habits.len() == before {
            return Ok(false);
        }
        self.write_array(HABITS_KEY, &habits)?;
        Ok(true)
    }

    pub fn entries(&self) -> Result<Vec<Entry>> {
        self.read_array(ENTRIES_KEY)
    }

    pub fn entries_for_habit(&self, habit_id: &str) -> Result<Vec<Entry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|entry| entry.habit_id == habit_id)
            .collect())
    }

    pub fn entries_for_date(&self, date: NaiveDate) -> Result<Vec<Entry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|entry| entry.date == date)
            .collect())
    }

    /// Entries dated within `start..=end`.
    pub fn entries_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Entry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|entry| entry.date >= start && entry.date <= end)
            .collect())
    }

    /// Upsert keyed on `(habit_id, date)`.
    pub fn save_entry(&self, entry: &Entry) -> Result<()> {
        let mut entries = self.entries()?;
        match entries.iter_mut().find(|existing| existing.same_key(entry)) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        self.write_array(ENTRIES_KEY, &entries)
    }

    pub fn delete_entry(&self, habit_id: &str, date: NaiveDate) -> Result<bool> {
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|entry| !(entry.habit_id == habit_id && entry.date == date));
        if entries.len() == before {
            return Ok(false);
        }
        self.write_array(ENTRIES_KEY, &entries)?;
        Ok(true)
    }

    /// Keeps only entries accepted by `keep`; returns how many were dropped.
    pub fn retain_entries(&self, keep: impl Fn(&Entry) -> bool) -> Result<usize> {
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|entry| keep(entry));
        let dropped = before - entries.len();
        if dropped > 0 {
            self.write_array(ENTRIES_KEY, &entries)?;
        }
        Ok(dropped)
    }

    pub fn has_launched(&self) -> Result<bool> {
        Ok(self.store.get(HAS_LAUNCHED_KEY)?.is_some())
    }

    pub fn mark_launched(&self) -> Result<()> {
        self.store.set(HAS_LAUNCHED_KEY, "true")
    }

    fn read_array<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.store.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("malformed JSON stored under `{key}`")),
            None => Ok(Vec::new()),
        }
    }

    fn write_array<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        debug!(key, count = items.len(), "writing array");
        self.store.set(key, &raw)
    }
}
