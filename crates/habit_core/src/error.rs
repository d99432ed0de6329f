use chrono::NaiveDate;
use thiserror::Error;

use crate::model::HabitKind;

#[derive(Debug, Error)]
pub enum HabitError {
    #[error("please enter a habit name")]
    EmptyName,
    #[error("please enter a question text")]
    EmptyQuestion,
    #[error("habit `{0}` not found")]
    HabitNotFound(String),
    #[error("cannot log {date}: it is after today ({today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },
    #[error("habit `{habit_id}` is a {kind} habit")]
    WrongKind { habit_id: String, kind: HabitKind },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl HabitError {
    /// Input problems the user can fix before anything is persisted.
    pub fn is_validation(&self) -> bool {
        matches!(self, HabitError::EmptyName | HabitError::EmptyQuestion)
    }
}

pub type HabitResult<T> = std::result::Result<T, HabitError>;
