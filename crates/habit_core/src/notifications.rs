use anyhow::Result;
use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::model::Habit;

/// A reminder that fires every day at `hour:minute` local time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyReminder {
    pub title: String,
    pub body: String,
    pub hour: u32,
    pub minute: u32,
}

impl DailyReminder {
    pub fn for_habit(habit: &Habit) -> Option<Self> {
        let at = habit.reminder_clock_time()?;
        Some(Self {
            title: format!("Habit: {}", habit.name),
            body: habit.question_text.clone(),
            hour: at.hour(),
            minute: at.minute(),
        })
    }
}

/// Platform-specific notification adapters will implement this trait.
pub trait NotificationSink: Send + Sync {
    /// Returns the platform id needed to cancel the reminder later.
    fn schedule_daily(&self, reminder: &DailyReminder) -> Result<String>;
    fn cancel(&self, notification_id: &str) -> Result<()>;
}

/// Sink for hosts without a notification service; reminders only reach the log.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn schedule_daily(&self, reminder: &DailyReminder) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            %id,
            title = %reminder.title,
            hour = reminder.hour,
            minute = reminder.minute,
            "daily reminder registered"
        );
        Ok(id)
    }

    fn cancel(&self, notification_id: &str) -> Result<()> {
        tracing::info!(id = %notification_id, "daily reminder cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HabitKind;
    use chrono::{Local, NaiveDate, TimeZone, Utc};

    #[test]
    fn reminder_uses_local_clock_time() {
        let local = Local
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2025, 10, 20)
                    .unwrap()
                    .and_hms_opt(7, 45, 0)
                    .unwrap(),
            )
            .single()
            .unwrap();
        let habit = Habit {
            id: "h".into(),
            name: "Stretch".into(),
            question_text: "Did you stretch?".into(),
            kind: HabitKind::YesNo,
            created_at: Utc::now(),
            frequency: None,
            reminder_time: Some(local.with_timezone(&Utc)),
            description: None,
            notification_id: None,
        };
        let reminder = DailyReminder::for_habit(&habit).expect("reminder");
        assert_eq!(reminder.hour, 7);
        assert_eq!(reminder.minute, 45);
        assert_eq!(reminder.title, "Habit: Stretch");
        assert_eq!(reminder.body, "Did you stretch?");
    }

    #[test]
    fn habit_without_reminder_time_has_no_reminder() {
        let habit = Habit {
            id: "h".into(),
            name: "Stretch".into(),
            question_text: "Did you stretch?".into(),
            kind: HabitKind::YesNo,
            created_at: Utc::now(),
            frequency: None,
            reminder_time: None,
            description: None,
            notification_id: None,
        };
        assert!(DailyReminder::for_habit(&habit).is_none());
    }
}
