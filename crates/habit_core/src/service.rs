use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    board::{EntryCommand, WeekBoard},
    calendar::{CalendarWindow, Direction},
    clock::{Clock, SystemClock},
    error::{HabitError, HabitResult},
    model::{Entry, EntryValue, Habit, HabitKind, NewHabit},
    notifications::{DailyReminder, NotificationSink},
    report::{self, OverallReport},
    repository::HabitRepository,
    stats::{self, HabitStats, StatsOptions},
    store::{KeyValueStore, MemoryStore},
};

/// Result of a successful habit creation. A reminder that could not be
/// scheduled does not block creation; the reason is reported here instead.
#[derive(Debug, Clone)]
pub struct CreatedHabit {
    pub habit: Habit,
    pub reminder_warning: Option<String>,
}

pub struct HabitService {
    repository: HabitRepository,
    clock: Box<dyn Clock>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    stats_options: StatsOptions,
}

pub struct HabitServiceBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    clock: Box<dyn Clock>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    stats_options: StatsOptions,
}

impl HabitServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            clock: Box::new(SystemClock),
            notification_sink: None,
            stats_options: StatsOptions::default(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notification_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn with_stats_options(mut self, options: StatsOptions) -> Self {
        self.stats_options = options;
        self
    }

    pub fn build(self) -> Result<HabitService> {
        let store = match self.store {
            Some(store) => store,
            None => {
                debug!("no store configured, using in-memory storage");
                Arc::new(MemoryStore::new())
            }
        };
        let repository = HabitRepository::new(store);
        match repository.habits() {
            Ok(habits) => info!(habit_count = habits.len(), "habit service ready"),
            Err(err) => error!(%err, "habit data unreadable, starting with no habits"),
        }
        Ok(HabitService {
            repository,
            clock: self.clock,
            notification_sink: self.notification_sink,
            stats_options: self.stats_options,
        })
    }
}

impl Default for HabitServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitService {
    pub fn builder() -> HabitServiceBuilder {
        HabitServiceBuilder::new()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn repository(&self) -> &HabitRepository {
        &self.repository
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn create_habit(&self, input: NewHabit) -> HabitResult<CreatedHabit> {
        let name = validated_name(&input.name)?;
        if input.question_text.trim().is_empty() {
            return Err(HabitError::EmptyQuestion);
        }

        let mut habit = Habit {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            question_text: input.question_text.trim().to_string(),
            kind: input.kind,
            created_at: self.clock.now(),
            frequency: input.frequency,
            reminder_time: input.reminder_time,
            description: input.description,
            notification_id: None,
        };

        let mut reminder_warning = None;
        if let (Some(sink), Some(reminder)) =
            (&self.notification_sink, DailyReminder::for_habit(&habit))
        {
            match sink.schedule_daily(&reminder) {
                Ok(id) => habit.notification_id = Some(id),
                Err(err) => {
                    warn!(%err, habit_id = %habit.id, "unable to schedule reminder");
                    reminder_warning = Some(format!("Reminder not scheduled: {err}"));
                }
            }
        }

        self.repository.save_habit(&habit)?;
        info!(habit_id = %habit.id, kind = %habit.kind, "habit created");
        Ok(CreatedHabit {
            habit,
            reminder_warning,
        })
    }

    #[instrument(skip(self))]
    pub fn rename_habit(&self, habit_id: &str, name: &str) -> HabitResult<Habit> {
        let name = validated_name(name)?;
        let mut habit = self.require_habit(habit_id)?;
        habit.name = name;
        if !self.repository.update_habit(&habit)? {
            return Err(HabitError::HabitNotFound(habit_id.to_string()));
        }
        Ok(habit)
    }

    /// Deletes the habit and cancels its reminder. Entries are kept; see
    /// [`HabitService::purge_orphaned_entries`].
    #[instrument(skip(self))]
    pub fn delete_habit(&self, habit_id: &str) -> HabitResult<()> {
        let habit = self.require_habit(habit_id)?;
        if let (Some(sink), Some(notification_id)) =
            (&self.notification_sink, habit.notification_id.as_deref())
        {
            if let Err(err) = sink.cancel(notification_id) {
                warn!(%err, %notification_id, "unable to cancel reminder");
            }
        }
        self.repository.delete_habit(habit_id)?;
        info!("habit deleted");
        Ok(())
    }

    /// Drops entries whose habit no longer exists.
    pub fn purge_orphaned_entries(&self) -> HabitResult<usize> {
        let known: HashSet<String> = self
            .repository
            .habits()?
            .into_iter()
            .map(|habit| habit.id)
            .collect();
        let dropped = self
            .repository
            .retain_entries(|entry| known.contains(&entry.habit_id))?;
        info!(dropped, "orphaned entries purged");
        Ok(dropped)
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.repository.habits().unwrap_or_else(|err| {
            error!(%err, "failed to fetch habits");
            Vec::new()
        })
    }

    pub fn entries_for_habit(&self, habit_id: &str) -> Vec<Entry> {
        self.repository
            .entries_for_habit(habit_id)
            .unwrap_or_else(|err| {
                error!(%err, %habit_id, "failed to fetch entries");
                Vec::new()
            })
    }

    /// Score card over the habit's full history, not just the visible week.
    pub fn habit_stats(&self, habit_id: &str) -> HabitStats {
        let habit = self.habits().into_iter().find(|habit| habit.id == habit_id);
        if habit.is_none() {
            debug!(%habit_id, "computing stats for unknown habit");
        }
        let entries = self.entries_for_habit(habit_id);
        stats::compute_stats(habit.as_ref(), &entries, self.today(), &self.stats_options)
    }

    pub fn overall_report(&self) -> OverallReport {
        let habits = self.habits();
        let entries = self.repository.entries().unwrap_or_else(|err| {
            error!(%err, "failed to fetch entries");
            Vec::new()
        });
        report::build_report(&habits, &entries)
    }

    pub fn needs_onboarding(&self) -> bool {
        match self.repository.has_launched() {
            Ok(launched) => !launched,
            Err(err) => {
                error!(%err, "failed to read launch flag");
                true
            }
        }
    }

    pub fn complete_onboarding(&self) -> HabitResult<()> {
        self.repository.mark_launched()?;
        Ok(())
    }

    pub fn current_week(&self) -> WeekBoard {
        self.week_board(self.today())
    }

    pub fn week_board(&self, reference: NaiveDate) -> WeekBoard {
        let window = CalendarWindow::ending_at(reference);
        let (habits, entries) = self.load_window(&window);
        WeekBoard::new(window, self.today(), habits, entries)
    }

    pub fn navigate(&self, board: &mut WeekBoard, direction: Direction) {
        let window = board.window().advanced(direction, self.today());
        let (habits, entries) = self.load_window(&window);
        board.reset(window, self.today(), habits, entries);
    }

    /// Re-reads the board's window from storage.
    pub fn refresh(&self, board: &mut WeekBoard) {
        let window = board.window();
        let (habits, entries) = self.load_window(&window);
        board.reset(window, self.today(), habits, entries);
    }

    /// Flips a yes/no cell: anything not already truthy becomes `true`.
    pub fn tap_day(
        &self,
        board: &mut WeekBoard,
        habit_id: &str,
        date: NaiveDate,
    ) -> HabitResult<Entry> {
        self.require_kind(board, habit_id, HabitKind::YesNo)?;
        let done = board
            .entry(habit_id, date)
            .and_then(|entry| entry.value.as_ref())
            .is_some_and(EntryValue::is_truthy);
        let entry = Entry::new(habit_id, date, EntryValue::Flag(!done));
        self.execute(board, EntryCommand::Upsert(entry.clone()))?;
        Ok(entry)
    }

    /// Stores a fill-in value. Blank input clears the cell instead of storing
    /// an empty record.
    pub fn record_value(
        &self,
        board: &mut WeekBoard,
        habit_id: &str,
        date: NaiveDate,
        input: &str,
    ) -> HabitResult<Option<Entry>> {
        self.require_kind(board, habit_id, HabitKind::FillIn)?;
        let text = input.trim();
        if text.is_empty() {
            self.clear_day(board, habit_id, date)?;
            return Ok(None);
        }
        let entry = Entry::new(habit_id, date, EntryValue::Text(text.to_string()));
        self.execute(board, EntryCommand::Upsert(entry.clone()))?;
        Ok(Some(entry))
    }

    pub fn clear_day(
        &self,
        board: &mut WeekBoard,
        habit_id: &str,
        date: NaiveDate,
    ) -> HabitResult<()> {
        if board.habit(habit_id).is_none() {
            return Err(HabitError::HabitNotFound(habit_id.to_string()));
        }
        self.execute(
            board,
            EntryCommand::Clear {
                habit_id: habit_id.to_string(),
                date,
            },
        )
    }

    /// Applies `command` to the board first, then persists it. When the write
    /// fails the board is reloaded from storage, or rolled back if that read
    /// fails too.
    #[instrument(skip(self, board), fields(habit_id = %command.habit_id(), date = %command.date()))]
    pub fn execute(&self, board: &mut WeekBoard, command: EntryCommand) -> HabitResult<()> {
        let today = self.today();
        let date = command.date();
        if date > today {
            return Err(HabitError::FutureDate { date, today });
        }

        let previous = board.apply(&command);
        let persisted = match &command {
            EntryCommand::Upsert(entry) => self.repository.save_entry(entry),
            EntryCommand::Clear { habit_id, date } => {
                self.repository.delete_entry(habit_id, *date).map(|_| ())
            }
        };

        if let Err(err) = persisted {
            error!(%err, "failed to persist entry, reconciling board");
            let window = board.window();
            match self.try_load_window(&window) {
                Ok((habits, entries)) => board.reset(window, today, habits, entries),
                Err(reload_err) => {
                    warn!(%reload_err, "reconciliation read failed, rolling back");
                    board.restore(command.habit_id(), date, previous);
                }
            }
            return Err(HabitError::Storage(err));
        }
        debug!("entry persisted");
        Ok(())
    }
}

impl HabitService {
    fn require_habit(&self, habit_id: &str) -> HabitResult<Habit> {
        self.repository
            .find_habit(habit_id)?
            .ok_or_else(|| HabitError::HabitNotFound(habit_id.to_string()))
    }

    fn require_kind(
        &self,
        board: &WeekBoard,
        habit_id: &str,
        expected: HabitKind,
    ) -> HabitResult<()> {
        let habit = board
            .habit(habit_id)
            .ok_or_else(|| HabitError::HabitNotFound(habit_id.to_string()))?;
        if habit.kind != expected {
            return Err(HabitError::WrongKind {
                habit_id: habit_id.to_string(),
                kind: habit.kind,
            });
        }
        Ok(())
    }

    fn load_window(&self, window: &CalendarWindow) -> (Vec<Habit>, Vec<Entry>) {
        self.try_load_window(window).unwrap_or_else(|err| {
            error!(%err, "failed to load week");
            (Vec::new(), Vec::new())
        })
    }

    fn try_load_window(&self, window: &CalendarWindow) -> Result<(Vec<Habit>, Vec<Entry>)> {
        let habits = self.repository.habits()?;
        let entries = self.repository.entries_between(window.start(), window.end())?;
        Ok((habits, entries))
    }
}

fn validated_name(name: &str) -> HabitResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(HabitError::EmptyName);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::HabitFrequency;
    use crate::stats::Motivation;
    use anyhow::anyhow;
    use chrono::{Duration, TimeZone, Utc};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
        fail_reads: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(anyhow!("disk unavailable"));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(anyhow!("disk full"));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        scheduled: Mutex<Vec<DailyReminder>>,
        cancelled: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl NotificationSink for RecordingSink {
        fn schedule_daily(&self, reminder: &DailyReminder) -> Result<String> {
            if self.fail {
                return Err(anyhow!("permission denied"));
            }
            self.scheduled.lock().push(reminder.clone());
            Ok("notif-1".into())
        }

        fn cancel(&self, notification_id: &str) -> Result<()> {
            self.cancelled.lock().push(notification_id.to_string());
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 24).unwrap()
    }

    fn service_with(store: Arc<dyn KeyValueStore>) -> HabitService {
        HabitService::builder()
            .with_store(store)
            .with_clock(Box::new(FixedClock::on(today())))
            .build()
            .expect("build service")
    }

    fn service() -> HabitService {
        service_with(Arc::new(MemoryStore::new()))
    }

    fn yes_no(service: &HabitService) -> Habit {
        service
            .create_habit(NewHabit::new("Meditate", "Did you meditate?", HabitKind::YesNo))
            .expect("create habit")
            .habit
    }

    #[test]
    fn create_rejects_blank_input_without_persisting() {
        let service = service();
        let err = service
            .create_habit(NewHabit::new("   ", "Question?", HabitKind::YesNo))
            .unwrap_err();
        assert!(matches!(err, HabitError::EmptyName));
        assert!(err.is_validation());

        let err = service
            .create_habit(NewHabit::new("Read", "", HabitKind::YesNo))
            .unwrap_err();
        assert!(matches!(err, HabitError::EmptyQuestion));
        assert!(service.habits().is_empty());
    }

    #[test]
    fn create_assigns_id_and_creation_time() {
        let service = service();
        let first = yes_no(&service);
        let second = yes_no(&service);
        assert_ne!(first.id, second.id);
        assert_eq!(first.created_on(), today());
        assert_eq!(service.habits().len(), 2);
    }

    #[test]
    fn reminder_failure_does_not_block_creation() {
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let service = HabitService::builder()
            .with_clock(Box::new(FixedClock::on(today())))
            .with_notification_sink(Box::new(sink))
            .build()
            .unwrap();
        let created = service
            .create_habit(
                NewHabit::new("Stretch", "Did you stretch?", HabitKind::YesNo)
                    .with_reminder(Utc.with_ymd_and_hms(2025, 10, 24, 7, 30, 0).unwrap()),
            )
            .expect("habit still created");
        assert!(created.reminder_warning.is_some());
        assert!(created.habit.notification_id.is_none());
        assert_eq!(service.habits().len(), 1);
    }

    #[test]
    fn delete_cancels_reminder_and_keeps_entries() {
        let cancelled = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            cancelled: Arc::clone(&cancelled),
            ..RecordingSink::default()
        };
        let service = HabitService::builder()
            .with_clock(Box::new(FixedClock::on(today())))
            .with_notification_sink(Box::new(sink))
            .build()
            .unwrap();
        let habit = service
            .create_habit(
                NewHabit::new("Stretch", "Did you stretch?", HabitKind::YesNo)
                    .with_reminder(Utc.with_ymd_and_hms(2025, 10, 24, 7, 30, 0).unwrap()),
            )
            .unwrap()
            .habit;
        assert_eq!(habit.notification_id.as_deref(), Some("notif-1"));

        let mut board = service.current_week();
        service.tap_day(&mut board, &habit.id, today()).unwrap();

        service.delete_habit(&habit.id).unwrap();
        assert_eq!(*cancelled.lock(), vec!["notif-1".to_string()]);
        assert!(service.habits().is_empty());
        assert_eq!(service.entries_for_habit(&habit.id).len(), 1);

        assert_eq!(service.purge_orphaned_entries().unwrap(), 1);
        assert!(service.entries_for_habit(&habit.id).is_empty());
    }

    #[test]
    fn rename_changes_only_the_name() {
        let service = service();
        let habit = yes_no(&service);
        let renamed = service.rename_habit(&habit.id, " Sit still ").unwrap();
        assert_eq!(renamed.name, "Sit still");
        assert_eq!(renamed.question_text, habit.question_text);
        assert!(matches!(
            service.rename_habit(&habit.id, ""),
            Err(HabitError::EmptyName)
        ));
        assert!(matches!(
            service.rename_habit("missing", "x"),
            Err(HabitError::HabitNotFound(_))
        ));
    }

    #[test]
    fn tap_toggles_and_upserts() {
        let service = service();
        let habit = yes_no(&service);
        let mut board = service.current_week();

        let first = service.tap_day(&mut board, &habit.id, today()).unwrap();
        assert_eq!(first.value, Some(EntryValue::Flag(true)));
        let second = service.tap_day(&mut board, &habit.id, today()).unwrap();
        assert_eq!(second.value, Some(EntryValue::Flag(false)));

        let stored = service.entries_for_habit(&habit.id);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value, Some(EntryValue::Flag(false)));
    }

    #[test]
    fn future_dates_are_rejected() {
        let service = service();
        let habit = yes_no(&service);
        let mut board = service.current_week();
        let tomorrow = today() + Duration::days(1);
        let err = service.tap_day(&mut board, &habit.id, tomorrow).unwrap_err();
        assert!(matches!(err, HabitError::FutureDate { .. }));
        assert!(board.entry(&habit.id, tomorrow).is_none());
        assert!(service.entries_for_habit(&habit.id).is_empty());
    }

    #[test]
    fn fill_in_values_and_clearing() {
        let service = service();
        let habit = service
            .create_habit(NewHabit::new("Pages", "How many pages?", HabitKind::FillIn))
            .unwrap()
            .habit;
        let mut board = service.current_week();

        assert!(matches!(
            service.tap_day(&mut board, &habit.id, today()),
            Err(HabitError::WrongKind { .. })
        ));

        let stored = service
            .record_value(&mut board, &habit.id, today(), " 12 ")
            .unwrap()
            .expect("entry stored");
        assert_eq!(stored.value, Some(EntryValue::Text("12".into())));

        assert!(service
            .record_value(&mut board, &habit.id, today(), "  ")
            .unwrap()
            .is_none());
        assert!(board.entry(&habit.id, today()).is_none());
        assert!(service.entries_for_habit(&habit.id).is_empty());
    }

    #[test]
    fn failed_write_reconciles_board_with_storage() {
        let store = Arc::new(FlakyStore::default());
        let service = service_with(store.clone());
        let habit = yes_no(&service);
        let mut board = service.current_week();

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = service.tap_day(&mut board, &habit.id, today()).unwrap_err();
        assert!(matches!(err, HabitError::Storage(_)));
        assert!(
            board.entry(&habit.id, today()).is_none(),
            "optimistic value must not survive a failed write"
        );
        assert_eq!(board.habits().len(), 1);
    }

    #[test]
    fn failed_write_and_read_rolls_back_cell() {
        let store = Arc::new(FlakyStore::default());
        let service = service_with(store.clone());
        let habit = yes_no(&service);
        let mut board = service.current_week();
        service.tap_day(&mut board, &habit.id, today()).unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        store.fail_reads.store(true, Ordering::SeqCst);
        assert!(service.clear_day(&mut board, &habit.id, today()).is_err());
        assert_eq!(
            board.entry(&habit.id, today()).and_then(|e| e.value.clone()),
            Some(EntryValue::Flag(true))
        );
    }

    #[test]
    fn read_failures_degrade_to_empty_results() {
        let store = Arc::new(FlakyStore::default());
        let service = service_with(store.clone());
        yes_no(&service);
        store.fail_reads.store(true, Ordering::SeqCst);
        assert!(service.habits().is_empty());
        assert_eq!(service.overall_report().total_habits, 0);
        assert!(service.current_week().habits().is_empty());
        assert!(service.needs_onboarding());
    }

    #[test]
    fn navigation_moves_board_and_clamps() {
        let service = service();
        let habit = yes_no(&service);
        let mut board = service.current_week();
        let last_week = today() - Duration::days(7);
        service.tap_day(&mut board, &habit.id, last_week).unwrap();
        assert!(board.entry(&habit.id, last_week).is_none(), "outside current window");

        service.navigate(&mut board, Direction::Prev);
        assert_eq!(board.window().end(), last_week);
        assert!(board.entry(&habit.id, last_week).is_some());

        service.navigate(&mut board, Direction::Next);
        assert_eq!(board.window().end(), today());
        service.navigate(&mut board, Direction::Next);
        assert_eq!(board.window().end(), today());
    }

    #[test]
    fn stats_and_report_flow_through_storage() {
        let service = service();
        let habit = service
            .create_habit(
                NewHabit::new("Walk", "Did you walk?", HabitKind::YesNo)
                    .with_frequency(HabitFrequency::Everyday),
            )
            .unwrap()
            .habit;
        let mut board = service.current_week();
        service.tap_day(&mut board, &habit.id, today()).unwrap();

        let stats = service.habit_stats(&habit.id);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.completion_rate, 100);
        assert_eq!(stats.motivation, Motivation::OnFire);

        let report = service.overall_report();
        assert_eq!(report.global_rate, 100);
        assert_eq!(report.best_label(), "Walk");

        let unknown = service.habit_stats("missing");
        assert_eq!(unknown.total_count, 0);
    }

    #[test]
    fn onboarding_flag_round_trip() {
        let service = service();
        assert!(service.needs_onboarding());
        service.complete_onboarding().unwrap();
        assert!(!service.needs_onboarding());
    }
}
