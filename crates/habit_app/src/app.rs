use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use habit_core::{
    calendar::Direction,
    notifications::LogNotificationSink,
    stats::{StatsOptions, DEFAULT_MAX_WINDOW_DAYS},
    store::DirectoryStore,
    HabitService,
};
use tracing::{debug, info};

use crate::render;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) data_dir: PathBuf,
    pub(crate) stats_max_days: i64,
    pub(crate) week_offset: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any variable source; unset or unparseable values
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup("HABIT_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir.trim());
            }
        }
        if let Some(days) = lookup("HABIT_STATS_MAX_DAYS") {
            if let Ok(value) = days.trim().parse::<i64>() {
                if value > 0 {
                    config.stats_max_days = value;
                }
            }
        }
        if let Some(offset) = lookup("HABIT_WEEK_OFFSET") {
            if let Ok(value) = offset.trim().parse::<u32>() {
                config.week_offset = value;
            }
        }
        debug!(?config, "configuration resolved");
        config
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".habits"),
            stats_max_days: DEFAULT_MAX_WINDOW_DAYS,
            week_offset: 0,
        }
    }
}

pub fn build_service(config: &AppConfig) -> Result<HabitService> {
    info!(path = %config.data_dir.display(), "opening habit store");
    let store = DirectoryStore::open(&config.data_dir)?;
    HabitService::builder()
        .with_store(Arc::new(store))
        .with_notification_sink(Box::new(LogNotificationSink))
        .with_stats_options(StatsOptions {
            max_window_days: config.stats_max_days,
        })
        .build()
        .context("failed to initialize habit service")
}

/// Renders the requested week, every habit's score card and the overall report.
pub fn run(config: AppConfig) -> Result<()> {
    let start = Instant::now();
    let service = build_service(&config)?;
    let mut out = io::stdout().lock();

    if service.needs_onboarding() {
        writeln!(out, "{}", render::WELCOME)?;
        if let Err(err) = service.complete_onboarding() {
            tracing::warn!(%err, "unable to record first launch");
        }
    }

    let mut board = service.current_week();
    for _ in 0..config.week_offset {
        service.navigate(&mut board, Direction::Prev);
    }
    writeln!(out, "{}", render::render_board(&board))?;

    for habit in board.habits() {
        let stats = service.habit_stats(&habit.id);
        writeln!(out, "{}", render::render_stats(habit, &stats))?;
    }

    writeln!(out, "{}", render::render_report(&service.overall_report()))?;
    info!(elapsed_ms = %start.elapsed().as_millis(), "render completed");
    Ok(())
}
