use std::fmt::Write;

use chrono::NaiveDate;
use habit_core::{board::WeekBoard, model::Habit, report::OverallReport, stats::HabitStats};

pub const WELCOME: &str = "Welcome to Habit Tracker\nBuild better habits, one day at a time.\n";

const NAME_WIDTH: usize = 16;
const CELL_WIDTH: usize = 5;

pub fn render_board(board: &WeekBoard) -> String {
    let today = board.today();
    let mut out = String::new();
    let _ = writeln!(out, "{}", format_week_heading(board.window().end(), today));

    let _ = write!(out, "{:<w$}", "", w = NAME_WIDTH);
    for date in board.dates() {
        let label = date.format("%a %d").to_string();
        let marker = if date == today { "*" } else { "" };
        let _ = write!(out, " {:>w$}", format!("{marker}{label}"), w = CELL_WIDTH + 2);
    }
    out.push('\n');

    if board.habits().is_empty() {
        out.push_str("No habits yet. Add one to get started.\n");
        return out;
    }

    for habit in board.habits() {
        let _ = write!(out, "{:<w$}", truncate(&habit.name, NAME_WIDTH), w = NAME_WIDTH);
        for date in board.dates() {
            let glyph = truncate(&board.cell(habit, date).glyph(), CELL_WIDTH + 2);
            let _ = write!(out, " {:>w$}", glyph, w = CELL_WIDTH + 2);
        }
        out.push('\n');
    }
    out
}

pub fn render_stats(habit: &Habit, stats: &HabitStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", habit.name, habit.kind);
    let _ = writeln!(out, "  {}", stats.message());
    let _ = writeln!(
        out,
        "  score {}%  streak {}  yes {}  no {}",
        stats.score, stats.current_streak, stats.yes_count, stats.no_count
    );
    if !habit.is_yes_no() {
        let numeric = &stats.numeric;
        let best_day = numeric
            .best_weekday
            .map(|day| day.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  total {}  avg {}  best {}  best day {}",
            numeric.total, numeric.average, numeric.best, best_day
        );
    }
    out
}

pub fn render_report(report: &OverallReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overall success {}%", report.global_rate);
    let _ = writeln!(
        out,
        "{} habits  best: {}  needs focus: {}",
        report.total_habits,
        report.best_label(),
        report.needs_focus_label()
    );
    for rate in &report.ranking {
        let _ = writeln!(
            out,
            "  {:<w$} {:>3}%",
            truncate(&rate.name, NAME_WIDTH),
            rate.rate,
            w = NAME_WIDTH
        );
    }
    out
}

pub fn format_week_heading(end: NaiveDate, today: NaiveDate) -> String {
    let calendar = end.format("%B %d, %Y");
    let relative = format_relative_label(end, today);
    format!("Week ending {relative} — {calendar}")
}

pub fn format_relative_label(date: NaiveDate, today: NaiveDate) -> String {
    let diff = date.signed_duration_since(today).num_days();
    match diff {
        -1 => "Yesterday".to_string(),
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        d if d < 0 => format!("{} days ago", -d),
        d => format!("In {} days", d),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
