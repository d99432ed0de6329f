use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Format used for entry dates in storage and for window keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum HabitKind {
    YesNo,
    FillIn,
}

impl fmt::Display for HabitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HabitKind::YesNo => f.write_str("yes-no"),
            HabitKind::FillIn => f.write_str("fill-in"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HabitFrequency {
    Everyday,
    Weekly,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub question_text: String,
    #[serde(rename = "type")]
    pub kind: HabitKind,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<HabitFrequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
}

impl Habit {
    /// Local calendar day the habit was created on.
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.with_timezone(&Local).date_naive()
    }

    /// Days without an entry count as missed only for daily habits.
    pub fn infers_missed_days(&self) -> bool {
        matches!(self.frequency, None | Some(HabitFrequency::Everyday))
    }

    pub fn is_yes_no(&self) -> bool {
        self.kind == HabitKind::YesNo
    }

    /// Local wall-clock time of the daily reminder, if one is configured.
    pub fn reminder_clock_time(&self) -> Option<NaiveTime> {
        self.reminder_time.map(|at| {
            let local = at.with_timezone(&Local);
            NaiveTime::from_hms_opt(local.hour(), local.minute(), 0).unwrap_or(NaiveTime::MIN)
        })
    }
}

/// Input for habit creation, before an id and timestamp are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHabit {
    pub name: String,
    pub question_text: String,
    pub kind: HabitKind,
    pub frequency: Option<HabitFrequency>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

impl NewHabit {
    pub fn new(name: impl Into<String>, question_text: impl Into<String>, kind: HabitKind) -> Self {
        Self {
            name: name.into(),
            question_text: question_text.into(),
            kind,
            frequency: None,
            reminder_time: None,
            description: None,
        }
    }

    pub fn with_frequency(mut self, frequency: HabitFrequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn with_reminder(mut self, at: DateTime<Utc>) -> Self {
        self.reminder_time = Some(at);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A logged value. Untagged so the stored JSON stays `true`, `12` or `"12"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EntryValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl EntryValue {
    /// `Some(true)` for a completed day, `Some(false)` for an explicit "no",
    /// `None` when the record carries nothing classifiable.
    pub fn outcome(&self) -> Option<bool> {
        match self {
            EntryValue::Flag(flag) => Some(*flag),
            EntryValue::Number(_) => Some(true),
            EntryValue::Text(text) if text.is_empty() => None,
            EntryValue::Text(_) => Some(true),
        }
    }

    /// Numeric reading of the value. Text is read up to the end of its leading
    /// number, so `"3 pages"` reads as `3`; booleans and text without a leading
    /// number yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        let parsed = match self {
            EntryValue::Flag(_) => return None,
            EntryValue::Number(value) => *value,
            EntryValue::Text(text) => leading_number(text)?,
        };
        parsed.is_finite().then_some(parsed)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            EntryValue::Flag(flag) => *flag,
            EntryValue::Number(value) => *value != 0.0 && !value.is_nan(),
            EntryValue::Text(text) => !text.is_empty(),
        }
    }
}

impl fmt::Display for EntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryValue::Flag(true) => f.write_str("Yes"),
            EntryValue::Flag(false) => f.write_str("No"),
            EntryValue::Number(value) => write!(f, "{value}"),
            EntryValue::Text(text) => f.write_str(text),
        }
    }
}

/// Parses the longest decimal prefix of `text` after leading whitespace:
/// optional sign, digits with at most one `.`, optional exponent.
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |mut at: usize| {
        while bytes.get(at).is_some_and(u8::is_ascii_digit) {
            at += 1;
        }
        at
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - end - 1;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    text[..end].parse::<f64>().ok()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub habit_id: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<EntryValue>,
}

impl Entry {
    pub fn new(habit_id: impl Into<String>, date: NaiveDate, value: EntryValue) -> Self {
        Self {
            habit_id: habit_id.into(),
            date,
            value: Some(value),
        }
    }

    pub fn same_key(&self, other: &Entry) -> bool {
        self.habit_id == other.habit_id && self.date == other.date
    }

    pub fn date_key(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}
