use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use crate::error::ValidationError;
use crate::task::{Priority, Task, TaskDraft};

pub const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Priority,
    Date,
    Time,
}

impl Field {
    pub const ORDER: [Field; 5] = [
        Field::Title,
        Field::Description,
        Field::Priority,
        Field::Date,
        Field::Time,
    ];

    pub fn next(self) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Description => "Description",
            Field::Priority => "Priority",
            Field::Date => "Date (YYYY-MM-DD)",
            Field::Time => "Time (HH:MM)",
        }
    }
}

/// Raw input of the add/edit screen. Date and time are typed separately
/// and only combined on submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub date: String,
    pub time: String,
    /// Deadline of the task being edited; its seconds survive the edit.
    base: Option<DateTime<Utc>>,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            priority: Some(Priority::Media),
            date: String::new(),
            time: String::new(),
            base: None,
        }
    }
}

impl TaskForm {
    pub fn for_task(task: &Task) -> Self {
        let local = task.deadline.map(|d| d.with_timezone(&Local));
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: Some(task.priority.unwrap_or(Priority::Media)),
            date: local
                .map(|d| d.format(DATE_FORMATS[0]).to_string())
                .unwrap_or_default(),
            time: local
                .map(|d| d.format(TIME_FORMAT).to_string())
                .unwrap_or_default(),
            base: task.deadline,
        }
    }

    pub fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Title => Some(&mut self.title),
            Field::Description => Some(&mut self.description),
            Field::Date => Some(&mut self.date),
            Field::Time => Some(&mut self.time),
            Field::Priority => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn time(&self) -> Option<NaiveTime> {
        parse_time(&self.time)
    }

    /// Entered deadline. When editing, the seconds of the old deadline are
    /// carried over, so untouched date and time fields give it back as-is.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let deadline = combine_deadline(self.date()?, self.time()?)?;
        match self.base {
            Some(base) => {
                let base = base.with_timezone(&Local);
                let carried = Duration::seconds(i64::from(base.second()))
                    + Duration::nanoseconds(i64::from(base.nanosecond()));
                deadline.checked_add_signed(carried)
            }
            None => Some(deadline),
        }
    }

    pub fn submit(&self) -> Result<TaskDraft, ValidationError> {
        let title = self.title.trim();
        let (Some(priority), Some(deadline)) = (self.priority, self.deadline()) else {
            return Err(ValidationError::MissingRequiredField);
        };
        if title.is_empty() {
            return Err(ValidationError::MissingRequiredField);
        }
        Ok(TaskDraft {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            priority,
            deadline,
        })
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).ok()
}

/// Calendar day of `date` at the hour and minute of `time`, local time.
pub fn combine_deadline(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0)?;
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|d| d.with_timezone(&Utc))
}
