//! Task domain model
//!
//! Only the schedule-relevant attributes live here. Dates are carried for
//! display; recomputing them is the job of an external scheduler.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::id::TaskId;

/// A schedulable task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Human-readable title
    pub title: String,

    /// Pinned by a user; automatic rescheduling must leave it alone
    #[serde(default)]
    pub scheduled_manually: bool,

    /// Planned start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Planned finish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates an automatically scheduled task without dates
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            scheduled_manually: false,
            start_date: None,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style variant of [`Task::set_manual`]
    pub fn manual(mut self, manual: bool) -> Self {
        self.scheduled_manually = manual;
        self
    }

    /// Pins or unpins the schedule. Returns true if the flag changed.
    pub fn set_manual(&mut self, manual: bool) -> bool {
        if self.scheduled_manually == manual {
            return false;
        }
        self.scheduled_manually = manual;
        self.updated_at = Utc::now();
        true
    }

    /// Replaces the planned dates
    pub fn set_dates(&mut self, start: Option<NaiveDate>, due: Option<NaiveDate>) {
        self.start_date = start;
        self.due_date = due;
        self.updated_at = Utc::now();
    }

    /// Formats the planned dates as `start..due` for display
    pub fn date_range(&self) -> String {
        let fmt = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "?".into());
        if self.start_date.is_none() && self.due_date.is_none() {
            return "-".to_string();
        }
        format!("{}..{}", fmt(self.start_date), fmt(self.due_date))
    }
}
