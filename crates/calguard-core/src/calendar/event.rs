use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, CalendarResult};

/// A calendar event as seen by providers.
///
/// `start` and `end` are ISO 8601 strings: dates (`2024-05-01`) for all-day
/// events, date-times otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: String,
    pub end: String,
    pub all_day: bool,
}

impl CalendarEvent {
    pub fn new(summary: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            id: None,
            summary: summary.into(),
            description: None,
            location: None,
            start: start.into(),
            end: end.into(),
            all_day: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn all_day(mut self) -> Self {
        self.all_day = true;
        self
    }

    /// Check the fields every provider requires.
    pub fn validate(&self) -> CalendarResult<()> {
        if self.summary.trim().is_empty() {
            return Err(CalendarError::invalid("event summary is required"));
        }
        if self.start.trim().is_empty() {
            return Err(CalendarError::invalid("event start is required"));
        }
        if self.end.trim().is_empty() {
            return Err(CalendarError::invalid("event end is required"));
        }
        if self.end < self.start {
            return Err(CalendarError::invalid(format!(
                "event ends before it starts ({} < {})",
                self.end, self.start
            )));
        }
        Ok(())
    }

    /// True if the event overlaps the half-open range `[start, end)`.
    pub fn overlaps(&self, start: &str, end: &str) -> bool {
        self.start.as_str() < end && self.end.as_str() > start
    }
}
