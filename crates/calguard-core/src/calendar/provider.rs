use std::fmt;

use crate::error::CalendarResult;

use super::CalendarEvent;

/// Provider operations, used as names for instrumentation and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    ListEvents,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    GetEvent,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::ListEvents,
        Operation::CreateEvent,
        Operation::UpdateEvent,
        Operation::DeleteEvent,
        Operation::GetEvent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ListEvents => "list_events",
            Operation::CreateEvent => "create_event",
            Operation::UpdateEvent => "update_event",
            Operation::DeleteEvent => "delete_event",
            Operation::GetEvent => "get_event",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRUD capability of a calendar backend.
///
/// Implementations map their transport failures into
/// [`crate::error::CalendarError`] so the retry layer can classify them.
pub trait CalendarProvider: Send + Sync {
    /// Events overlapping `[start, end)`, ordered by start time.
    fn list_events(&self, start: &str, end: &str) -> CalendarResult<Vec<CalendarEvent>>;

    /// Create `event`; the returned copy carries the assigned id.
    fn create_event(&self, event: &CalendarEvent) -> CalendarResult<CalendarEvent>;

    fn update_event(&self, id: &str, event: &CalendarEvent) -> CalendarResult<CalendarEvent>;

    fn delete_event(&self, id: &str) -> CalendarResult<()>;

    /// `Ok(None)` when the event does not exist.
    fn get_event(&self, id: &str) -> CalendarResult<Option<CalendarEvent>>;
}
