//! Calendar mutations and their human-readable confirmations.
//!
//! Translates extracted drafts into backend calls. The create path folds
//! backend failure into the returned string; the other paths return the
//! error so the dispatcher can word the response per branch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::calendar::{BackendError, CalendarBackend, CalendarEvent, EventDraft};

/// Message used whenever the upcoming window is empty.
pub const NO_UPCOMING_EVENTS: &str = "No upcoming events found.";

/// Executes calendar mutations for the dispatcher.
pub struct CalendarMutator {
    backend: Arc<dyn CalendarBackend>,
}

impl CalendarMutator {
    /// Create a mutator over the given backend.
    pub fn new(backend: Arc<dyn CalendarBackend>) -> Self {
        Self { backend }
    }

    /// Insert the draft and return a confirmation string.
    ///
    /// A backend failure is folded into the string rather than returned;
    /// callers checking for success must look for the error sentinel.
    pub async fn create(&self, draft: &EventDraft) -> String {
        match self.backend.insert(draft).await {
            Ok(event) => format!(
                "Created \"{}\" starting {}.",
                event.summary,
                format_start(&event)
            ),
            Err(e) => {
                warn!(error = %e, summary = %draft.summary, "event insert failed");
                format!("An error occurred: {e}")
            }
        }
    }

    /// Move a resolved event onto the draft's schedule.
    ///
    /// Fetches the current record, rewrites start/end (and summary and
    /// description when the draft carries them), and updates in place.
    pub async fn reschedule(
        &self,
        event_id: &str,
        draft: &EventDraft,
    ) -> Result<CalendarEvent, BackendError> {
        let mut event = self.backend.get(event_id).await?;
        event.start = draft.start;
        event.end = draft.end;
        if !draft.summary.trim().is_empty() {
            event.summary = draft.summary.clone();
        }
        if let Some(description) = &draft.description {
            event.description = Some(description.clone());
        }
        self.backend.update(event_id, &event).await
    }

    /// Delete a resolved event by id.
    pub async fn delete(&self, event_id: &str) -> Result<(), BackendError> {
        self.backend.delete(event_id).await
    }

    /// Fetch the upcoming window, ordered by start time.
    pub async fn list_upcoming(
        &self,
        now: DateTime<Utc>,
        window: u32,
    ) -> Result<Vec<CalendarEvent>, BackendError> {
        self.backend.list_upcoming(now, window).await
    }
}

/// Render an upcoming window for display, one line per event.
pub fn render_events(events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return NO_UPCOMING_EVENTS.to_owned();
    }
    events
        .iter()
        .map(|event| format!("{} {}", event.start.format("%Y-%m-%d %H:%M"), event.summary))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render one event's details for display.
pub fn render_event(event: &CalendarEvent) -> String {
    let mut lines = vec![
        format!("Summary: {}", event.summary),
        format!("Starts: {}", format_start(event)),
        format!("Ends: {}", event.end.format("%Y-%m-%d %H:%M")),
    ];
    if let Some(location) = &event.location {
        lines.push(format!("Location: {location}"));
    }
    if let Some(description) = &event.description {
        lines.push(format!("Description: {description}"));
    }
    lines.join("\n")
}

fn format_start(event: &CalendarEvent) -> String {
    event.start.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn event(id: &str, summary: &str, start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.to_owned(),
            summary: summary.to_owned(),
            start: DateTime::parse_from_rfc3339(start).expect("start"),
            end: DateTime::parse_from_rfc3339(end).expect("end"),
            location: None,
            description: None,
            html_link: None,
        }
    }

    #[test]
    fn empty_window_renders_the_no_events_message() {
        assert_eq!(render_events(&[]), NO_UPCOMING_EVENTS);
    }

    #[test]
    fn window_renders_one_line_per_event() {
        let events = vec![
            event(
                "a",
                "Standup",
                "2024-06-03T09:00:00-04:00",
                "2024-06-03T09:15:00-04:00",
            ),
            event(
                "b",
                "Retro",
                "2024-06-03T16:00:00-04:00",
                "2024-06-03T17:00:00-04:00",
            ),
        ];
        let rendered = render_events(&events);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "2024-06-03 09:00 Standup");
        assert_eq!(lines[1], "2024-06-03 16:00 Retro");
    }

    #[test]
    fn single_event_rendering_includes_optionals_when_set() {
        let mut e = event(
            "a",
            "Dinner",
            "2024-06-03T19:00:00-04:00",
            "2024-06-03T21:00:00-04:00",
        );
        e.location = Some("Osteria".to_owned());
        let rendered = render_event(&e);
        assert!(rendered.contains("Summary: Dinner"));
        assert!(rendered.contains("Location: Osteria"));
        assert!(!rendered.contains("Description:"));
    }
}
