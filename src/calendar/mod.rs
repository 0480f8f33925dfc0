//! Calendar backend abstraction.
//!
//! Defines the event types shared across the pipeline and the
//! [`CalendarBackend`] trait every backend implements. One backend is
//! implemented: [`google::GoogleCalendar`], the Calendar v3 REST API.
//!
//! The pipeline only reads events and requests mutations; event lifetime
//! is owned entirely by the backend and nothing is cached across requests.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod google;

/// Errors returned by calendar backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport failure.
    #[error("calendar request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match the expected schema.
    #[error("calendar response parse error: {0}")]
    Parse(String),
    /// Upstream responded with an error status.
    #[error("calendar backend returned status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// No event exists under the requested identifier.
    #[error("no event with id {0}")]
    NotFound(String),
}

/// A calendar entry owned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Backend-assigned identifier.
    pub id: String,
    /// Event title.
    pub summary: String,
    /// Start instant with its offset.
    pub start: DateTime<FixedOffset>,
    /// End instant with its offset.
    pub end: DateTime<FixedOffset>,
    /// Where the event takes place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Free-text details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Link to the event in the backend's UI, when provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

/// Extracted, not-yet-persisted parameters for a create or reschedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Event title.
    pub summary: String,
    /// Start instant with its offset.
    pub start: DateTime<FixedOffset>,
    /// End instant with its offset. Invariant: strictly after `start`.
    pub end: DateTime<FixedOffset>,
    /// Optional location.
    pub location: Option<String>,
    /// Optional free-text details.
    pub description: Option<String>,
    /// IANA time zone name attached to both instants on insert.
    pub timezone: String,
}

impl EventDraft {
    /// Event length in seconds: (end - start). Stable across a reschedule.
    pub fn duration_seconds(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_seconds()
    }
}

/// Calendar backend interface.
///
/// Implementations must be `Send + Sync`: concurrent requests share one
/// client behind an `Arc`.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Insert a new event and return the created record.
    async fn insert(&self, draft: &EventDraft) -> Result<CalendarEvent, BackendError>;

    /// List up to `max_results` upcoming single (non-recurring) events
    /// starting from `time_min`, ordered by start time ascending.
    async fn list_upcoming(
        &self,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, BackendError>;

    /// Fetch one event by id.
    async fn get(&self, event_id: &str) -> Result<CalendarEvent, BackendError>;

    /// Replace an existing event.
    async fn update(
        &self,
        event_id: &str,
        event: &CalendarEvent,
    ) -> Result<CalendarEvent, BackendError>;

    /// Delete an event by id.
    async fn delete(&self, event_id: &str) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(start: &str, end: &str) -> EventDraft {
        EventDraft {
            summary: "Standup".to_owned(),
            start: DateTime::parse_from_rfc3339(start).expect("start"),
            end: DateTime::parse_from_rfc3339(end).expect("end"),
            location: None,
            description: None,
            timezone: "America/New_York".to_owned(),
        }
    }

    #[test]
    fn duration_is_end_minus_start_in_seconds() {
        let d = draft("2024-01-01T09:00:00-05:00", "2024-01-01T09:30:00-05:00");
        assert_eq!(d.duration_seconds(), 1800);
    }

    #[test]
    fn duration_spans_offsets_correctly() {
        // Same instant expressed in two offsets still yields wall-clock
        // duration between the instants.
        let d = draft("2024-01-01T09:00:00-05:00", "2024-01-01T15:00:00+00:00");
        assert_eq!(d.duration_seconds(), 3600);
    }

    #[test]
    fn event_serializes_without_empty_optionals() {
        let event = CalendarEvent {
            id: "abc".to_owned(),
            summary: "Standup".to_owned(),
            start: DateTime::parse_from_rfc3339("2024-01-01T09:00:00-05:00").expect("start"),
            end: DateTime::parse_from_rfc3339("2024-01-01T09:30:00-05:00").expect("end"),
            location: None,
            description: None,
            html_link: None,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(!json.contains("location"));
        assert!(!json.contains("html_link"));
    }
}
