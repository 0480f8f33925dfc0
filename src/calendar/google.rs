//! Google Calendar v3 REST backend.
//!
//! Thin client over the `events` collection: insert, list, get, update,
//! delete. Authentication is a ready bearer token supplied by config or
//! environment; the OAuth handshake and token refresh live outside this
//! crate.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{BackendError, CalendarBackend, CalendarEvent, EventDraft};

/// Default REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Default calendar collection.
pub const DEFAULT_CALENDAR_ID: &str = "primary";

const MAX_ERROR_BODY_CHARS: usize = 256;

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// An event record in Google wire format.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GoogleEvent {
    /// Backend identifier.
    pub id: String,
    /// Event title.
    #[serde(default)]
    pub summary: String,
    /// Start time block.
    pub start: GoogleEventTime,
    /// End time block.
    pub end: GoogleEventTime,
    /// Location, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Description, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Link to the event in the Calendar UI.
    #[serde(rename = "htmlLink", skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

/// A start/end block in Google wire format.
///
/// Timed events carry `dateTime`; all-day events carry only `date` and
/// are skipped by this client since the pipeline operates on instants.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GoogleEventTime {
    /// RFC 3339 instant for timed events.
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// IANA zone name.
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Response body of the `events.list` call.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GoogleEventList {
    /// Matched events.
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
}

/// Convert a wire event into a [`CalendarEvent`].
///
/// # Errors
///
/// Returns `BackendError::Parse` when the event lacks `dateTime` fields
/// or they are not valid RFC 3339.
#[doc(hidden)]
pub fn parse_event(wire: GoogleEvent) -> Result<CalendarEvent, BackendError> {
    let start_raw = wire
        .start
        .date_time
        .ok_or_else(|| BackendError::Parse(format!("event {} has no start dateTime", wire.id)))?;
    let end_raw = wire
        .end
        .date_time
        .ok_or_else(|| BackendError::Parse(format!("event {} has no end dateTime", wire.id)))?;
    let start = DateTime::parse_from_rfc3339(&start_raw)
        .map_err(|e| BackendError::Parse(format!("bad start time {start_raw:?}: {e}")))?;
    let end = DateTime::parse_from_rfc3339(&end_raw)
        .map_err(|e| BackendError::Parse(format!("bad end time {end_raw:?}: {e}")))?;
    Ok(CalendarEvent {
        id: wire.id,
        summary: wire.summary,
        start,
        end,
        location: wire.location,
        description: wire.description,
        html_link: wire.html_link,
    })
}

/// Convert an `events.list` body, dropping all-day entries.
///
/// # Errors
///
/// Returns `BackendError::Parse` when the body is not the list schema.
#[doc(hidden)]
pub fn parse_event_list(body: &str) -> Result<Vec<CalendarEvent>, BackendError> {
    let list: GoogleEventList =
        serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;
    let mut events = Vec::with_capacity(list.items.len());
    for item in list.items {
        // All-day events have no dateTime; the matcher and mutator work
        // on instants, so they fall outside the candidate window.
        if item.start.date_time.is_none() {
            debug!(event_id = %item.id, "skipping all-day event");
            continue;
        }
        events.push(parse_event(item)?);
    }
    Ok(events)
}

fn truncate_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened: String = collapsed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        return format!("{shortened}...[truncated]");
    }
    collapsed
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Google Calendar v3 REST client.
#[derive(Debug, Clone)]
pub struct GoogleCalendar {
    base_url: String,
    calendar_id: String,
    token: String,
    client: reqwest::Client,
}

impl GoogleCalendar {
    /// Create a client for the given base URL, calendar, and bearer token.
    pub fn new(base_url: String, calendar_id: String, token: String) -> Self {
        Self {
            base_url,
            calendar_id,
            token,
            client: reqwest::Client::new(),
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url.trim_end_matches('/'),
            self.calendar_id
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{event_id}", self.events_url())
    }

    /// Check status and read the body, mapping failures to [`BackendError`].
    async fn read_response(
        &self,
        event_id: Option<&str>,
        response: reqwest::Response,
    ) -> Result<String, BackendError> {
        let status = response.status();
        let body = response.text().await?;
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = event_id {
                return Err(BackendError::NotFound(id.to_owned()));
            }
        }
        if !status.is_success() {
            return Err(BackendError::HttpStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    async fn insert(&self, draft: &EventDraft) -> Result<CalendarEvent, BackendError> {
        let body = json!({
            "summary": draft.summary,
            "location": draft.location.clone().unwrap_or_default(),
            "description": draft.description.clone().unwrap_or_default(),
            "start": {
                "dateTime": draft.start.to_rfc3339(),
                "timeZone": draft.timezone,
            },
            "end": {
                "dateTime": draft.end.to_rfc3339(),
                "timeZone": draft.timezone,
            },
        });
        let response = self
            .client
            .post(self.events_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let payload = self.read_response(None, response).await?;
        let wire: GoogleEvent =
            serde_json::from_str(&payload).map_err(|e| BackendError::Parse(e.to_string()))?;
        parse_event(wire)
    }

    async fn list_upcoming(
        &self,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, BackendError> {
        let response = self
            .client
            .get(self.events_url())
            .bearer_auth(&self.token)
            .query(&[
                (
                    "timeMin",
                    time_min.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                ("maxResults", max_results.to_string()),
                ("singleEvents", "true".to_owned()),
                ("orderBy", "startTime".to_owned()),
            ])
            .send()
            .await?;
        let payload = self.read_response(None, response).await?;
        parse_event_list(&payload)
    }

    async fn get(&self, event_id: &str) -> Result<CalendarEvent, BackendError> {
        let response = self
            .client
            .get(self.event_url(event_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let payload = self.read_response(Some(event_id), response).await?;
        let wire: GoogleEvent =
            serde_json::from_str(&payload).map_err(|e| BackendError::Parse(e.to_string()))?;
        parse_event(wire)
    }

    async fn update(
        &self,
        event_id: &str,
        event: &CalendarEvent,
    ) -> Result<CalendarEvent, BackendError> {
        let body = json!({
            "id": event.id,
            "summary": event.summary,
            "location": event.location.clone().unwrap_or_default(),
            "description": event.description.clone().unwrap_or_default(),
            "start": {"dateTime": event.start.to_rfc3339()},
            "end": {"dateTime": event.end.to_rfc3339()},
        });
        let response = self
            .client
            .put(self.event_url(event_id))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let payload = self.read_response(Some(event_id), response).await?;
        let wire: GoogleEvent =
            serde_json::from_str(&payload).map_err(|e| BackendError::Parse(e.to_string()))?;
        parse_event(wire)
    }

    async fn delete(&self, event_id: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.event_url(event_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        self.read_response(Some(event_id), response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_EVENT: &str = r#"{
        "id": "evt_1",
        "summary": "Team Standup",
        "htmlLink": "https://calendar.google.com/event?eid=evt_1",
        "start": {"dateTime": "2024-01-01T09:00:00-05:00", "timeZone": "America/New_York"},
        "end": {"dateTime": "2024-01-01T09:30:00-05:00", "timeZone": "America/New_York"}
    }"#;

    #[test]
    fn parses_timed_event() {
        let wire: GoogleEvent = serde_json::from_str(SAMPLE_EVENT).expect("wire");
        let event = parse_event(wire).expect("event");
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.summary, "Team Standup");
        assert_eq!(event.start.to_rfc3339(), "2024-01-01T09:00:00-05:00");
        assert!(event.html_link.is_some());
    }

    #[test]
    fn list_skips_all_day_events() {
        let body = format!(
            r#"{{"items": [{SAMPLE_EVENT}, {{
                "id": "evt_allday",
                "summary": "Holiday",
                "start": {{}},
                "end": {{}}
            }}]}}"#
        );
        let events = parse_event_list(&body).expect("list");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "evt_1");
    }

    #[test]
    fn list_with_no_items_is_empty() {
        let events = parse_event_list("{}").expect("list");
        assert!(events.is_empty());
    }

    #[test]
    fn bad_timestamp_is_a_parse_error() {
        let wire: GoogleEvent = serde_json::from_str(
            r#"{
                "id": "evt_2",
                "summary": "Broken",
                "start": {"dateTime": "not-a-time"},
                "end": {"dateTime": "2024-01-01T10:00:00Z"}
            }"#,
        )
        .expect("wire");
        assert!(matches!(parse_event(wire), Err(BackendError::Parse(_))));
    }

    #[test]
    fn event_urls_nest_under_the_calendar() {
        let backend = GoogleCalendar::new(
            "https://example.test/v3/".to_owned(),
            "primary".to_owned(),
            "token".to_owned(),
        );
        assert_eq!(
            backend.events_url(),
            "https://example.test/v3/calendars/primary/events"
        );
        assert_eq!(
            backend.event_url("evt_1"),
            "https://example.test/v3/calendars/primary/events/evt_1"
        );
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let long = "x".repeat(1000);
        let out = truncate_body(&long);
        assert!(out.ends_with("...[truncated]"));
        assert!(out.chars().count() < 300);
    }
}
