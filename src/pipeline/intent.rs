//! The closed intent set and its single mapping boundary.
//!
//! Classification text from the completion service is free-form; it is
//! mapped into [`Intent`] exactly once, here. Everything downstream
//! branches on the enum, never on strings.

use serde::{Deserialize, Serialize};

/// The calendar operation a query requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Create a new calendar event.
    CreateEvent,
    /// Show one event, resolved by name.
    ViewEvent,
    /// List the upcoming-events window.
    ViewEvents,
    /// Delete an event, resolved by name.
    DeleteEvent,
    /// Move an existing event to new times.
    RescheduleEvent,
    /// Recommend which upcoming event to keep and which to cancel.
    ChoiceEvent,
}

impl Intent {
    /// Map raw classification text into the intent set.
    ///
    /// The text is trimmed and lower-cased before the verbatim match.
    /// Anything outside the set returns `None`; the dispatcher routes
    /// that to the unsupported branch without further calls.
    pub fn parse(classification: &str) -> Option<Self> {
        match classification.trim().to_lowercase().as_str() {
            "create_event" => Some(Self::CreateEvent),
            "view_event" => Some(Self::ViewEvent),
            "view_events" => Some(Self::ViewEvents),
            "delete_event" => Some(Self::DeleteEvent),
            "reschedule_event" => Some(Self::RescheduleEvent),
            "choice_event" => Some(Self::ChoiceEvent),
            _ => None,
        }
    }

    /// Wire name used in results and streamed units.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateEvent => "create_event",
            Self::ViewEvent => "view_event",
            Self::ViewEvents => "view_events",
            Self::DeleteEvent => "delete_event",
            Self::RescheduleEvent => "reschedule_event",
            Self::ChoiceEvent => "choice_event",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_intent() {
        assert_eq!(Intent::parse("create_event"), Some(Intent::CreateEvent));
        assert_eq!(Intent::parse("view_event"), Some(Intent::ViewEvent));
        assert_eq!(Intent::parse("view_events"), Some(Intent::ViewEvents));
        assert_eq!(Intent::parse("delete_event"), Some(Intent::DeleteEvent));
        assert_eq!(
            Intent::parse("reschedule_event"),
            Some(Intent::RescheduleEvent)
        );
        assert_eq!(Intent::parse("choice_event"), Some(Intent::ChoiceEvent));
    }

    #[test]
    fn parse_is_case_insensitive_and_trimmed() {
        assert_eq!(Intent::parse("Create_Event  \n"), Some(Intent::CreateEvent));
        assert_eq!(Intent::parse("  VIEW_EVENTS"), Some(Intent::ViewEvents));
    }

    #[test]
    fn unknown_text_maps_to_none() {
        assert_eq!(Intent::parse("snooze_event"), None);
        assert_eq!(Intent::parse(""), None);
        assert_eq!(Intent::parse("create event"), None);
    }

    #[test]
    fn round_trips_through_wire_name() {
        for intent in [
            Intent::CreateEvent,
            Intent::ViewEvent,
            Intent::ViewEvents,
            Intent::DeleteEvent,
            Intent::RescheduleEvent,
            Intent::ChoiceEvent,
        ] {
            assert_eq!(Intent::parse(intent.as_str()), Some(intent));
        }
    }
}
