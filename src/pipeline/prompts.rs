//! Prompt templates for the completion service.
//!
//! One template per intent, each with exactly one worked example so the
//! model reproduces the JSON contract shape. The extractor owns parsing;
//! this module owns the text.

use crate::calendar::CalendarEvent;

/// Classification prompt: the query plus the closed intent list.
pub fn classification_prompt(query: &str) -> String {
    format!(
        "\
{query}

The following is an action to be taken in a calendar.
Classify it as one of the following:

1. create_event
2. view_event
3. view_events
4. delete_event
5. reschedule_event
6. choice_event

Classification:
"
    )
}

/// Create-event prompt: full six-key JSON contract with one worked example.
///
/// `date` is the current UTC instant in RFC 3339; `user_timezone` is the
/// caller's IANA zone name.
pub fn create_event_prompt(query: &str, date: &str, user_timezone: &str) -> String {
    format!(
        "\
Date format: YYYY-MM-DDThh:mm:ss+00:00
Based on this event description: 'Joey birthday tomorrow at 7 pm', output a json of the
following parameters:
Today's datetime on UTC time 2021-05-02T10:00:00+00:00 and timezone of the user
America/New_York, take into account the timezone of the user and today's date.

1. event_summary
2. event_start_time
3. event_end_time
4. event_location
5. event_description
6. user_timezone

event_summary:
{{
    \"event_summary\": \"Joey birthday\",
    \"event_start_time\": \"2021-05-03T19:00:00-05:00\",
    \"event_end_time\": \"2021-05-03T20:00:00-05:00\",
    \"event_location\": \"\",
    \"event_description\": \"\",
    \"user_timezone\": \"America/New_York\"
}}

Date format: YYYY-MM-DDThh:mm:ss+00:00
Based on this event description: '{query}', output a json of the
following parameters:
Today's datetime on UTC time {date} and timezone of the user {user_timezone},
take into account the timezone of the user and today's date.

1. event_summary
2. event_start_time
3. event_end_time
4. event_location
5. event_description
6. user_timezone

event_summary:
"
    )
}

/// Target-name prompt: single-key JSON contract naming the referenced event.
///
/// Shared by the delete, view-one, and reschedule branches to pull the
/// event reference out of the query.
pub fn event_name_prompt(query: &str) -> String {
    format!(
        "\
Based on this event description: 'Remove meeting with Joona', output a json of the
following parameters:

1. event_summary

event_summary:
{{
    \"event_summary\": \"meeting with Joona\"
}}

Based on this event description: '{query}', output a json of the
following parameters:

1. event_summary

event_summary:
"
    )
}

/// Reschedule prompt: six-key contract plus the prior event's schedule.
///
/// The prior duration is spelled out so the model keeps it when the
/// request only moves the start.
pub fn reschedule_event_prompt(
    query: &str,
    date: &str,
    user_timezone: &str,
    prior: &CalendarEvent,
    prior_duration_seconds: i64,
) -> String {
    let prior_description = prior.description.clone().unwrap_or_default();
    format!(
        "\
Date format: YYYY-MM-DDThh:mm:ss+00:00
The event 'Team sync' currently starts at 2021-05-03T15:00:00-05:00 and ends at
2021-05-03T15:30:00-05:00 (duration 1800 seconds). Description: ''.
Based on this reschedule request: 'move team sync to Friday at 10am', output a json of
the following parameters:
Today's datetime on UTC time 2021-05-02T10:00:00+00:00 and timezone of the user
America/New_York. Keep the original duration unless the request changes it.

1. event_summary
2. event_start_time
3. event_end_time
4. event_location
5. event_description
6. user_timezone

event_summary:
{{
    \"event_summary\": \"Team sync\",
    \"event_start_time\": \"2021-05-07T10:00:00-05:00\",
    \"event_end_time\": \"2021-05-07T10:30:00-05:00\",
    \"event_location\": \"\",
    \"event_description\": \"\",
    \"user_timezone\": \"America/New_York\"
}}

Date format: YYYY-MM-DDThh:mm:ss+00:00
The event '{summary}' currently starts at {start} and ends at {end} (duration
{duration} seconds). Description: '{description}'.
Based on this reschedule request: '{query}', output a json of the following parameters:
Today's datetime on UTC time {date} and timezone of the user {user_timezone}.
Keep the original duration unless the request changes it.

1. event_summary
2. event_start_time
3. event_end_time
4. event_location
5. event_description
6. user_timezone

event_summary:
",
        summary = prior.summary,
        start = prior.start.to_rfc3339(),
        end = prior.end.to_rfc3339(),
        duration = prior_duration_seconds,
        description = prior_description,
    )
}

/// Description-synthesis prompt for the create branch's second call.
pub fn describe_event_prompt(query: &str) -> String {
    format!(
        "\
Based on this event request: 'Dinner with Sarah at 8pm downtown', write a one-sentence,
friendly calendar description of the event.

Description:
Dinner downtown with Sarah, an evening to catch up over good food.

Based on this event request: '{query}', write a one-sentence, friendly calendar
description of the event.

Description:
"
    )
}

/// Choice prompt: the rendered upcoming window plus the recommendation ask.
pub fn choice_event_prompt(query: &str, rendered_events: &str) -> String {
    format!(
        "\
These are the upcoming calendar events:

{rendered_events}

The user asked: '{query}'.
Recommend exactly one event to keep and one event to cancel, each with a short reason.

Recommendation:
"
    )
}
