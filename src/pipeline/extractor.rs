//! Parameter extraction: completion calls + JSON-contract parsing.
//!
//! Each intent gets one completion call against its template from
//! [`super::prompts`]; the raw text is trimmed and parsed against a
//! fixed key set. A malformed response fails only the current request,
//! and no completion call is ever retried.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use thiserror::Error;

use crate::calendar::{CalendarEvent, EventDraft};
use crate::providers::{CompletionProvider, ProviderError};

use super::prompts;
use super::RequestContext;

/// Extraction failures, recovered at the branch boundary.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Completion output was not the expected JSON contract.
    #[error("malformed completion: {0}")]
    MalformedCompletion(String),
    /// The completion call itself failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Builds prompts, calls the completion service, parses the contracts.
pub struct ParameterExtractor {
    provider: Arc<dyn CompletionProvider>,
}

impl ParameterExtractor {
    /// Create an extractor over the given completion provider.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Classify the query; returns the completion text trimmed and
    /// lower-cased, ready for the intent boundary.
    pub async fn classify(
        &self,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<String, ExtractError> {
        let prompt = prompts::classification_prompt(query);
        let raw = self.provider.complete(&prompt, ctx.temperature).await?;
        Ok(raw.trim().to_lowercase())
    }

    /// Extract a full [`EventDraft`] for the create branch.
    pub async fn create_draft(
        &self,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<EventDraft, ExtractError> {
        let prompt =
            prompts::create_event_prompt(query, &prompt_date(ctx), &ctx.user_timezone);
        let raw = self.provider.complete(&prompt, ctx.temperature).await?;
        parse_draft_json(&raw)
    }

    /// Synthesize a human-flavored description for the create branch.
    ///
    /// Independent of [`Self::create_draft`]; callers treat a failure
    /// here as "no description" rather than aborting the creation.
    pub async fn describe(
        &self,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<String, ExtractError> {
        let prompt = prompts::describe_event_prompt(query);
        let raw = self.provider.complete(&prompt, ctx.temperature).await?;
        Ok(raw.trim().to_owned())
    }

    /// Extract the name of the event a query refers to.
    pub async fn target_event_name(
        &self,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<String, ExtractError> {
        let prompt = prompts::event_name_prompt(query);
        let raw = self.provider.complete(&prompt, ctx.temperature).await?;
        parse_event_name_json(&raw)
    }

    /// Extract the new schedule for a resolved event being rescheduled.
    pub async fn reschedule_draft(
        &self,
        query: &str,
        prior: &CalendarEvent,
        ctx: &RequestContext,
    ) -> Result<EventDraft, ExtractError> {
        let duration = prior.end.signed_duration_since(prior.start).num_seconds();
        let prompt = prompts::reschedule_event_prompt(
            query,
            &prompt_date(ctx),
            &ctx.user_timezone,
            prior,
            duration,
        );
        let raw = self.provider.complete(&prompt, ctx.temperature).await?;
        parse_draft_json(&raw)
    }

    /// Ask for a keep/cancel recommendation over the rendered window.
    pub async fn choose(
        &self,
        query: &str,
        rendered_events: &str,
        ctx: &RequestContext,
    ) -> Result<String, ExtractError> {
        let prompt = prompts::choice_event_prompt(query, rendered_events);
        let raw = self.provider.complete(&prompt, ctx.temperature).await?;
        Ok(raw.trim().to_owned())
    }
}

fn prompt_date(ctx: &RequestContext) -> String {
    ctx.now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ---------------------------------------------------------------------------
// Contract parsing
// ---------------------------------------------------------------------------

fn parse_json_object(raw: &str) -> Result<serde_json::Value, ExtractError> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|e| ExtractError::MalformedCompletion(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(ExtractError::MalformedCompletion(
            "completion is not a JSON object".to_owned(),
        ));
    }
    Ok(value)
}

fn required_str(value: &serde_json::Value, key: &str) -> Result<String, ExtractError> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or_else(|| ExtractError::MalformedCompletion(format!("missing key {key:?}")))
}

fn required_datetime(
    value: &serde_json::Value,
    key: &str,
) -> Result<DateTime<FixedOffset>, ExtractError> {
    let raw = required_str(value, key)?;
    DateTime::parse_from_rfc3339(&raw).map_err(|e| {
        ExtractError::MalformedCompletion(format!("key {key:?} is not RFC 3339 ({raw:?}): {e}"))
    })
}

fn empty_to_none(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse the six-key create/reschedule contract into a draft.
fn parse_draft_json(raw: &str) -> Result<EventDraft, ExtractError> {
    let value = parse_json_object(raw)?;
    let summary = required_str(&value, "event_summary")?;
    let start = required_datetime(&value, "event_start_time")?;
    let end = required_datetime(&value, "event_end_time")?;
    let location = empty_to_none(required_str(&value, "event_location")?);
    let description = empty_to_none(required_str(&value, "event_description")?);
    let timezone = required_str(&value, "user_timezone")?;

    if start >= end {
        return Err(ExtractError::MalformedCompletion(format!(
            "event start {start} does not precede end {end}"
        )));
    }

    Ok(EventDraft {
        summary,
        start,
        end,
        location,
        description,
        timezone,
    })
}

/// Parse the single-key target-name contract.
fn parse_event_name_json(raw: &str) -> Result<String, ExtractError> {
    let value = parse_json_object(raw)?;
    required_str(&value, "event_summary")
}
