//! The dispatch pipeline: classify, route, extract, resolve, mutate.
//!
//! Every request moves through `Classifying` first, then exactly one of
//! the intent branches, then `Done`. Unrecognized classification text
//! short-circuits to the unsupported outcome without any extraction or
//! backend call: the classification step returns free text, so defensive
//! routing at this single boundary keeps string matching out of the rest
//! of the pipeline.
//!
//! Two execution modes share the branch logic: batch ([`Dispatcher::run`])
//! returns one [`PipelineResult`]; streaming
//! ([`Dispatcher::run_streaming`]) emits the classification as soon as it
//! is known, then the branch response as the second and final unit.

pub mod extractor;
pub mod intent;
pub mod matcher;
pub mod mutator;
pub mod prompts;
pub mod resolver;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calendar::{BackendError, CalendarBackend, CalendarEvent};
use crate::providers::CompletionProvider;
use crate::stream::ResponseSink;

use extractor::{ExtractError, ParameterExtractor};
use intent::Intent;
use mutator::{render_event, render_events, CalendarMutator, NO_UPCOMING_EVENTS};
use resolver::{EventResolver, ResolveError, MATCH_WINDOW};

/// Classification tag for unsupported or failed requests.
pub const CLASSIFICATION_ERROR: &str = "error";

const QUERY_LOG_MAX_CHARS: usize = 80;

/// Immutable per-request context, constructed once at dispatch and passed
/// by reference into each component.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Current UTC instant used for prompt dates and the listing window.
    pub now: DateTime<Utc>,
    /// Caller's IANA time zone name.
    pub user_timezone: String,
    /// Sampling temperature forwarded into every completion call of the
    /// request.
    pub temperature: f32,
}

impl RequestContext {
    /// Context starting now, with the temperature clamped into `[0, 1]`.
    pub fn new(user_timezone: impl Into<String>, temperature: f32) -> Self {
        Self {
            now: Utc::now(),
            user_timezone: user_timezone.into(),
            temperature: temperature.clamp(0.0, 1.0),
        }
    }
}

/// Branch-level failures.
///
/// All variants are recovered at the dispatch boundary into a
/// user-visible string; none crosses the pipeline edge as a fault.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Classification text outside the known intent set.
    #[error("{0} is not implemented")]
    ClassificationUnsupported(String),
    /// Completion output failed its JSON contract.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// No calendar entry matched confidently.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Calendar backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Externally visible body of a pipeline response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Prose, confirmation, or error text.
    Text(String),
    /// A single resolved event.
    Event(CalendarEvent),
    /// The upcoming-events window.
    Events(Vec<CalendarEvent>),
}

impl ResponseBody {
    /// Flatten to the text form streamed as the second unit.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Event(event) => render_event(event),
            Self::Events(events) => render_events(events),
        }
    }
}

/// Final output shape for batch mode.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// The matched intent name, or `"error"`.
    pub classification: String,
    /// The branch response.
    pub response: ResponseBody,
}

/// Routes classified queries through their intent branch.
///
/// Holds no per-request state; concurrent requests share one dispatcher
/// behind the `Arc`s it owns.
pub struct Dispatcher {
    extractor: ParameterExtractor,
    resolver: EventResolver,
    mutator: CalendarMutator,
}

impl Dispatcher {
    /// Wire the pipeline over a completion provider and a calendar backend.
    pub fn new(provider: Arc<dyn CompletionProvider>, backend: Arc<dyn CalendarBackend>) -> Self {
        Self {
            extractor: ParameterExtractor::new(provider),
            resolver: EventResolver::new(Arc::clone(&backend)),
            mutator: CalendarMutator::new(backend),
        }
    }

    /// Batch mode: run the state machine to completion.
    pub async fn run(&self, query: &str, ctx: &RequestContext) -> PipelineResult {
        let request_id = Uuid::new_v4();
        info!(%request_id, query = %truncate_query(query), "classifying query");

        let classification = match self.extractor.classify(query, ctx).await {
            Ok(text) => text,
            Err(e) => {
                warn!(%request_id, error = %e, "classification call failed");
                return PipelineResult {
                    classification: CLASSIFICATION_ERROR.to_owned(),
                    response: ResponseBody::Text(format!("An error occurred: {e}")),
                };
            }
        };

        match Intent::parse(&classification) {
            Some(intent) => {
                info!(%request_id, intent = %intent, "dispatching branch");
                let response = self.run_branch(intent, query, ctx).await;
                PipelineResult {
                    classification: intent.as_str().to_owned(),
                    response,
                }
            }
            None => {
                info!(%request_id, classification = %classification, "unsupported classification");
                let err = PipelineError::ClassificationUnsupported(classification);
                PipelineResult {
                    classification: CLASSIFICATION_ERROR.to_owned(),
                    response: ResponseBody::Text(err.to_string()),
                }
            }
        }
    }

    /// Streaming mode: classification first, branch response second.
    ///
    /// Exactly two units are emitted per request, in order; a fresh
    /// request always restarts from classification.
    pub async fn run_streaming(
        &self,
        query: &str,
        ctx: &RequestContext,
        sink: &mut dyn ResponseSink,
    ) {
        let request_id = Uuid::new_v4();
        info!(%request_id, query = %truncate_query(query), "classifying query (streaming)");

        let classification = match self.extractor.classify(query, ctx).await {
            Ok(text) => text,
            Err(e) => {
                warn!(%request_id, error = %e, "classification call failed");
                sink.emit_classification(CLASSIFICATION_ERROR).await;
                sink.emit_result(&format!("An error occurred: {e}")).await;
                return;
            }
        };

        sink.emit_classification(&classification).await;

        let response = match Intent::parse(&classification) {
            Some(intent) => self.run_branch(intent, query, ctx).await.to_text(),
            None => PipelineError::ClassificationUnsupported(classification).to_string(),
        };
        sink.emit_result(&response).await;
    }

    /// Run one branch, recovering every failure into response text.
    async fn run_branch(&self, intent: Intent, query: &str, ctx: &RequestContext) -> ResponseBody {
        match self.try_branch(intent, query, ctx).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    intent = %intent,
                    query = %truncate_query(query),
                    error = %e,
                    "branch recovered to error text"
                );
                ResponseBody::Text(branch_failure_message(&e))
            }
        }
    }

    async fn try_branch(
        &self,
        intent: Intent,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<ResponseBody, PipelineError> {
        match intent {
            Intent::CreateEvent => self.create_branch(query, ctx).await,
            Intent::ViewEvent => self.view_event_branch(query, ctx).await,
            Intent::ViewEvents => self.view_events_branch(ctx).await,
            Intent::DeleteEvent => self.delete_branch(query, ctx).await,
            Intent::RescheduleEvent => self.reschedule_branch(query, ctx).await,
            Intent::ChoiceEvent => self.choice_branch(query, ctx).await,
        }
    }

    async fn create_branch(
        &self,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<ResponseBody, PipelineError> {
        let mut draft = self.extractor.create_draft(query, ctx).await?;

        // The embellishment call is decoupled from the contract call: a
        // failure here degrades the description, never the creation.
        match self.extractor.describe(query, ctx).await {
            Ok(description) if !description.is_empty() => draft.description = Some(description),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "description synthesis failed"),
        }

        Ok(ResponseBody::Text(self.mutator.create(&draft).await))
    }

    async fn view_event_branch(
        &self,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<ResponseBody, PipelineError> {
        let name = self.extractor.target_event_name(query, ctx).await?;
        let event = self.resolver.resolve(&name, ctx.now).await?;
        Ok(ResponseBody::Event(event))
    }

    async fn view_events_branch(
        &self,
        ctx: &RequestContext,
    ) -> Result<ResponseBody, PipelineError> {
        let events = self.mutator.list_upcoming(ctx.now, MATCH_WINDOW).await?;
        if events.is_empty() {
            Ok(ResponseBody::Text(NO_UPCOMING_EVENTS.to_owned()))
        } else {
            Ok(ResponseBody::Events(events))
        }
    }

    async fn delete_branch(
        &self,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<ResponseBody, PipelineError> {
        let name = self.extractor.target_event_name(query, ctx).await?;
        let event = self.resolver.resolve(&name, ctx.now).await?;
        self.mutator.delete(&event.id).await?;
        Ok(ResponseBody::Text(format!("Deleted \"{}\".", event.summary)))
    }

    async fn reschedule_branch(
        &self,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<ResponseBody, PipelineError> {
        let name = self.extractor.target_event_name(query, ctx).await?;
        let prior = self.resolver.resolve(&name, ctx.now).await?;
        let draft = self.extractor.reschedule_draft(query, &prior, ctx).await?;
        let updated = self.mutator.reschedule(&prior.id, &draft).await?;
        Ok(ResponseBody::Text(format!(
            "Rescheduled \"{}\" to start {}.",
            updated.summary,
            updated.start.format("%Y-%m-%d %H:%M")
        )))
    }

    async fn choice_branch(
        &self,
        query: &str,
        ctx: &RequestContext,
    ) -> Result<ResponseBody, PipelineError> {
        let events = self.mutator.list_upcoming(ctx.now, MATCH_WINDOW).await?;
        if events.is_empty() {
            // Nothing to choose between; skip the completion call.
            return Ok(ResponseBody::Text(NO_UPCOMING_EVENTS.to_owned()));
        }
        let rendered = render_events(&events);
        let prose = self.extractor.choose(query, &rendered, ctx).await?;
        Ok(ResponseBody::Text(prose))
    }
}

fn branch_failure_message(err: &PipelineError) -> String {
    match err {
        PipelineError::Resolve(ResolveError::NoConfidentMatch { phrase }) => {
            format!("Could not find a matching event for \"{phrase}\".")
        }
        PipelineError::Resolve(ResolveError::Backend(e)) | PipelineError::Backend(e) => {
            format!("An error occurred: {e}")
        }
        PipelineError::Extract(e) => format!("Could not extract the event details: {e}"),
        PipelineError::ClassificationUnsupported(_) => err.to_string(),
    }
}

fn truncate_query(query: &str) -> String {
    query.chars().take(QUERY_LOG_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::stream::{CollectingSink, StreamUnit};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ── Mock completion provider ──

    /// Returns scripted responses in order; counts calls.
    struct ScriptedProvider {
        responses: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| (*s).to_owned()).collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            _prompt: &str,
            _temperature: f32,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().expect("test lock");
            if responses.is_empty() {
                return Err(ProviderError::Unavailable("script exhausted".to_owned()));
            }
            Ok(responses.remove(0))
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    // ── Mock calendar backend ──

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl CountingBackend {
        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CalendarBackend for CountingBackend {
        async fn insert(
            &self,
            _draft: &crate::calendar::EventDraft,
        ) -> Result<CalendarEvent, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Parse("not scripted".to_owned()))
        }

        async fn list_upcoming(
            &self,
            _time_min: DateTime<Utc>,
            _max_results: u32,
        ) -> Result<Vec<CalendarEvent>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        async fn get(&self, event_id: &str) -> Result<CalendarEvent, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::NotFound(event_id.to_owned()))
        }

        async fn update(
            &self,
            event_id: &str,
            _event: &CalendarEvent,
        ) -> Result<CalendarEvent, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::NotFound(event_id.to_owned()))
        }

        async fn delete(&self, event_id: &str) -> Result<(), BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::NotFound(event_id.to_owned()))
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new("America/New_York", 0.0)
    }

    #[tokio::test]
    async fn mixed_case_classification_routes_to_the_branch() {
        // "Create_Event \n" must route into the create branch: the next
        // completion call (the draft contract) runs and fails on the
        // scripted non-JSON response.
        let provider = Arc::new(ScriptedProvider::new(&["Create_Event  \n", "not json"]));
        let backend = Arc::new(CountingBackend::default());
        let dispatcher = Dispatcher::new(
            Arc::clone(&provider) as Arc<dyn CompletionProvider>,
            Arc::clone(&backend) as Arc<dyn CalendarBackend>,
        );

        let result = dispatcher.run("set up a meeting", &ctx()).await;
        assert_eq!(result.classification, "create_event");
        assert!(provider.call_count() >= 2, "create branch must extract");
    }

    #[tokio::test]
    async fn unknown_classification_skips_extraction_and_backend() {
        let provider = Arc::new(ScriptedProvider::new(&["snooze_event"]));
        let backend = Arc::new(CountingBackend::default());
        let dispatcher = Dispatcher::new(
            Arc::clone(&provider) as Arc<dyn CompletionProvider>,
            Arc::clone(&backend) as Arc<dyn CalendarBackend>,
        );

        let result = dispatcher.run("snooze my meeting", &ctx()).await;
        assert_eq!(result.classification, CLASSIFICATION_ERROR);
        assert_eq!(
            result.response,
            ResponseBody::Text("snooze_event is not implemented".to_owned())
        );
        assert_eq!(provider.call_count(), 1, "only the classification call");
        assert_eq!(backend.call_count(), 0, "no backend call");
    }

    #[tokio::test]
    async fn streaming_emits_exactly_two_ordered_units() {
        let provider = Arc::new(ScriptedProvider::new(&["view_events"]));
        let backend = Arc::new(CountingBackend::default());
        let dispatcher = Dispatcher::new(
            Arc::clone(&provider) as Arc<dyn CompletionProvider>,
            Arc::clone(&backend) as Arc<dyn CalendarBackend>,
        );

        let mut sink = CollectingSink::new();
        dispatcher
            .run_streaming("what's on my calendar", &ctx(), &mut sink)
            .await;

        assert_eq!(sink.units().len(), 2);
        assert_eq!(
            sink.units()[0],
            StreamUnit::Classification("view_events".to_owned())
        );
        assert_eq!(
            sink.units()[1],
            StreamUnit::Result(NO_UPCOMING_EVENTS.to_owned())
        );
    }

    #[tokio::test]
    async fn streaming_unknown_classification_emits_unsupported_message() {
        let provider = Arc::new(ScriptedProvider::new(&["fold_laundry"]));
        let backend = Arc::new(CountingBackend::default());
        let dispatcher = Dispatcher::new(
            Arc::clone(&provider) as Arc<dyn CompletionProvider>,
            backend as Arc<dyn CalendarBackend>,
        );

        let mut sink = CollectingSink::new();
        dispatcher
            .run_streaming("fold laundry", &ctx(), &mut sink)
            .await;

        let expected = [
            StreamUnit::Classification("fold_laundry".to_owned()),
            StreamUnit::Result("fold_laundry is not implemented".to_owned()),
        ];
        assert_eq!(sink.units(), expected.as_slice());
    }

    #[tokio::test]
    async fn malformed_draft_recovers_to_error_text() {
        let provider = Arc::new(ScriptedProvider::new(&["create_event", "nope", "nope"]));
        let backend = Arc::new(CountingBackend::default());
        let dispatcher = Dispatcher::new(
            provider as Arc<dyn CompletionProvider>,
            Arc::clone(&backend) as Arc<dyn CalendarBackend>,
        );

        let result = dispatcher.run("plan dinner", &ctx()).await;
        assert_eq!(result.classification, "create_event");
        let ResponseBody::Text(text) = result.response else {
            panic!("expected text response");
        };
        assert!(text.contains("malformed completion"), "got: {text}");
        assert_eq!(backend.call_count(), 0, "no insert on malformed draft");
    }

    #[tokio::test]
    async fn temperature_is_clamped_into_unit_range() {
        let ctx = RequestContext::new("UTC", 7.5);
        assert!((ctx.temperature - 1.0).abs() < f32::EPSILON);
        let ctx = RequestContext::new("UTC", -1.0);
        assert!(ctx.temperature.abs() < f32::EPSILON);
    }
}
