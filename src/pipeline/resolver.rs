//! Event resolution: free-text reference to a concrete backend event.
//!
//! Fetches the upcoming-events window, scores every title with the
//! approximate matcher, and keeps the best candidate above the
//! confidence floor. Short LCS matches are unreliable with the
//! stopword-stripped metric, so a low-scoring best match is reported as
//! not found instead of being operated on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::calendar::{BackendError, CalendarBackend, CalendarEvent};

use super::matcher::similarity;

/// Candidate window size fetched per resolution.
pub const MATCH_WINDOW: u32 = 10;

/// Minimum similarity score for an accepted match.
pub const CONFIDENCE_FLOOR: usize = 3;

/// Resolution failures.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No candidate scored at or above the confidence floor.
    #[error("no event matched {phrase:?} confidently enough")]
    NoConfidentMatch {
        /// The free-text reference that failed to resolve.
        phrase: String,
    },
    /// The candidate fetch failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A candidate event paired with its similarity score. Transient; lives
/// only inside one resolution.
#[derive(Debug)]
struct MatchCandidate {
    event: CalendarEvent,
    score: usize,
}

/// Resolves free-text event references against the calendar backend.
pub struct EventResolver {
    backend: Arc<dyn CalendarBackend>,
}

impl EventResolver {
    /// Create a resolver over the given backend.
    pub fn new(backend: Arc<dyn CalendarBackend>) -> Self {
        Self { backend }
    }

    /// Resolve `phrase` to the best-matching upcoming event.
    ///
    /// Every resolution re-fetches the window; nothing is cached across
    /// requests.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NoConfidentMatch`] when the best score is below
    /// the floor, [`ResolveError::Backend`] when the fetch fails.
    pub async fn resolve(
        &self,
        phrase: &str,
        now: DateTime<Utc>,
    ) -> Result<CalendarEvent, ResolveError> {
        let events = self.backend.list_upcoming(now, MATCH_WINDOW).await?;

        let mut best: Option<MatchCandidate> = None;
        for event in events {
            let score = similarity(&event.summary, phrase);
            // Strict > keeps the first-seen candidate on ties.
            let replace = best.as_ref().map_or(true, |b| score > b.score);
            if replace {
                best = Some(MatchCandidate { event, score });
            }
        }

        match best {
            Some(candidate) if candidate.score >= CONFIDENCE_FLOOR => {
                debug!(
                    event_id = %candidate.event.id,
                    score = candidate.score,
                    "resolved event reference"
                );
                Ok(candidate.event)
            }
            _ => Err(ResolveError::NoConfidentMatch {
                phrase: phrase.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::calendar::EventDraft;

    struct FixedBackend {
        events: Vec<CalendarEvent>,
        list_calls: AtomicUsize,
    }

    impl FixedBackend {
        fn with_titles(titles: &[&str]) -> Self {
            let events = titles
                .iter()
                .enumerate()
                .map(|(i, title)| CalendarEvent {
                    id: format!("evt_{i}"),
                    summary: (*title).to_owned(),
                    start: DateTime::parse_from_rfc3339("2024-06-01T09:00:00-04:00")
                        .expect("start"),
                    end: DateTime::parse_from_rfc3339("2024-06-01T10:00:00-04:00").expect("end"),
                    location: None,
                    description: None,
                    html_link: None,
                })
                .collect();
            Self {
                events,
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CalendarBackend for FixedBackend {
        async fn insert(&self, _draft: &EventDraft) -> Result<CalendarEvent, BackendError> {
            unimplemented!("not used by the resolver")
        }

        async fn list_upcoming(
            &self,
            _time_min: DateTime<Utc>,
            max_results: u32,
        ) -> Result<Vec<CalendarEvent>, BackendError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .events
                .iter()
                .take(usize::try_from(max_results).expect("window fits"))
                .cloned()
                .collect())
        }

        async fn get(&self, event_id: &str) -> Result<CalendarEvent, BackendError> {
            Err(BackendError::NotFound(event_id.to_owned()))
        }

        async fn update(
            &self,
            event_id: &str,
            _event: &CalendarEvent,
        ) -> Result<CalendarEvent, BackendError> {
            Err(BackendError::NotFound(event_id.to_owned()))
        }

        async fn delete(&self, event_id: &str) -> Result<(), BackendError> {
            Err(BackendError::NotFound(event_id.to_owned()))
        }
    }

    #[tokio::test]
    async fn resolves_the_best_scoring_title() {
        let backend = Arc::new(FixedBackend::with_titles(&[
            "Team Standup",
            "1:1 with Alex",
            "Birthday Party",
        ]));
        let resolver = EventResolver::new(backend);
        let event = resolver
            .resolve("birthday", Utc::now())
            .await
            .expect("match");
        assert_eq!(event.summary, "Birthday Party");
    }

    #[tokio::test]
    async fn no_overlap_reports_no_confident_match() {
        let backend = Arc::new(FixedBackend::with_titles(&[
            "Team Standup",
            "1:1 with Alex",
            "Birthday Party",
        ]));
        let resolver = EventResolver::new(backend);
        let result = resolver.resolve("xyz", Utc::now()).await;
        assert!(matches!(
            result,
            Err(ResolveError::NoConfidentMatch { ref phrase }) if phrase == "xyz"
        ));
    }

    #[tokio::test]
    async fn empty_window_reports_no_confident_match() {
        let backend = Arc::new(FixedBackend::with_titles(&[]));
        let resolver = EventResolver::new(backend);
        let result = resolver.resolve("anything", Utc::now()).await;
        assert!(matches!(result, Err(ResolveError::NoConfidentMatch { .. })));
    }

    #[tokio::test]
    async fn ties_keep_the_first_seen_candidate() {
        let backend = Arc::new(FixedBackend::with_titles(&["Standup A", "Standup B"]));
        let resolver = EventResolver::new(backend);
        let event = resolver
            .resolve("Standup", Utc::now())
            .await
            .expect("match");
        assert_eq!(event.id, "evt_0");
    }

    #[tokio::test]
    async fn each_resolution_refetches_the_window() {
        let backend = Arc::new(FixedBackend::with_titles(&["Team Standup"]));
        let resolver = EventResolver::new(Arc::clone(&backend) as Arc<dyn CalendarBackend>);
        let _ = resolver.resolve("Standup", Utc::now()).await;
        let _ = resolver.resolve("Standup", Utc::now()).await;
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 2);
    }
}
