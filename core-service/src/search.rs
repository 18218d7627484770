//! Browse search with last-query-wins semantics.

use core_catalog::{SearchError, Track, TrackSearch};
use core_runtime::config::DEFAULT_SEARCH_LIMIT;
use core_runtime::events::{CoreEvent, EventBus, Notification, SearchEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(Vec<Track>),
    /// A newer query was issued before this one completed.
    Superseded,
    Failed(SearchError),
}

#[derive(Debug, Default)]
struct SessionState {
    latest_request: u64,
    query: String,
    results: Vec<Track>,
    in_flight: bool,
}

/// Holds the result list shown by a search screen.
///
/// Each query replaces the previous results rather than merging with them.
pub struct SearchSession {
    search: Arc<dyn TrackSearch>,
    event_bus: EventBus,
    limit: u32,
    state: Mutex<SessionState>,
}

fn search_failed() -> Notification {
    Notification::destructive(
        "Search Failed",
        "Could not complete your search. Please try again later.",
    )
}

impl SearchSession {
    pub fn new(search: Arc<dyn TrackSearch>, event_bus: EventBus) -> Self {
        Self {
            search,
            event_bus,
            limit: DEFAULT_SEARCH_LIMIT,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Run `query`, replacing the current results if it is still the latest.
    ///
    /// A blank query clears the results without searching.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let request_id = {
            let mut st = self.state.lock();
            st.latest_request += 1;
            st.query = query.to_string();
            if query.trim().is_empty() {
                st.results.clear();
                st.in_flight = false;
                return SearchOutcome::Results(Vec::new());
            }
            st.in_flight = true;
            st.latest_request
        };

        let _ = self.event_bus.emit(CoreEvent::Search(SearchEvent::Started {
            request_id,
            query: query.to_string(),
        }));

        let result = self.search.search(query, self.limit).await;

        {
            let mut st = self.state.lock();
            if st.latest_request != request_id {
                debug!(request_id, latest = st.latest_request, "Discarding superseded results");
                return SearchOutcome::Superseded;
            }
            st.in_flight = false;
            if let Ok(tracks) = &result {
                st.results = tracks.clone();
            } else {
                st.results.clear();
            }
        }

        match result {
            Ok(tracks) => {
                let _ = self.event_bus.emit(CoreEvent::Search(SearchEvent::Completed {
                    request_id,
                    result_count: tracks.len(),
                }));
                SearchOutcome::Results(tracks)
            }
            Err(e) => {
                warn!(request_id, error = %e, "Search failed");
                let _ = self.event_bus.emit(CoreEvent::Search(SearchEvent::Failed {
                    request_id,
                    message: e.to_string(),
                }));
                self.event_bus.notify(search_failed());
                SearchOutcome::Failed(e)
            }
        }
    }

    pub fn results(&self) -> Vec<Track> {
        self.state.lock().results.clone()
    }

    pub fn query(&self) -> String {
        self.state.lock().query.clone()
    }

    /// Whether the latest query is still awaiting results.
    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight
    }
}
