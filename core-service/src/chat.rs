//! # Chat Orchestrator
//!
//! Conversational song suggestions backed by catalog search.
//!
//! ## Overview
//!
//! Every non-blank utterance is appended as a user message, searched
//! verbatim, and answered with exactly one bot message that references it.
//! The conversation lock is released while the search runs, so several
//! utterances may be in flight at once.
//!
//! ## Usage
//!
//! ```ignore
//! let chat = ChatOrchestrator::new(search, responses, event_bus);
//! if let Some(outcome) = chat.handle_utterance("90s bollywood romance").await {
//!     println!("{} tracks", outcome.tracks().len());
//! }
//! ```

use crate::content::ResponseProvider;
use chrono::{DateTime, Utc};
use core_catalog::{SearchError, Track, TrackSearch};
use core_runtime::config::DEFAULT_CHAT_SUGGESTION_LIMIT;
use core_runtime::events::{CoreEvent, EventBus, Notification, SearchEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Track>,
    /// Id of the user message this bot message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
}

impl ChatMessage {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            suggestions: Vec::new(),
            in_reply_to: None,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

/// How an utterance was answered.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Suggestions(Vec<Track>),
    NoResults,
    SearchFailed(SearchError),
}

impl ChatOutcome {
    pub fn tracks(&self) -> &[Track] {
        match self {
            ChatOutcome::Suggestions(tracks) => tracks,
            _ => &[],
        }
    }
}

fn no_songs_found() -> Notification {
    Notification::info(
        "No songs found",
        "Try connecting to Spotify for better results or try a different search term.",
    )
}

fn search_failed() -> Notification {
    Notification::destructive(
        "Search Failed",
        "Failed to search for songs. Please connect to Spotify.",
    )
}

pub struct ChatOrchestrator {
    search: Arc<dyn TrackSearch>,
    responses: Arc<dyn ResponseProvider>,
    event_bus: EventBus,
    limit: u32,
    messages: Mutex<Vec<ChatMessage>>,
    next_request: AtomicU64,
}

impl ChatOrchestrator {
    /// Start a conversation containing only the greeting.
    pub fn new(
        search: Arc<dyn TrackSearch>,
        responses: Arc<dyn ResponseProvider>,
        event_bus: EventBus,
    ) -> Self {
        let greeting = ChatMessage::new(Sender::Bot, responses.greeting());
        Self {
            search,
            responses,
            event_bus,
            limit: DEFAULT_CHAT_SUGGESTION_LIMIT,
            messages: Mutex::new(vec![greeting]),
            next_request: AtomicU64::new(1),
        }
    }

    /// Maximum number of suggestions per reply.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Answer one user utterance. Blank input is ignored and returns `None`.
    #[instrument(skip(self))]
    pub async fn handle_utterance(&self, text: &str) -> Option<ChatOutcome> {
        if text.trim().is_empty() {
            return None;
        }

        let user_message = ChatMessage::new(Sender::User, text);
        let user_id = user_message.id.clone();
        self.messages.lock().push(user_message);

        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let _ = self.event_bus.emit(CoreEvent::Search(SearchEvent::Started {
            request_id,
            query: text.to_string(),
        }));

        let result = self.search.search(text, self.limit).await;

        let (outcome, mut reply) = match result {
            Ok(tracks) if tracks.is_empty() => {
                info!(request_id, "No songs matched");
                self.emit_completed(request_id, 0);
                self.event_bus.notify(no_songs_found());
                (
                    ChatOutcome::NoResults,
                    ChatMessage::new(Sender::Bot, self.responses.no_results()),
                )
            }
            Ok(tracks) => {
                info!(request_id, count = tracks.len(), "Suggesting songs");
                self.emit_completed(request_id, tracks.len());
                let mut reply =
                    ChatMessage::new(Sender::Bot, self.responses.suggestion_intro(text));
                reply.suggestions = tracks.clone();
                (ChatOutcome::Suggestions(tracks), reply)
            }
            Err(e) => {
                warn!(request_id, error = %e, "Song search failed");
                let _ = self.event_bus.emit(CoreEvent::Search(SearchEvent::Failed {
                    request_id,
                    message: e.to_string(),
                }));
                self.event_bus.notify(search_failed());
                (
                    ChatOutcome::SearchFailed(e),
                    ChatMessage::new(Sender::Bot, self.responses.search_failed()),
                )
            }
        };

        reply.in_reply_to = Some(user_id);
        self.messages.lock().push(reply);
        Some(outcome)
    }

    /// Snapshot of the conversation in display order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }

    /// Drop the conversation back to the greeting.
    pub fn reset(&self) {
        let greeting = ChatMessage::new(Sender::Bot, self.responses.greeting());
        *self.messages.lock() = vec![greeting];
    }

    fn emit_completed(&self, request_id: u64, result_count: usize) {
        let _ = self.event_bus.emit(CoreEvent::Search(SearchEvent::Completed {
            request_id,
            result_count,
        }));
    }
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator")
            .field("limit", &self.limit)
            .field("messages", &self.messages.lock().len())
            .finish_non_exhaustive()
    }
}
