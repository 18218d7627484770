//! # Flavor Content
//!
//! Chat reply wording and song-inspired stories.
//!
//! Both are pluggable so hosts can swap the built-in templates for a
//! generative backend without touching the orchestrators.

use core_catalog::Track;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Wording for assistant replies.
pub trait ResponseProvider: Send + Sync {
    /// Intro placed above a list of suggested tracks for `query`.
    fn suggestion_intro(&self, query: &str) -> String;

    fn greeting(&self) -> String {
        GREETING.to_string()
    }

    fn no_results(&self) -> String {
        NO_RESULTS_REPLY.to_string()
    }

    fn search_failed(&self) -> String {
        SEARCH_FAILED_REPLY.to_string()
    }
}

/// A short piece of fiction inspired by a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub track_id: String,
    pub title: String,
    pub body: String,
}

impl Story {
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.body.split("\n\n").filter(|p| !p.trim().is_empty())
    }
}

pub trait StoryProvider: Send + Sync {
    fn compose(&self, track: &Track) -> Story;
}

pub const GREETING: &str = "Hi there! I'm Raagya's AI music assistant. Tell me what kind of music you're in the mood for, and I'll suggest some songs!";

pub const NO_RESULTS_REPLY: &str = "I couldn't find any songs matching your request. Try connecting to Spotify or try a different search term.";

pub const SEARCH_FAILED_REPLY: &str = "I'm having trouble finding songs right now. Please try again later or connect to Spotify for better recommendations.";

const SUGGESTION_TEMPLATES: &[&str] = &[
    "Based on your request for \"{query}\", here are some songs you might enjoy:",
    "I found some great tracks that match your taste for \"{query}\":",
    "Here are some recommendations for \"{query}\" that I think you'll love:",
    "For someone interested in \"{query}\", I'd suggest these songs:",
    "Looking for \"{query}\"? Check out these tracks:",
];

struct StoryTemplate {
    title: &'static str,
    body: &'static str,
}

const STORY_TEMPLATES: &[StoryTemplate] = &[
    StoryTemplate {
        title: "The Enchanted Melody",
        body: "In a world where music shaped reality, {title} was more than a song. It was a key.\n\n\
               Luna found it by accident in her grandmother's record collection. As {artist}'s voice filled the room, the walls began to shimmer and she stepped into Harmonicia, a land woven from musical notes.\n\n\
               \"Your world's music keeps ours alive,\" said Cadence, a rebel holding back the silence. \"And {title} is the strongest thread we have.\"\n\n\
               Luna went home and kept the song playing. Some nights, if she listened closely, she could hear Cadence harmonizing from the other side.",
    },
    StoryTemplate {
        title: "Midnight Resonance",
        body: "Marcus first heard {title} at 2 AM on an empty subway car, leaking from a stranger's headphones.\n\n\
               The melody followed him into his dreams, where doors opened onto a neon city pulsing to {artist}'s rhythm.\n\n\
               Weeks later he hummed it to a bouncer at an unmarked door. \"You've been chosen,\" the man said. \"Welcome to The Frequency.\"\n\n\
               Now Marcus rides the late trains, playing {title} just loud enough for the right ears, watching for the spark of recognition in a stranger's eyes.",
    },
    StoryTemplate {
        title: "Reverberations of Time",
        body: "1987. Sophia found an unlabeled cassette in her grandmother's attic. On it was {title}, a song that would not be released for decades.\n\n\
               Years later, producer Eli heard {artist}'s demo and felt a memory he could not place.\n\n\
               Sophia's attic recordings had shaped the musicians who raised him. Eli sampled one of them into the final mix, closing a loop neither of them could explain.\n\n\
               Critics called {title} timeless. They had no idea how right they were.",
    },
];

enum Picker {
    Thread,
    Seeded(Mutex<StdRng>),
}

impl Picker {
    fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        match self {
            Picker::Thread => items.choose(&mut rand::thread_rng()),
            Picker::Seeded(rng) => items.choose(&mut *rng.lock()),
        }
    }
}

/// Built-in reply wording, picking one of several intros at random.
pub struct TemplateResponses {
    picker: Picker,
}

impl TemplateResponses {
    pub fn new() -> Self {
        Self {
            picker: Picker::Thread,
        }
    }

    /// Deterministic selection for reproducible output.
    pub fn seeded(seed: u64) -> Self {
        Self {
            picker: Picker::Seeded(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl Default for TemplateResponses {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseProvider for TemplateResponses {
    fn suggestion_intro(&self, query: &str) -> String {
        let template = self
            .picker
            .pick(SUGGESTION_TEMPLATES)
            .copied()
            .unwrap_or(SUGGESTION_TEMPLATES[0]);
        template.replace("{query}", query.trim())
    }
}

/// Built-in stories with the track's title and artist substituted in.
pub struct TemplateStoryProvider {
    picker: Picker,
}

impl TemplateStoryProvider {
    pub fn new() -> Self {
        Self {
            picker: Picker::Thread,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            picker: Picker::Seeded(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl Default for TemplateStoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryProvider for TemplateStoryProvider {
    fn compose(&self, track: &Track) -> Story {
        let template = self
            .picker
            .pick(STORY_TEMPLATES)
            .unwrap_or(&STORY_TEMPLATES[0]);
        let fill = |text: &str| {
            text.replace("{title}", &track.title)
                .replace("{artist}", &track.artist)
        };
        Story {
            track_id: track.id.clone(),
            title: template.title.to_string(),
            body: fill(template.body),
        }
    }
}
