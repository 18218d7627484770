//! # Catalog Search
//!
//! Read-only access to the Spotify Web API track catalog.
//!
//! ## Overview
//!
//! [`CatalogSearchClient`] issues bearer-authenticated requests through the
//! host [`HttpClient`](bridge_traits::http::HttpClient) and maps raw results
//! into [`Track`] records. Orchestrators depend on the [`TrackSearch`] trait
//! so they can be exercised without a network.
//!
//! ## Usage
//!
//! ```ignore
//! use core_catalog::{CatalogSearchClient, RecommendationSeeds};
//!
//! let client = CatalogSearchClient::from_config(&config, token_manager);
//! let tracks = client.search("arijit singh", 10).await?;
//!
//! if let Some(first) = tracks.first() {
//!     let seeds = RecommendationSeeds::new().with_track(first.id.clone());
//!     let similar = client.recommendations(&seeds, 10).await?;
//! }
//! ```

pub mod client;
pub mod error;
pub mod mapping;
pub mod types;

pub use client::{CatalogSearchClient, TrackSearch};
pub use error::{Result, SearchError};
pub use mapping::{map_track, map_tracks};
pub use types::{RecommendationSeeds, Track, PLACEHOLDER_COVER, UNKNOWN_ARTIST, UNTITLED};
