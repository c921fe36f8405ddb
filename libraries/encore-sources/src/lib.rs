//! Encore Sources
//!
//! Platform backends that normalize heterogeneous external music sources
//! into the canonical [`encore_core::types::TrackInfo`] model, and the
//! [`SourceResolver`] that dispatches arbitrary user input (URL or free
//! text) to the right backend.
//!
//! Adding a new source is one [`encore_core::traits::MediaSource`]
//! implementation plus one entry in the resolver's priority list; nothing
//! else changes.

#![forbid(unsafe_code)]

pub mod backends;
pub mod config;
pub mod http;
pub mod resolver;

pub use backends::{CatalogSource, SaavnSource, YouTubeSource};
pub use config::SourcesConfig;
pub use http::{HttpClient, HttpError};
pub use resolver::{is_url, Selection, SourceResolver};
