//! Extracts structured release metadata from Sparkle appcast feeds.
//!
//! Appcasts observed in the wild carry malformed namespace declarations
//! (including the degenerate `xmlns="xmlns"`) and structurally broken XML.
//! This crate loads such documents best-effort, resolves whichever namespace
//! dialect the document uses, and extracts one record per release item:
//! build number, short version string, description, and the URL of the full
//! (non-delta) download artifact.

pub mod feed;

pub use feed::{
    extract_releases, parse_document, Dialect, Element, FeedNamespaces, LoadError, LookupStrategy,
    ParseMode, ReleaseRecord,
};
