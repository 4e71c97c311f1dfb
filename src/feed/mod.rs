//! Feed extraction module for Sparkle-style appcast documents.
//!
//! This module turns a raw appcast (possibly malformed) into an ordered list
//! of release records. It is organized into three submodules, one per
//! responsibility:
//!
//! - [`tree`] - Document loader: tolerant element-tree construction over
//!   `quick-xml` events, with namespace scoping resolved during the build
//! - [`namespaces`] - Namespace resolver: detects which of the observed
//!   namespace dialects the document uses and configures element lookups
//! - [`extractor`] - Item extractor: per-item field extraction and
//!   delta-enclosure disambiguation
//!
//! # Example
//!
//! ```ignore
//! use appcast_extract::{extract_releases, parse_document, FeedNamespaces, ParseMode};
//!
//! let bytes = std::fs::read("appcast.xml")?;
//! let root = parse_document(&bytes, ParseMode::Recover)?;
//! let ns = FeedNamespaces::resolve(&bytes, &root);
//! let releases = extract_releases(&root, &ns);
//! ```

mod extractor;
mod namespaces;
mod tree;

pub use extractor::{extract_releases, ReleaseRecord};
pub use namespaces::{Dialect, FeedNamespaces, LookupStrategy, DEGENERATE_NS, SPARKLE_NS};
pub use tree::{parse_document, Element, LoadError, ParseMode};
