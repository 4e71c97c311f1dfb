use serde::Serialize;

use crate::feed::namespaces::FeedNamespaces;
use crate::feed::tree::Element;

/// One extracted release, serialized as a flat JSON object.
///
/// A record is only ever built complete: `build_num`, `short_version_str`,
/// and `zip_url` are non-empty by construction (items missing any of them
/// are dropped before a record exists).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRecord {
    /// Sparkle build number (`sparkle:version`), trimmed.
    pub build_num: String,
    /// Human-readable version (`sparkle:shortVersionString`), trimmed.
    pub short_version_str: String,
    /// Release notes text, trimmed; empty when the feed has none.
    pub description: String,
    /// Download URL of the full (non-delta) artifact, used as-is.
    pub zip_url: String,
    /// Last path segment of `zip_url`; the whole URL when it has no `/`.
    pub zip_filename: String,
}

/// Walks every `item` element in the feed (any depth, document order) and
/// extracts the releases that carry a complete set of required fields.
///
/// Items missing a build number, a short version string, or a non-delta
/// enclosure URL are dropped silently: incompleteness is expected input
/// variance, not an error. An empty result is valid.
pub fn extract_releases(root: &Element, ns: &FeedNamespaces) -> Vec<ReleaseRecord> {
    let mut releases = Vec::new();
    let (delta_ns, delta_local) = ns.delta_attr();

    for item in ns.structural_descendants(root, "item") {
        let build_num = ns.vendor_child_text(item, "version").trim().to_string();
        let short_version_str = ns
            .vendor_child_text(item, "shortVersionString")
            .trim()
            .to_string();
        let description = ns
            .structural_children(item, "description")
            .first()
            .map(|el| el.text().trim().to_string())
            .unwrap_or_default();

        // The first enclosure without the qualified deltaFrom marker is the
        // full artifact; enclosures carrying it are delta patches.
        let zip_url = ns
            .structural_children(item, "enclosure")
            .into_iter()
            .find(|enc| enc.attr(Some(delta_ns), delta_local).is_none())
            .and_then(|enc| enc.attr(None, "url"))
            .unwrap_or_default()
            .to_string();

        if build_num.is_empty() || short_version_str.is_empty() || zip_url.is_empty() {
            continue;
        }

        let zip_filename = artifact_filename(&zip_url).to_string();
        releases.push(ReleaseRecord {
            build_num,
            short_version_str,
            description,
            zip_url,
            zip_filename,
        });
    }

    releases
}

fn artifact_filename(url: &str) -> &str {
    match url.rfind('/') {
        Some(pos) => &url[pos + 1..],
        None => url,
    }
}
