use crate::feed::tree::Element;

/// The Sparkle vendor namespace carrying `version`, `shortVersionString`,
/// and the `deltaFrom` delta-marker attribute.
pub const SPARKLE_NS: &str = "http://www.andymatuschak.org/xml-namespaces/sparkle";

/// Namespace token produced by the malformed declaration `xmlns="xmlns"`:
/// the declared "URI" is the literal alias string itself.
pub const DEGENERATE_NS: &str = "xmlns";

/// The namespace-declaration styles observed in the wild for this feed.
///
/// These appear to be successive iterations of the same upstream feed rather
/// than coexisting configurations, but since the upstream's shape over time
/// is unverified, all three are detected and supported per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// A real default namespace plus the vendor namespace declared normally.
    Conformant,
    /// The degenerate `xmlns="xmlns"` declaration: structural elements sit
    /// in the literal namespace token `xmlns`.
    DegenerateDefault,
    /// The degenerate declaration has been stripped, leaving structural
    /// elements unqualified; vendor elements keep their real URI.
    PreCleaned,
}

/// How structural elements (`item`, `description`, `enclosure`) are located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Match only under the resolved structural namespace, falling back to
    /// an unqualified match when nothing is found.
    QualifiedWithFallback,
    /// Match unqualified names only.
    Unqualified,
}

/// Per-run namespace configuration for the item extractor.
///
/// Recomputed for every document; nothing is cached between runs.
#[derive(Debug, Clone)]
pub struct FeedNamespaces {
    dialect: Dialect,
    structural_ns: Option<String>,
}

impl FeedNamespaces {
    /// Detects the document's dialect and builds the lookup configuration.
    ///
    /// Detection is deliberately lightweight: the degenerate declaration is
    /// sniffed from the raw bytes (it may not survive every parse cleanly),
    /// and the conformant/pre-cleaned split falls out of whether the parsed
    /// root resolved to a default namespace.
    pub fn resolve(bytes: &[u8], root: &Element) -> Self {
        let dialect = if has_degenerate_decl(bytes) {
            Dialect::DegenerateDefault
        } else if root.namespace.is_some() {
            Dialect::Conformant
        } else {
            Dialect::PreCleaned
        };
        let structural_ns = match dialect {
            Dialect::DegenerateDefault => Some(DEGENERATE_NS.to_string()),
            Dialect::Conformant => root.namespace.clone(),
            Dialect::PreCleaned => None,
        };
        tracing::debug!(?dialect, structural_ns = ?structural_ns, "resolved feed dialect");
        Self {
            dialect,
            structural_ns,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn strategy(&self) -> LookupStrategy {
        if self.structural_ns.is_some() {
            LookupStrategy::QualifiedWithFallback
        } else {
            LookupStrategy::Unqualified
        }
    }

    /// Fully qualified key for the delta-marker attribute. Attributes are
    /// always addressed qualified; attribute namespace handling does not
    /// degrade the way element namespace handling does in malformed feeds.
    pub fn delta_attr(&self) -> (&'static str, &'static str) {
        (SPARKLE_NS, "deltaFrom")
    }

    /// Direct children of `parent` with a structural local name, honoring
    /// the dialect's lookup strategy.
    pub fn structural_children<'a>(&self, parent: &'a Element, local: &str) -> Vec<&'a Element> {
        if let Some(ns) = self.structural_ns.as_deref() {
            let qualified = parent.children_named(Some(ns), local);
            if !qualified.is_empty() {
                return qualified;
            }
        }
        parent.children_named(None, local)
    }

    /// All structural descendants of `parent` at any depth, in document
    /// order, honoring the dialect's lookup strategy.
    pub fn structural_descendants<'a>(&self, parent: &'a Element, local: &str) -> Vec<&'a Element> {
        if let Some(ns) = self.structural_ns.as_deref() {
            let qualified = parent.descendants_named(Some(ns), local);
            if !qualified.is_empty() {
                return qualified;
            }
        }
        parent.descendants_named(None, local)
    }

    /// Text of a vendor-namespaced child element, trying the qualified name
    /// first and falling back to the structural lookup of the same local
    /// name. The fallback exists because some malformed feeds drop the
    /// vendor prefix entirely.
    pub fn vendor_child_text(&self, parent: &Element, local: &str) -> String {
        if let Some(el) = parent.first_child(Some(SPARKLE_NS), local) {
            return el.text().to_string();
        }
        self.structural_children(parent, local)
            .first()
            .map(|el| el.text().to_string())
            .unwrap_or_default()
    }
}

fn has_degenerate_decl(bytes: &[u8]) -> bool {
    contains(bytes, br#"xmlns="xmlns""#) || contains(bytes, b"xmlns='xmlns'")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
