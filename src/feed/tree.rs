use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors that can occur while turning raw feed bytes into an element tree.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The input is empty or contains only whitespace.
    #[error("input is empty")]
    Empty,

    /// No root element could be extracted, even in recovery mode.
    #[error("no root element could be extracted from the input")]
    NoRoot,

    /// XML parsing failed (strict mode only; recovery mode keeps going).
    #[error("XML parse error: {0}")]
    Parse(String),
}

/// How the loader reacts to structural defects in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Reject the document on the first structural violation.
    Strict,
    /// Best-effort repair: skip or patch unparseable fragments and keep
    /// building a tree from what remains. Only totally unreadable input
    /// (no extractable root element) is fatal.
    Recover,
}

/// An attribute with its namespace already resolved.
///
/// Unprefixed attributes are never in a namespace, so `namespace` is only
/// `Some` for attributes that carried a declared prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub namespace: Option<String>,
    pub local: String,
    pub value: String,
}

/// A node in the parsed document tree.
///
/// Namespace declarations are resolved during construction: each element
/// stores the URI its name resolved to (honoring in-scope `xmlns` and
/// `xmlns:prefix` declarations) plus its local name. The declarations
/// themselves are not kept as attributes, matching how DOM-style libraries
/// expose `attrib`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub namespace: Option<String>,
    pub local: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Element>,
    text: String,
}

impl Element {
    /// Text content appearing before the first child element, or the whole
    /// text content for leaf elements. Not trimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Looks up an attribute by resolved namespace and local name.
    pub fn attr(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.local == local && a.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    /// Direct children matching the given namespace and local name, in
    /// document order.
    pub fn children_named(&self, namespace: Option<&str>, local: &str) -> Vec<&Element> {
        self.children
            .iter()
            .filter(|c| c.matches(namespace, local))
            .collect()
    }

    /// First direct child matching the given namespace and local name.
    pub fn first_child(&self, namespace: Option<&str>, local: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.matches(namespace, local))
    }

    /// All matching descendants at any depth, in document order. Does not
    /// consider the element itself.
    pub fn descendants_named(&self, namespace: Option<&str>, local: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_descendants(namespace, local, &mut out);
        out
    }

    fn collect_descendants<'a>(
        &'a self,
        namespace: Option<&str>,
        local: &str,
        out: &mut Vec<&'a Element>,
    ) {
        for child in &self.children {
            if child.matches(namespace, local) {
                out.push(child);
            }
            child.collect_descendants(namespace, local, out);
        }
    }

    fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }
}

/// Parses raw document bytes into an element tree.
///
/// In [`ParseMode::Recover`], structural defects are repaired rather than
/// reported: mismatched or stray end tags close back to the nearest matching
/// open element (or are ignored), unknown entity references are kept as raw
/// text, and a hard reader error mid-stream keeps the tree built so far.
/// Empty input and input with no extractable root element remain fatal.
///
/// # Errors
///
/// Returns [`LoadError::Empty`] for whitespace-only input, [`LoadError::NoRoot`]
/// when no element could be extracted, and [`LoadError::Parse`] for any
/// structural violation in strict mode.
pub fn parse_document(bytes: &[u8], mode: ParseMode) -> Result<Element, LoadError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(LoadError::Empty);
    }

    let mut reader = Reader::from_reader(bytes);
    if mode == ParseMode::Recover {
        // End-tag names are matched by hand in handle_end instead.
        reader.config_mut().check_end_names = false;
    }

    let mut builder = TreeBuilder::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => builder.handle_start(&e, &reader, mode)?,
            Ok(Event::Empty(e)) => {
                builder.handle_start(&e, &reader, mode)?;
                builder.close_top();
            }
            Ok(Event::End(e)) => match mode {
                // quick-xml already verified the name matches the open tag.
                ParseMode::Strict => builder.close_top(),
                ParseMode::Recover => {
                    let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    builder.handle_loose_end(&qname);
                }
            },
            Ok(Event::Text(e)) => {
                let text = match e.unescape() {
                    Ok(t) => t.into_owned(),
                    Err(err) => match mode {
                        ParseMode::Strict => return Err(LoadError::Parse(err.to_string())),
                        // Unescaped ampersands and unknown entities are a
                        // known defect in these feeds; keep the raw text.
                        ParseMode::Recover => String::from_utf8_lossy(&e).into_owned(),
                    },
                };
                builder.append_text(&text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                builder.append_text(&text);
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions, doctypes.
            Ok(_) => {}
            Err(err) => match mode {
                ParseMode::Strict => return Err(LoadError::Parse(err.to_string())),
                ParseMode::Recover => {
                    tracing::warn!(error = %err, "unrecoverable reader error, keeping partial tree");
                    break;
                }
            },
        }
        buf.clear();
    }

    if mode == ParseMode::Strict && !builder.stack.is_empty() {
        return Err(LoadError::Parse(
            "unexpected end of document: unclosed elements".to_string(),
        ));
    }
    // Recovery: unwind whatever is still open so a truncated document
    // yields the tree built so far.
    while !builder.stack.is_empty() {
        builder.close_top();
    }

    builder.root.ok_or(LoadError::NoRoot)
}

/// Incremental tree construction state.
///
/// `stack` holds the chain of currently open elements together with the raw
/// qualified name they were opened with (needed to match end tags in
/// recovery mode). `scopes` is parallel to `stack`: one namespace scope per
/// open element, holding the declarations introduced on that element.
#[derive(Default)]
struct TreeBuilder {
    stack: Vec<(String, Element)>,
    scopes: Vec<HashMap<Option<String>, String>>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn handle_start(
        &mut self,
        e: &BytesStart<'_>,
        reader: &Reader<&[u8]>,
        mode: ParseMode,
    ) -> Result<(), LoadError> {
        let decoder = reader.decoder();
        let qname = match decoder.decode(e.name().as_ref()) {
            Ok(s) => s.into_owned(),
            Err(err) => match mode {
                ParseMode::Strict => return Err(LoadError::Parse(err.to_string())),
                ParseMode::Recover => String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            },
        };

        // First pass over the attributes: namespace declarations open a new
        // scope that applies to the element's own name and attributes.
        let mut scope: HashMap<Option<String>, String> = HashMap::new();
        let mut raw_attrs: Vec<(String, String)> = Vec::new();
        for attr in e.attributes() {
            let attr = match attr {
                Ok(a) => a,
                Err(err) => match mode {
                    ParseMode::Strict => return Err(LoadError::Parse(err.to_string())),
                    ParseMode::Recover => {
                        tracing::warn!(error = %err, "skipping malformed attribute");
                        continue;
                    }
                },
            };
            let key = match decoder.decode(attr.key.as_ref()) {
                Ok(s) => s.into_owned(),
                Err(err) => match mode {
                    ParseMode::Strict => return Err(LoadError::Parse(err.to_string())),
                    ParseMode::Recover => String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                },
            };
            let value = match attr.decode_and_unescape_value(decoder) {
                Ok(v) => v.into_owned(),
                Err(err) => match mode {
                    ParseMode::Strict => return Err(LoadError::Parse(err.to_string())),
                    ParseMode::Recover => String::from_utf8_lossy(&attr.value).into_owned(),
                },
            };

            if key == "xmlns" {
                scope.insert(None, value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.insert(Some(prefix.to_string()), value);
            } else {
                raw_attrs.push((key, value));
            }
        }
        self.scopes.push(scope);

        let (prefix, local) = split_qname(&qname);
        let namespace = self.lookup_namespace(prefix);
        let local = local.to_string();

        let attrs = raw_attrs
            .into_iter()
            .map(|(key, value)| {
                let (prefix, local) = split_qname(&key);
                Attr {
                    // Default namespace declarations do not apply to attributes.
                    namespace: prefix.and_then(|p| self.lookup_namespace(Some(p))),
                    local: local.to_string(),
                    value,
                }
            })
            .collect();

        self.stack.push((
            qname,
            Element {
                namespace,
                local,
                attrs,
                children: Vec::new(),
                text: String::new(),
            },
        ));
        Ok(())
    }

    /// Recovery-mode end tag: close down to the deepest open element with
    /// the same qualified name, or ignore the tag when nothing matches.
    fn handle_loose_end(&mut self, qname: &str) {
        match self.stack.iter().rposition(|(open, _)| open == qname) {
            Some(pos) => {
                while self.stack.len() > pos {
                    self.close_top();
                }
            }
            None => {
                tracing::warn!(tag = %qname, "ignoring end tag with no matching open element");
            }
        }
    }

    fn close_top(&mut self) {
        if let Some((_, element)) = self.stack.pop() {
            self.scopes.pop();
            match self.stack.last_mut() {
                Some((_, parent)) => parent.children.push(element),
                None => {
                    if self.root.is_none() {
                        self.root = Some(element);
                    }
                }
            }
        }
    }

    fn append_text(&mut self, text: &str) {
        if let Some((_, element)) = self.stack.last_mut() {
            // Matches DOM `.text`: only content before the first child.
            if element.children.is_empty() {
                element.text.push_str(text);
            }
        }
    }

    fn lookup_namespace(&self, prefix: Option<&str>) -> Option<String> {
        let key: Option<String> = prefix.map(str::to_string);
        for scope in self.scopes.iter().rev() {
            if let Some(uri) = scope.get(&key) {
                // xmlns="" undeclares the default namespace.
                if uri.is_empty() {
                    return None;
                }
                return Some(uri.clone());
            }
        }
        None
    }
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}
