use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use crate::warning::Warning;
use crate::xpath::{name_part, segments};

/// Cached regex for the `prefix:` part of a name test
static PREFIX_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_prefix_regex() -> &'static Regex {
    PREFIX_REGEX.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][\w.\-]*:)").expect("Failed to compile namespace prefix regex")
    })
}

/// Cached regex for `@prefix:` attribute tests; quoted literals are matched first so
/// their content is skipped
static ATTRIBUTE_PREFIX_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_attribute_prefix_regex() -> &'static Regex {
    ATTRIBUTE_PREFIX_REGEX.get_or_init(|| {
        Regex::new(r#"'[^']*'|"[^"]*"|@([A-Za-z_][\w.\-]*:)"#)
            .expect("Failed to compile attribute prefix regex")
    })
}

/// The `xml:` prefix is bound by definition
const XML_PREFIX: &str = "xml:";

/// Maps namespace shortcuts to namespace URIs.
///
/// Shortcuts are stored with their trailing colon (`"tei:"`) and URIs in Clark
/// notation (`"{http://www.tei-c.org/ns/1.0}"`), which is how citation mappings
/// refer to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceResolver {
    bindings: BTreeMap<String, String>,
}

impl NamespaceResolver {
    /// Build from `"tei:" -> "{uri}"` style bindings. Missing colons and braces are added.
    pub fn new(bindings: BTreeMap<String, String>) -> Self {
        let mut resolver = Self::default();
        for (prefix, uri) in bindings {
            resolver.bind(&prefix, &uri);
        }
        resolver
    }

    /// Build from `(abbreviation, uri)` pairs such as `("tei", "http://www.tei-c.org/ns/1.0")`
    pub fn from_pairs<I, P, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, U)>,
        P: AsRef<str>,
        U: AsRef<str>,
    {
        let mut resolver = Self::default();
        for (prefix, uri) in pairs {
            resolver.bind(prefix.as_ref(), uri.as_ref());
        }
        resolver
    }

    pub fn bind(&mut self, prefix: &str, uri: &str) {
        let prefix = format!("{}:", prefix.trim().trim_end_matches(':'));
        let uri = format!("{{{}}}", uri.trim().trim_start_matches('{').trim_end_matches('}'));
        self.bindings.insert(prefix, uri);
    }

    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Declared shortcuts, colon included, in lexical order
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Bare namespace URIs (without Clark braces)
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.bindings.values().map(|uri| strip_clark(uri))
    }

    pub fn contains_uri(&self, uri: &str) -> bool {
        self.uris().any(|known| known == uri)
    }

    /// Bare URI bound to `prefix`; the trailing colon is optional.
    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        let key = format!("{}:", prefix.trim_end_matches(':'));
        self.bindings.get(&key).map(|uri| strip_clark(uri))
    }

    /// Collect the prefixes (colon included) used by the name tests of `path`,
    /// attribute tests in predicates included. `xml:` is never reported.
    pub fn scan_prefixes(path: &str) -> BTreeSet<String> {
        let mut prefixes = BTreeSet::new();
        for segment in segments(path) {
            if let Some(prefix) = segment_prefix(name_part(segment)) {
                prefixes.insert(prefix.to_string());
            }
            prefixes.extend(
                get_attribute_prefix_regex()
                    .captures_iter(segment)
                    .filter_map(|caps| caps.get(1))
                    .map(|m| m.as_str())
                    .filter(|prefix| *prefix != XML_PREFIX)
                    .map(str::to_string),
            );
        }
        prefixes
    }

    /// Check `path` against the declared shortcuts.
    ///
    /// Yields at most one [`Warning::UnboundPrefix`] and at most one
    /// [`Warning::NoPrefix`], however many segments are affected.
    pub fn validate_prefixes(&self, path: &str) -> Vec<Warning> {
        let mut warnings = Vec::new();

        let unbound: Vec<String> = Self::scan_prefixes(path)
            .into_iter()
            .filter(|prefix| !self.bindings.contains_key(prefix))
            .collect();
        if !unbound.is_empty() {
            warnings.push(Warning::UnboundPrefix {
                path: path.to_string(),
                prefixes: unbound,
            });
        }

        // Nothing to suggest when no shortcut is declared: bare names are then correct
        if let Some(expected) = self.prefixes().next() {
            let missing = segments(path).into_iter().map(name_part).any(|name| {
                is_element_test(name) && segment_prefix(name).is_none()
            });
            if missing {
                warnings.push(Warning::NoPrefix {
                    path: path.to_string(),
                    expected: expected.to_string(),
                });
            }
        }

        warnings
    }
}

fn strip_clark(uri: &str) -> &str {
    uri.trim_start_matches('{').trim_end_matches('}')
}

fn segment_prefix(name: &str) -> Option<&str> {
    get_prefix_regex()
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Whether a segment names elements, as opposed to attributes, node tests or self/parent
fn is_element_test(name: &str) -> bool {
    !(name.is_empty()
        || name.starts_with('@')
        || name == "."
        || name == ".."
        || name == "*"
        || name.ends_with("()"))
}
