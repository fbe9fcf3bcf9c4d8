//! Structural path evaluation for citation templates.
//!
//! This is not an XPath engine. It understands the absolute location paths that
//! citation mappings are written in:
//!
//! - `/` child steps and `//` descendant steps
//! - name tests `prefix:local`, `local` and `*`
//! - predicates `[@attr='value']`, `[@attr]`, `[N]`, joined with `and`
//! - the `?` placeholder, either as an attribute value (`[@n='?']`) or as a
//!   position (`[?]`), matching any value
//!
//! Anything else is rejected with an [`XPathError`] rather than guessed at.

use std::collections::HashSet;

use roxmltree::{Document, Node, NodeId};
use thiserror::Error;

use crate::namespace::NamespaceResolver;

/// Placeholder standing for any positional value in a citation template
pub const PLACEHOLDER: &str = "?";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XPathError {
    #[error("path is not absolute: {0}")]
    NotAbsolute(String),

    #[error("unbalanced brackets or quotes: {0}")]
    Unbalanced(String),

    #[error("unsupported step '{step}' in {path}")]
    UnsupportedStep { path: String, step: String },

    #[error("unsupported predicate '[{predicate}]' in {path}")]
    UnsupportedPredicate { path: String, predicate: String },

    #[error("prefix '{0}' has no namespace binding")]
    UnboundPrefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct QName {
    prefix: Option<String>,
    local: String,
}

impl QName {
    fn parse(raw: &str) -> Option<Self> {
        let (prefix, local) = match raw.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, raw),
        };
        if prefix.is_some_and(|p| !is_ncname(p)) || !is_ncname(local) {
            return None;
        }
        Some(Self {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Name(QName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ValueTest {
    Exists,
    Any,
    Equals(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeTest {
    name: QName,
    value: ValueTest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    /// `None` is the `[?]` placeholder
    Position(Option<usize>),
    Attributes(Vec<AttributeTest>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

/// A parsed absolute location path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    source: String,
    steps: Vec<Step>,
}

impl PathExpr {
    pub fn parse(path: &str) -> Result<Self, XPathError> {
        let path = path.trim();
        if !path.starts_with('/') {
            return Err(XPathError::NotAbsolute(path.to_string()));
        }
        check_balanced(path)?;

        let segments = segments(path);
        let last = segments.len() - 1;
        let mut steps = Vec::new();
        let mut axis = Axis::Child;

        // segments[0] is the empty string before the leading slash
        for (index, segment) in segments.iter().enumerate().skip(1) {
            if segment.is_empty() {
                if index != last {
                    axis = Axis::Descendant;
                }
                continue;
            }
            steps.push(parse_step(path, segment, axis)?);
            axis = Axis::Child;
        }

        Ok(Self {
            source: path.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate the path from the document node, returning every matching element.
    pub fn select<'a, 'input>(
        &self,
        doc: &'a Document<'input>,
        namespaces: &NamespaceResolver,
    ) -> Result<Vec<Node<'a, 'input>>, XPathError> {
        let mut context = vec![doc.root()];

        for step in &self.steps {
            let mut next = Vec::new();
            let mut seen: HashSet<NodeId> = HashSet::new();

            for node in expand_axis(&context, step.axis) {
                for matched in step.apply(node, namespaces)? {
                    if seen.insert(matched.id()) {
                        next.push(matched);
                    }
                }
            }

            if next.is_empty() {
                return Ok(next);
            }
            context = next;
        }

        // An empty path selects the document node, which is not an element
        Ok(context.into_iter().filter(Node::is_element).collect())
    }

    /// Whether the path locates at least one element
    pub fn exists(&self, doc: &Document, namespaces: &NamespaceResolver) -> Result<bool, XPathError> {
        Ok(!self.select(doc, namespaces)?.is_empty())
    }
}

impl Step {
    fn apply<'a, 'input>(
        &self,
        parent: Node<'a, 'input>,
        namespaces: &NamespaceResolver,
    ) -> Result<Vec<Node<'a, 'input>>, XPathError> {
        let mut matched = Vec::new();
        for child in parent.children().filter(Node::is_element) {
            if self.test.matches(child, namespaces)? {
                matched.push(child);
            }
        }

        for predicate in &self.predicates {
            matched = match predicate {
                Predicate::Position(None) => matched,
                Predicate::Position(Some(position)) => {
                    matched.get(position - 1).copied().into_iter().collect()
                }
                Predicate::Attributes(tests) => {
                    let mut kept = Vec::with_capacity(matched.len());
                    for node in matched {
                        if attributes_match(node, tests, namespaces)? {
                            kept.push(node);
                        }
                    }
                    kept
                }
            };
        }

        Ok(matched)
    }
}

impl NameTest {
    fn matches(&self, node: Node, namespaces: &NamespaceResolver) -> Result<bool, XPathError> {
        let NameTest::Name(name) = self else {
            return Ok(true);
        };
        if node.tag_name().name() != name.local {
            return Ok(false);
        }
        let expected = element_namespace(name, namespaces)?;
        Ok(node.tag_name().namespace() == expected)
    }
}

fn element_namespace<'n>(
    name: &QName,
    namespaces: &'n NamespaceResolver,
) -> Result<Option<&'n str>, XPathError> {
    match &name.prefix {
        None => Ok(None),
        Some(prefix) => namespaces
            .uri_for(prefix)
            .map(Some)
            .ok_or_else(|| XPathError::UnboundPrefix(prefix.clone())),
    }
}

fn attributes_match(
    node: Node,
    tests: &[AttributeTest],
    namespaces: &NamespaceResolver,
) -> Result<bool, XPathError> {
    for test in tests {
        let expected_ns = match test.name.prefix.as_deref() {
            Some("xml") => Some(roxmltree::NS_XML_URI),
            _ => element_namespace(&test.name, namespaces)?,
        };
        let attribute = node
            .attributes()
            .find(|attr| attr.name() == test.name.local && attr.namespace() == expected_ns);

        let ok = match (&test.value, attribute) {
            (_, None) => false,
            (ValueTest::Exists | ValueTest::Any, Some(_)) => true,
            (ValueTest::Equals(value), Some(attr)) => attr.value() == value,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// For `//` steps, widen each context node to itself and all its descendants.
fn expand_axis<'a, 'input>(context: &[Node<'a, 'input>], axis: Axis) -> Vec<Node<'a, 'input>> {
    match axis {
        Axis::Child => context.to_vec(),
        Axis::Descendant => {
            let mut seen = HashSet::new();
            context
                .iter()
                .flat_map(|node| node.descendants())
                .filter(|node| node.is_root() || node.is_element())
                .filter(|node| seen.insert(node.id()))
                .collect()
        }
    }
}

fn parse_step(path: &str, segment: &str, axis: Axis) -> Result<Step, XPathError> {
    let unsupported_step = || XPathError::UnsupportedStep {
        path: path.to_string(),
        step: segment.to_string(),
    };

    let (name, mut rest) = match segment.find('[') {
        Some(index) => segment.split_at(index),
        None => (segment, ""),
    };

    let test = match name.trim() {
        "*" => NameTest::Any,
        other => NameTest::Name(QName::parse(other).ok_or_else(unsupported_step)?),
    };

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let end = closing_bracket(rest).ok_or_else(|| XPathError::Unbalanced(path.to_string()))?;
        predicates.push(parse_predicate(path, &rest[1..end])?);
        rest = rest[end + 1..].trim_start();
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(unsupported_step());
        }
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn parse_predicate(path: &str, raw: &str) -> Result<Predicate, XPathError> {
    let unsupported = || XPathError::UnsupportedPredicate {
        path: path.to_string(),
        predicate: raw.to_string(),
    };

    let body = raw.trim();
    if body == PLACEHOLDER {
        return Ok(Predicate::Position(None));
    }
    if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
        return match body.parse::<usize>() {
            Ok(position) if position > 0 => Ok(Predicate::Position(Some(position))),
            _ => Err(unsupported()),
        };
    }

    let mut tests = Vec::new();
    for term in split_conjunction(body) {
        let term = term.trim();
        let attribute = term.strip_prefix('@').ok_or_else(unsupported)?;
        let (name, value) = match attribute.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (attribute.trim(), None),
        };
        let name = QName::parse(name).ok_or_else(unsupported)?;
        let value = match value {
            None => ValueTest::Exists,
            Some(quoted) => match unquote(quoted).ok_or_else(unsupported)? {
                PLACEHOLDER => ValueTest::Any,
                literal => ValueTest::Equals(literal.to_string()),
            },
        };
        tests.push(AttributeTest { name, value });
    }

    Ok(Predicate::Attributes(tests))
}

/// Split a predicate body on ` and ` outside quoted literals
fn split_conjunction(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None if bytes[i..].starts_with(b"and")
                && i > 0
                && bytes[i - 1].is_ascii_whitespace()
                && bytes.get(i + 3).is_some_and(|c| c.is_ascii_whitespace()) =>
            {
                parts.push(&body[start..i]);
                start = i + 3;
                i += 3;
                continue;
            }
            None => {}
        }
        i += 1;
    }
    parts.push(&body[start..]);
    parts
}

fn unquote(raw: &str) -> Option<&str> {
    raw.strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| raw.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
}

/// Index of the `]` closing the predicate that `raw` starts with
fn closing_bracket(raw: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (index, c) in raw.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn check_balanced(path: &str) -> Result<(), XPathError> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in path.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            break;
        }
    }
    if depth != 0 || quote.is_some() {
        return Err(XPathError::Unbalanced(path.to_string()));
    }
    Ok(())
}

/// Split a path on `/`, ignoring slashes inside predicates and quoted literals.
///
/// Empty segments are kept so that callers can tell `//` and trailing slashes apart.
pub(crate) fn segments(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (index, c) in path.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => {
                parts.push(&path[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&path[start..]);
    parts
}

/// The name test of a segment, i.e. everything before its first predicate
pub(crate) fn name_part(segment: &str) -> &str {
    match segment.find('[') {
        Some(index) => segment[..index].trim(),
        None => segment.trim(),
    }
}

fn is_ncname(raw: &str) -> bool {
    let mut chars = raw.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
