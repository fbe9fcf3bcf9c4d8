//! A citable text file and the citation scheme declared for it.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use roxmltree::ParsingOptions;
use serde::{Deserialize, Serialize};

use crate::citation::Citation;
use crate::error::{CtsError, Result};
use crate::namespace::NamespaceResolver;
use crate::warning::Warning;

/// Parse XML text, allowing a DOCTYPE since TEI files frequently carry one.
pub(crate) fn parse_xml<'input>(
    origin: impl AsRef<Path>,
    text: &'input str,
) -> Result<roxmltree::Document<'input>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| CtsError::xml(origin.as_ref(), e))
}

/// Path-rewriting rules: declared path prefix to replacement prefix.
///
/// When several prefixes match, the longest one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewritingRules {
    rules: BTreeMap<String, String>,
}

impl RewritingRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: impl Into<String>, replacement: impl Into<String>) {
        self.rules.insert(prefix.into(), replacement.into());
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The longest rule prefix matching `path`, with its replacement
    pub fn matching_rule(&self, path: &str) -> Option<(&str, &str)> {
        self.iter()
            .filter(|(prefix, _)| !prefix.is_empty() && path.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
    }

    pub fn rewrite<'a>(&self, path: &'a str) -> Cow<'a, str> {
        match self.matching_rule(path) {
            Some((prefix, replacement)) => {
                Cow::Owned(format!("{}{}", replacement, &path[prefix.len()..]))
            }
            None => Cow::Borrowed(path),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RewritingRules {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut rules = Self::new();
        for (prefix, replacement) in iter {
            rules.insert(prefix, replacement);
        }
        rules
    }
}

/// Outcome of testing a Document's citation scheme
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CitationReport {
    /// One entry per citation level, depth-first, parents before children
    pub results: Vec<bool>,
    pub warnings: Vec<Warning>,
}

impl CitationReport {
    pub fn all_resolved(&self) -> bool {
        self.results.iter().all(|resolved| *resolved)
    }

    /// 1-based indices of the levels that did not resolve
    pub fn failed_levels(&self) -> Vec<usize> {
        self.results
            .iter()
            .enumerate()
            .filter(|(_, resolved)| !**resolved)
            .map(|(index, _)| index + 1)
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.all_resolved() && self.warnings.is_empty()
    }
}

/// A citable text resource: where it lives and how it is cited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    declared_path: String,
    path: String,
    citation: Citation,
}

impl Document {
    /// `path` is `declared_path` after applying `rules`.
    pub fn new(declared_path: impl Into<String>, citation: Citation, rules: &RewritingRules) -> Self {
        let declared_path = declared_path.into();
        let path = rules.rewrite(&declared_path).into_owned();
        if path != declared_path {
            tracing::debug!(from = %declared_path, to = %path, "rewrote document path");
        }
        Self {
            declared_path,
            path,
            citation,
        }
    }

    pub fn declared_path(&self) -> &str {
        &self.declared_path
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn citation(&self) -> &Citation {
        &self.citation
    }

    pub fn namespaces(&self) -> &NamespaceResolver {
        self.citation.namespaces()
    }

    /// Read and parse the file, then check the citation scheme against it.
    pub fn test_citation(&self) -> Result<CitationReport> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| CtsError::io(&self.path, e))?;
        let doc = parse_xml(&self.path, &text)?;
        Ok(self.check(&doc))
    }

    /// Check the citation scheme against an already parsed document.
    ///
    /// Each level is resolved on its own against the whole document, so a failing
    /// level does not fail the levels below it.
    pub fn check(&self, doc: &roxmltree::Document) -> CitationReport {
        let levels = self.citation.levels();
        let results = levels.iter().map(|level| level.resolve(doc)).collect();

        let mut warnings = self.citation.test_namespace();
        warnings.extend(self.citation.test_namespace_uri(doc.root_element()));
        warnings.extend(check_ref_states(&levels, doc));

        CitationReport { results, warnings }
    }
}

/// Compare citation labels with the units of the header's `refState` declarations.
fn check_ref_states(levels: &[&Citation], doc: &roxmltree::Document) -> Vec<Warning> {
    let Some(units) = ref_state_units(doc) else {
        return Vec::new();
    };

    let mut warnings = Vec::new();
    for (index, (level, unit)) in levels.iter().zip(units.iter().copied()).enumerate() {
        if level.label() != unit {
            warnings.push(Warning::RefStateMismatch {
                level: index + 1,
                label: level.label().to_string(),
                unit: unit.to_string(),
            });
        }
    }

    if levels.len() != units.len() {
        warnings.push(Warning::RefStateCount {
            levels: levels.len(),
            states: units.len(),
        });
    }
    warnings
}

/// Units of the first `refsDecl` declaring `refState`s, if any
fn ref_state_units<'a>(doc: &'a roxmltree::Document) -> Option<Vec<&'a str>> {
    doc.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "refsDecl")
        .map(|decl| {
            decl.children()
                .filter(|n| n.is_element() && n.tag_name().name() == "refState")
                .map(|state| state.attribute("unit").unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .find(|units| !units.is_empty())
}
