//! One level of a citation mapping and its recursive checks.

use std::sync::Arc;

use roxmltree::Node;

use crate::document::parse_xml;
use crate::error::{CtsError, Result};
use crate::namespace::NamespaceResolver;
use crate::warning::Warning;
use crate::xpath::PathExpr;

/// A citation level: `label` names the unit, `scope` is the absolute path of the
/// containing context and `xpath` the template locating the unit inside it.
///
/// Every node of a tree shares its Document's namespace mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    label: String,
    xpath: String,
    scope: String,
    children: Vec<Citation>,
    namespaces: Arc<NamespaceResolver>,
}

impl Citation {
    pub fn new(
        label: impl Into<String>,
        xpath: impl Into<String>,
        scope: impl Into<String>,
        namespaces: Arc<NamespaceResolver>,
    ) -> Self {
        Self {
            label: label.into(),
            xpath: xpath.into(),
            scope: scope.into(),
            children: Vec::new(),
            namespaces,
        }
    }

    /// Append a finer level. The child adopts this node's namespace mapping.
    pub fn with_child(mut self, mut child: Citation) -> Self {
        child.share_namespaces(&self.namespaces);
        self.children.push(child);
        self
    }

    /// Parse a standalone `<citation>` element, nested citations included.
    pub fn from_xml(xml: &str, namespaces: NamespaceResolver) -> Result<Self> {
        let doc = parse_xml("<citation>", xml)?;
        Self::from_node(doc.root_element(), &Arc::new(namespaces))
    }

    /// Build from a `<citation label=".." xpath=".." scope="..">` element.
    pub fn from_node(node: Node, namespaces: &Arc<NamespaceResolver>) -> Result<Self> {
        if node.tag_name().name() != "citation" {
            return Err(CtsError::malformed(format!(
                "expected <citation>, found <{}>",
                node.tag_name().name()
            )));
        }

        let attribute = |name: &str| {
            node.attribute(name).map(str::to_string).ok_or_else(|| {
                CtsError::malformed(format!(
                    "citation at byte {} has no '{}' attribute",
                    node.range().start,
                    name
                ))
            })
        };

        let mut citation = Citation::new(
            attribute("label")?,
            attribute("xpath")?,
            attribute("scope")?,
            Arc::clone(namespaces),
        );

        for child in node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "citation")
        {
            citation.children.push(Self::from_node(child, namespaces)?);
        }

        Ok(citation)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn xpath(&self) -> &str {
        &self.xpath
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn children(&self) -> &[Citation] {
        &self.children
    }

    pub fn namespaces(&self) -> &NamespaceResolver {
        &self.namespaces
    }

    /// This level and all finer ones, depth-first, parents before children
    pub fn levels(&self) -> Vec<&Citation> {
        let mut levels = vec![self];
        for child in &self.children {
            levels.extend(child.levels());
        }
        levels
    }

    /// Number of levels on the deepest branch
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Citation::depth).max().unwrap_or(0)
    }

    /// Check the shortcuts of `xpath` and `scope` here and in every finer level.
    pub fn test_namespace(&self) -> Vec<Warning> {
        let mut warnings = self.namespaces.validate_prefixes(&self.xpath);
        warnings.extend(self.namespaces.validate_prefixes(&self.scope));
        for child in &self.children {
            warnings.extend(child.test_namespace());
        }
        warnings
    }

    /// Check that the document's root element lives in one of the declared namespaces.
    pub fn test_namespace_uri(&self, root: Node) -> Vec<Warning> {
        match root.tag_name().namespace() {
            None => vec![Warning::MissingNamespace],
            Some(uri) if self.namespaces.contains_uri(uri) => Vec::new(),
            Some(uri) => vec![Warning::WrongNamespace {
                found: uri.to_string(),
            }],
        }
    }

    /// The absolute path addressing this level's units: `scope` followed by `xpath`.
    pub fn full_path(&self) -> String {
        let scope = self.scope.trim_end_matches('/');
        if self.xpath.starts_with('/') {
            format!("{}{}", scope, self.xpath)
        } else {
            format!("{}/{}", scope, self.xpath)
        }
    }

    /// Whether this level locates at least one element of `doc`.
    ///
    /// Placeholders match any value. Paths that cannot be evaluated, for instance
    /// because of an unbound shortcut, do not resolve.
    pub fn resolve(&self, doc: &roxmltree::Document) -> bool {
        let path = self.full_path();
        let outcome = PathExpr::parse(&path).and_then(|expr| expr.exists(doc, &self.namespaces));

        match outcome {
            Ok(found) => {
                tracing::debug!(label = %self.label, path = %path, found, "resolved citation level");
                found
            }
            Err(e) => {
                tracing::debug!(label = %self.label, path = %path, "citation level not evaluable: {}", e);
                false
            }
        }
    }

    fn share_namespaces(&mut self, namespaces: &Arc<NamespaceResolver>) {
        self.namespaces = Arc::clone(namespaces);
        for child in &mut self.children {
            child.share_namespaces(namespaces);
        }
    }
}
