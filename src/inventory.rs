//! The catalog tree: text groups, works, editions and translations.
//!
//! Catalogs are CTS `TextInventory` files. Elements are matched on their local
//! names, so catalogs with or without the CTS namespace load the same way.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use roxmltree::Node;
use serde::Serialize;

use crate::citation::Citation;
use crate::document::{Document, RewritingRules, parse_xml};
use crate::error::{CtsError, Result};
use crate::namespace::NamespaceResolver;

/// Language used when no language, or an unknown one, is requested
pub const DEFAULT_LANG: &str = "en";

/// Language-keyed titles with a fallback on [`DEFAULT_LANG`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Titles(BTreeMap<String, String>);

impl Titles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lang: impl Into<String>, title: impl Into<String>) {
        self.0.insert(lang.into(), title.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Title in `lang`, else in the default language.
    pub fn get(&self, lang: Option<&str>) -> Result<&str> {
        let requested = lang.and_then(|lang| self.0.get(lang));
        requested
            .or_else(|| self.0.get(DEFAULT_LANG))
            .map(String::as_str)
            .ok_or_else(|| CtsError::TitleNotFound {
                lang: lang.unwrap_or(DEFAULT_LANG).to_string(),
            })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Titles {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut titles = Self::new();
        for (lang, title) in iter {
            titles.insert(lang, title);
        }
        titles
    }
}

/// Options applied while loading a catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryOptions {
    pub rewriting_rules: RewritingRules,
    /// Abort on the first malformed entry instead of skipping it
    pub strict: bool,
}

/// An original-language version of a work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    pub id: String,
    pub titles: Titles,
    pub document: Document,
}

impl Edition {
    pub fn get_title(&self, lang: Option<&str>) -> Result<&str> {
        self.titles.get(lang)
    }
}

/// A translated version of a work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub id: String,
    pub titles: Titles,
    /// Language of the translation, when the catalog declares it
    pub lang: Option<String>,
    pub document: Document,
}

impl Translation {
    pub fn get_title(&self, lang: Option<&str>) -> Result<&str> {
        self.titles.get(lang)
    }
}

#[derive(Debug, Clone)]
pub struct Work {
    pub id: String,
    pub titles: Titles,
    pub lang: Option<String>,
    pub editions: Vec<Edition>,
    pub translations: Vec<Translation>,
}

impl Work {
    pub fn get_title(&self, lang: Option<&str>) -> Result<&str> {
        self.titles.get(lang)
    }
}

#[derive(Debug, Clone)]
pub struct TextGroup {
    pub id: String,
    pub names: Titles,
    pub works: Vec<Work>,
}

impl TextGroup {
    /// Display name, in English when available
    pub fn name(&self) -> &str {
        self.names
            .get(None)
            .ok()
            .or_else(|| self.names.0.values().next().map(String::as_str))
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextKind {
    Edition,
    Translation,
}

/// A document-bearing leaf of the catalog
#[derive(Debug, Clone, Copy)]
pub enum Text<'a> {
    Edition(&'a Edition),
    Translation(&'a Translation),
}

impl<'a> Text<'a> {
    pub fn id(&self) -> &'a str {
        match *self {
            Text::Edition(edition) => &edition.id,
            Text::Translation(translation) => &translation.id,
        }
    }

    pub fn kind(&self) -> TextKind {
        match *self {
            Text::Edition(_) => TextKind::Edition,
            Text::Translation(_) => TextKind::Translation,
        }
    }

    pub fn document(&self) -> &'a Document {
        match *self {
            Text::Edition(edition) => &edition.document,
            Text::Translation(translation) => &translation.document,
        }
    }

    pub fn get_title(&self, lang: Option<&str>) -> Result<&'a str> {
        match *self {
            Text::Edition(edition) => edition.titles.get(lang),
            Text::Translation(translation) => translation.titles.get(lang),
        }
    }
}

/// Root of the catalog
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    text_groups: Vec<TextGroup>,
    skipped: usize,
}

impl Inventory {
    pub fn from_path(path: impl AsRef<Path>, options: &InventoryOptions) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|e| CtsError::io(path, e))?;
        let doc = parse_xml(path, &xml)?;
        CatalogLoader::new(options).load(doc.root_element())
    }

    pub fn parse(xml: &str, options: &InventoryOptions) -> Result<Self> {
        let doc = parse_xml("<inventory>", xml)?;
        CatalogLoader::new(options).load(doc.root_element())
    }

    pub fn text_groups(&self) -> &[TextGroup] {
        &self.text_groups
    }

    pub fn text_group(&self, id: &str) -> Option<&TextGroup> {
        self.text_groups.iter().find(|group| group.id == id)
    }

    /// Every edition and translation, in catalog order, editions of a work first
    pub fn get_texts(&self) -> Vec<Text<'_>> {
        let mut texts = Vec::new();
        for work in self.text_groups.iter().flat_map(|group| &group.works) {
            texts.extend(work.editions.iter().map(Text::Edition));
            texts.extend(work.translations.iter().map(Text::Translation));
        }
        texts
    }

    /// Number of malformed entries left out while loading in non-strict mode
    pub fn skipped_entries(&self) -> usize {
        self.skipped
    }
}

struct CatalogLoader<'o> {
    options: &'o InventoryOptions,
    skipped: usize,
}

impl<'o> CatalogLoader<'o> {
    fn new(options: &'o InventoryOptions) -> Self {
        Self {
            options,
            skipped: 0,
        }
    }

    fn load(mut self, root: Node) -> Result<Inventory> {
        if root.tag_name().name() != "TextInventory" {
            return Err(CtsError::malformed(format!(
                "expected a <TextInventory> root, found <{}>",
                root.tag_name().name()
            )));
        }

        let mut text_groups = Vec::new();
        let mut seen = HashSet::new();
        for node in elements(root, "textgroup") {
            let outcome = self.load_text_group(node).and_then(|group| {
                if seen.insert(group.id.clone()) {
                    Ok(group)
                } else {
                    Err(CtsError::malformed(format!("duplicate textgroup '{}'", group.id)))
                }
            });
            if let Some(group) = self.recover(outcome, "textgroup")? {
                text_groups.push(group);
            }
        }

        tracing::info!(
            text_groups = text_groups.len(),
            skipped = self.skipped,
            "loaded inventory"
        );
        Ok(Inventory {
            text_groups,
            skipped: self.skipped,
        })
    }

    /// Skip a malformed entry unless loading strictly
    fn recover<T>(&mut self, outcome: Result<T>, entry: &str) -> Result<Option<T>> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(CtsError::MalformedCatalog { details }) if !self.options.strict => {
                tracing::warn!("Skipping malformed {}: {}", entry, details);
                self.skipped += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn load_text_group(&mut self, node: Node) -> Result<TextGroup> {
        let id = required_attribute(node, "projid")?;
        let names = titles(node, "groupname");

        let mut works = Vec::new();
        for work in elements(node, "work") {
            let outcome = self.load_work(work);
            if let Some(work) = self.recover(outcome, "work")? {
                works.push(work);
            }
        }

        Ok(TextGroup { id, names, works })
    }

    fn load_work(&mut self, node: Node) -> Result<Work> {
        let id = required_attribute(node, "projid")?;
        let titles = titles(node, "title");
        if titles.is_empty() {
            return Err(CtsError::malformed(format!("work '{}' has no title", id)));
        }

        let mut editions = Vec::new();
        for edition in elements(node, "edition") {
            let outcome = self.load_text(edition).map(|(id, titles, document)| Edition {
                id,
                titles,
                document,
            });
            if let Some(edition) = self.recover(outcome, "edition")? {
                editions.push(edition);
            }
        }

        let mut translations = Vec::new();
        for translation in elements(node, "translation") {
            let outcome = self
                .load_text(translation)
                .map(|(id, titles, document)| Translation {
                    id,
                    titles,
                    lang: xml_lang(translation),
                    document,
                });
            if let Some(translation) = self.recover(outcome, "translation")? {
                translations.push(translation);
            }
        }

        Ok(Work {
            id,
            titles,
            lang: xml_lang(node),
            editions,
            translations,
        })
    }

    fn load_text(&self, node: Node) -> Result<(String, Titles, Document)> {
        let id = required_attribute(node, "projid")?;
        let titles = titles(node, "label");

        let online = element(node, "online")
            .ok_or_else(|| CtsError::malformed(format!("'{}' has no <online> element", id)))?;
        let docname = required_attribute(online, "docname")?;

        let mut namespaces = NamespaceResolver::default();
        for mapping in elements(online, "namespaceMapping") {
            let abbreviation = required_attribute(mapping, "abbreviation")?;
            let uri = required_attribute(mapping, "nsURI")?;
            namespaces.bind(&abbreviation, &uri);
        }
        let namespaces = Arc::new(namespaces);

        let mapping = element(online, "citationMapping")
            .ok_or_else(|| CtsError::malformed(format!("'{}' has no <citationMapping>", id)))?;
        let mut roots = elements(mapping, "citation");
        let root = roots
            .next()
            .ok_or_else(|| CtsError::malformed(format!("'{}' has an empty <citationMapping>", id)))?;
        if roots.next().is_some() {
            return Err(CtsError::malformed(format!(
                "'{}' declares more than one top-level citation",
                id
            )));
        }
        let citation = Citation::from_node(root, &namespaces)?;

        let document = Document::new(docname, citation, &self.options.rewriting_rules);
        Ok((id, titles, document))
    }
}

fn elements<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && child.tag_name().name() == name)
}

fn element<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    elements(node, name).next()
}

fn required_attribute(node: Node, name: &str) -> Result<String> {
    node.attribute(name).map(str::to_string).ok_or_else(|| {
        CtsError::malformed(format!(
            "<{}> at byte {} has no '{}' attribute",
            node.tag_name().name(),
            node.range().start,
            name
        ))
    })
}

fn xml_lang(node: Node) -> Option<String> {
    node.attribute((roxmltree::NS_XML_URI, "lang"))
        .map(str::to_string)
}

/// Collect `<name xml:lang="..">text</name>` children; a missing language means English
fn titles(node: Node, name: &'static str) -> Titles {
    elements(node, name)
        .filter_map(|title| {
            let text = title.text()?.trim();
            if text.is_empty() {
                return None;
            }
            let lang = xml_lang(title).unwrap_or_else(|| DEFAULT_LANG.to_string());
            Some((lang, text.to_string()))
        })
        .collect()
}
