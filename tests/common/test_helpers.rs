use std::path::{Path, PathBuf};

use cts_validate::{InventoryOptions, RewritingRules};
use tempfile::TempDir;

/// Prefix under which the fixture inventory declares its documents
pub const REPOSITORY_PREFIX: &str = "/db/repository/greekLit/tlg0003/tlg001/";

pub const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn inventory(&self) -> PathBuf {
        self.fixtures_dir.join("test_inventory.xml")
    }

    pub fn edition_document(&self) -> PathBuf {
        self.fixtures_dir.join("tlg0003.tlg001.perseus-grc2.xml")
    }

    pub fn translation_document(&self) -> PathBuf {
        self.fixtures_dir.join("tlg0003.tlg001.perseus-eng1.xml")
    }

    /// Rule mapping the declared repository onto the fixtures directory
    pub fn rewrite_rule(&self) -> (String, String) {
        (
            REPOSITORY_PREFIX.to_string(),
            format!("{}/", self.fixtures_dir.display()),
        )
    }

    pub fn rewriting_rules(&self) -> RewritingRules {
        [self.rewrite_rule()].into_iter().collect()
    }

    pub fn options(&self) -> InventoryOptions {
        InventoryOptions {
            rewriting_rules: self.rewriting_rules(),
            strict: false,
        }
    }
}

/// Temporary directory holding generated inventories and documents
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// A TEI document with `books` books of `chapters` chapters each, rooted in `namespace`
pub fn tei_document(namespace: Option<&str>, books: usize, chapters: usize) -> String {
    let xmlns = namespace
        .map(|uri| format!(r#" xmlns="{}""#, uri))
        .unwrap_or_default();

    let mut body = String::new();
    for book in 1..=books {
        body.push_str(&format!(r#"<div n="{}" subtype="book">"#, book));
        for chapter in 1..=chapters {
            body.push_str(&format!(
                r#"<div n="{}" subtype="chapter"><p>Text of {}.{}</p></div>"#,
                chapter, book, chapter
            ));
        }
        body.push_str("</div>");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI{}>
  <teiHeader/>
  <text><body><div type="edition">{}</div></body></text>
</TEI>"#,
        xmlns, body
    )
}

/// Inventory with a single edition whose two-level mapping uses `prefix` and binds `bindings`
pub fn single_edition_inventory(docname: &str, prefix: &str, bindings: &[(&str, &str)]) -> String {
    let mappings: String = bindings
        .iter()
        .map(|(abbreviation, uri)| {
            format!(
                r#"<namespaceMapping abbreviation="{}" nsURI="{}"/>"#,
                abbreviation, uri
            )
        })
        .collect();
    let p = if prefix.is_empty() {
        String::new()
    } else {
        format!("{}:", prefix)
    };

    format!(
        r#"<TextInventory xmlns="http://chs.harvard.edu/xmlns/cts3/ti">
  <textgroup projid="greekLit:tlg0003">
    <groupname xml:lang="en">Thucydides</groupname>
    <work projid="greekLit:tlg001">
      <title xml:lang="en">The Peloponnesian War</title>
      <edition projid="greekLit:test-edition">
        <label xml:lang="en">Test edition</label>
        <online docname="{docname}">
          {mappings}
          <citationMapping>
            <citation label="book" xpath="/{p}div[@n='?']" scope="/{p}TEI/{p}text/{p}body/{p}div">
              <citation label="chapter" xpath="/{p}div[@n='?']" scope="/{p}TEI/{p}text/{p}body/{p}div/{p}div[@n='?']"/>
            </citation>
          </citationMapping>
        </online>
      </edition>
    </work>
  </textgroup>
</TextInventory>"#
    )
}
