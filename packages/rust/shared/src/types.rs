//! Core data types shared across PaperDigest crates.
//!
//! These model the ingestion domain: the paper record handed over by the
//! search step, the section tree parsed out of an HTML rendering, and the
//! asset candidates/results produced by the image crawl.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Paper
// ---------------------------------------------------------------------------

/// A paper record as produced by the upstream search step.
///
/// Only `id` and `links.html` are required for ingestion; the remaining
/// metadata is carried through to the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paper {
    /// Document identifier (e.g. an arXiv id like `2401.12345v1`).
    pub id: String,

    /// Paper title.
    #[serde(default)]
    pub title: String,

    /// Author names.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Abstract text.
    #[serde(default)]
    pub summary: String,

    /// Subject categories.
    #[serde(default)]
    pub categories: Vec<String>,

    /// Known URLs for this paper.
    #[serde(default)]
    pub links: PaperLinks,
}

/// URLs attached to a [`Paper`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperLinks {
    /// Abstract page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs: Option<String>,

    /// PDF rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<String>,

    /// HTML rendering. Required for ingestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Source archive.
    #[serde(
        default,
        rename = "e-print",
        skip_serializing_if = "Option::is_none"
    )]
    pub e_print: Option<String>,
}

// ---------------------------------------------------------------------------
// Section tree
// ---------------------------------------------------------------------------

/// One node of the parsed section tree.
///
/// The tree root is a virtual node with no title; real sections hang off its
/// `subsections`. `texts` holds only the paragraphs attached directly to this
/// node, never those of descendants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionNode {
    /// Heading text, `None` only for the virtual root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Normalized paragraph texts directly under this heading.
    #[serde(default)]
    pub texts: Vec<String>,

    /// Figures directly under this heading.
    #[serde(default)]
    pub figures: Vec<Figure>,

    /// Tables directly under this heading.
    #[serde(default)]
    pub tables: Vec<Table>,

    /// Nested child sections, in document order.
    #[serde(default)]
    pub subsections: Vec<SectionNode>,
}

impl SectionNode {
    /// Create an empty node with the given heading text.
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            ..Self::default()
        }
    }
}

/// A figure reference found in the document body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Element id of the `<img>`, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Image URL as written in the document (may be relative).
    pub url: String,

    /// Caption text, empty when none could be associated.
    #[serde(default)]
    pub caption: String,
}

/// A table found in the document body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Element id of the table block, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Caption text, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Flattened text content of the table.
    pub content: String,
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Where an asset candidate was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    /// The paper's own HTML rendering.
    Primary,
    /// A linked GitHub repository page.
    Github,
    /// A linked project page.
    Project,
}

impl AssetSource {
    /// Stable lowercase tag, used in output filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Github => "github",
            Self::Project => "project",
        }
    }
}

impl std::fmt::Display for AssetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image URL discovered during the crawl, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCandidate {
    /// Absolute URL to fetch.
    pub url: String,

    /// Basename minus extension, for reporting.
    pub name: String,

    /// Which crawl pass produced this candidate.
    pub source: AssetSource,
}

/// A validated, persisted image asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadedAsset {
    /// Output filename (`<source>_<basename>`).
    pub filename: String,

    /// Full path of the persisted file.
    pub path: PathBuf,

    /// URL the bytes were fetched from.
    pub url: String,

    /// Which crawl pass produced this asset.
    pub source: AssetSource,

    /// Decoded pixel width.
    pub width: u32,

    /// Decoded pixel height.
    pub height: u32,

    /// Detected image format (e.g. `PNG`, `JPEG`).
    pub format: String,

    /// Payload size in bytes.
    pub size_bytes: u64,
}
