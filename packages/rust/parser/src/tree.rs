//! Section tree construction from LaTeXML-style HTML.
//!
//! arXiv HTML renderings mark document structure with `ltx_*` classes.
//! The builder walks heading, paragraph and figure blocks under the content
//! root in document order and folds them into a [`SectionNode`] tree using an
//! explicit heading-level stack.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use paperdigest_shared::error::{PaperdigestError, Result};
use paperdigest_shared::types::{Figure, SectionNode, Table};

/// Numeric citation markers like `[3]` or `[72, 33]`, matched together with
/// any whitespace immediately before them.
static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[\s*\d+(?:\s*,\s*\d+)*\s*\]").expect("citation regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

// ---------------------------------------------------------------------------
// ParsedDocument
// ---------------------------------------------------------------------------

/// A parsed HTML rendering: title plus the virtual-root section tree.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Document title from `h1.ltx_title`, when present.
    pub title: Option<String>,

    /// Virtual root node. Real sections hang off `root.subsections`; text
    /// found before any heading is attached directly to the root.
    pub root: SectionNode,
}

/// Parse an HTML rendering into a section tree.
///
/// Returns a parse error when the document yields neither sections nor
/// paragraph text (e.g. a non-LaTeXML page or an empty body).
pub fn parse_document(html: &str) -> Result<ParsedDocument> {
    let doc = Html::parse_document(html);
    let root_el = content_root(&doc);
    let max_level = max_structural_level(&doc);
    if max_level == 0 {
        debug!("no structural sections detected, treating document as flat");
    }
    let root = build_tree(root_el, max_level);

    if root.subsections.is_empty() && root.texts.is_empty() {
        return Err(PaperdigestError::parse(
            "no sections or paragraph text found in document",
        ));
    }

    Ok(ParsedDocument {
        title: document_title(&doc),
        root,
    })
}

// ---------------------------------------------------------------------------
// Content root and structural depth
// ---------------------------------------------------------------------------

/// Resolve the element the block scan runs under.
///
/// Preference order: `article.ltx_document`, `div.ltx_document` (skipping
/// LaTeXML package-alert blocks), `main`, `body`, whole document.
fn content_root(doc: &Html) -> ElementRef<'_> {
    let article = Selector::parse("article.ltx_document").unwrap();
    if let Some(el) = doc.select(&article).find(|el| !has_class(*el, "package-alerts")) {
        return el;
    }

    let div = Selector::parse("div.ltx_document").unwrap();
    if let Some(el) = doc.select(&div).find(|el| !has_class(*el, "package-alerts")) {
        return el;
    }

    let main = Selector::parse("main").unwrap();
    if let Some(el) = doc.select(&main).next() {
        return el;
    }

    let body = Selector::parse("body").unwrap();
    if let Some(el) = doc.select(&body).next() {
        return el;
    }

    doc.root_element()
}

/// Deepest heading level used inside `section.ltx_section` blocks.
///
/// Headings deeper than this are not structural; returns 0 when the document
/// has no sections at all.
fn max_structural_level(doc: &Html) -> u8 {
    let section_sel = Selector::parse("section.ltx_section").unwrap();
    let heading_sel = Selector::parse("h1, h2, h3, h4, h5, h6").unwrap();

    let mut max_level = 0;
    for section in doc.select(&section_sel) {
        for heading in section.select(&heading_sel) {
            if let Some(level) = heading_level(heading) {
                max_level = max_level.max(level);
            }
        }
    }
    max_level
}

fn document_title(doc: &Html) -> Option<String> {
    let sel = Selector::parse("h1.ltx_title").unwrap();
    doc.select(&sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// Tree builder
// ---------------------------------------------------------------------------

/// Fold the document's block sequence into a section tree.
///
/// The stack bottom is the virtual root (level 1). A heading at level L pops
/// every entry at level >= L (attaching each to its new parent) and pushes a
/// fresh node; paragraphs, figures and tables attach to the stack top.
fn build_tree(root_el: ElementRef<'_>, max_level: u8) -> SectionNode {
    let mut tags: Vec<String> = (2..=max_level).map(|l| format!("h{l}")).collect();
    tags.push("p".into());
    tags.push("figure".into());
    let block_sel = Selector::parse(&tags.join(", ")).expect("block selector");

    let mut stack: Vec<(u8, SectionNode)> = vec![(1, SectionNode::default())];

    for el in root_el.select(&block_sel) {
        if in_abstract(el) {
            continue;
        }

        if let Some(level) = heading_level(el) {
            while stack.len() > 1 && stack.last().is_some_and(|(top, _)| *top >= level) {
                attach_top(&mut stack);
            }
            stack.push((level, SectionNode::new(Some(element_text(el)))));
            continue;
        }

        let Some((_, current)) = stack.last_mut() else {
            continue;
        };

        match el.value().name() {
            // figure captions are handled with their figure, not as body text
            "p" if !inside_figure(el) => {
                let text = normalize_paragraph(&element_text(el));
                if !text.is_empty() {
                    current.texts.push(text);
                }
            }
            "figure" => collect_figure(el, current),
            _ => {}
        }
    }

    while stack.len() > 1 {
        attach_top(&mut stack);
    }
    stack.pop().map(|(_, node)| node).unwrap_or_default()
}

/// Pop the stack top and append it to the subsections of the new top.
fn attach_top(stack: &mut Vec<(u8, SectionNode)>) {
    if let Some((_, node)) = stack.pop() {
        if let Some((_, parent)) = stack.last_mut() {
            parent.subsections.push(node);
        }
    }
}

fn collect_figure(el: ElementRef<'_>, node: &mut SectionNode) {
    let is_table = has_class(el, "ltx_table");
    if is_table {
        node.tables.push(extract_table(el));
    } else if has_class(el, "ltx_figure") || has_class(el, "ltx_graphics") {
        node.figures.extend(extract_figures(el));
    }
}

fn extract_table(el: ElementRef<'_>) -> Table {
    let caption_sel = Selector::parse("figcaption").unwrap();
    let caption = el
        .select(&caption_sel)
        .next()
        .map(element_text)
        .filter(|c| !c.is_empty());

    Table {
        id: el.value().attr("id").map(str::to_string),
        caption,
        content: element_text(el),
    }
}

/// Extract one [`Figure`] per `<img>` in the block.
///
/// A shared `figcaption` applies to every image; otherwise `span.ltx_caption`
/// entries are matched to images by position.
fn extract_figures(el: ElementRef<'_>) -> Vec<Figure> {
    let span_sel = Selector::parse("span.ltx_caption").unwrap();
    let figcaption_sel = Selector::parse("figcaption").unwrap();
    let img_sel = Selector::parse("img").unwrap();

    let span_captions: Vec<String> = el.select(&span_sel).map(element_text).collect();
    let figcaption = el.select(&figcaption_sel).next().map(element_text);

    let mut figures = Vec::new();
    for (idx, img) in el.select(&img_sel).enumerate() {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        let caption = figcaption
            .clone()
            .or_else(|| span_captions.get(idx).cloned())
            .unwrap_or_default();

        figures.push(Figure {
            id: img.value().attr("id").map(str::to_string),
            url: src.to_string(),
            caption,
        });
    }
    figures
}

// ---------------------------------------------------------------------------
// Element helpers
// ---------------------------------------------------------------------------

fn heading_level(el: ElementRef<'_>) -> Option<u8> {
    match el.value().name().as_bytes() {
        [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
        _ => None,
    }
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn in_abstract(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| has_class(a, "ltx_abstract"))
}

fn inside_figure(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "figure")
}

/// Concatenate an element's text nodes, one space between them.
fn element_text(el: ElementRef<'_>) -> String {
    let parts: Vec<&str> = el.text().map(str::trim).filter(|t| !t.is_empty()).collect();
    parts.join(" ")
}

/// Strip numeric citation markers and collapse whitespace.
pub(crate) fn normalize_paragraph(text: &str) -> String {
    let stripped = CITATION_RE.replace_all(text, "");
    WHITESPACE_RE.replace_all(&stripped, " ").trim().to_string()
}
