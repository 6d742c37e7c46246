//! HTML section-tree parsing for PaperDigest.
//!
//! Provides:
//! - [`parse_document`]: LaTeXML-style HTML to a [`ParsedDocument`] section tree
//! - [`find_section_by_keyword`] / [`find_section_by_path`]: keyword lookup
//! - [`collect_section_text`]: immediate-text extraction for a located section

pub mod locate;
pub mod tree;

pub use locate::{
    collect_section_text, collect_titles, find_section_by_keyword, find_section_by_path,
    TEXT_DELIMITER,
};
pub use tree::{parse_document, ParsedDocument};
