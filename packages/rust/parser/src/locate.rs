//! Keyword-based section lookup and text collection.
//!
//! Lookups are case-insensitive substring matches against section titles,
//! resolved depth-first in document order (a node before its children, an
//! earlier sibling's subtree before a later sibling).

use paperdigest_shared::types::SectionNode;

/// Delimiter joining a section's paragraph texts.
///
/// This is the literal two-character sequence `/n` (not a newline); consumers
/// split extracts on it.
pub const TEXT_DELIMITER: &str = "/n";

/// Find the first section whose title contains `keyword`, case-insensitively.
pub fn find_section_by_keyword<'a>(
    sections: &'a [SectionNode],
    keyword: &str,
) -> Option<&'a SectionNode> {
    let needle = keyword.to_lowercase();
    find_by_needle(sections, &needle)
}

fn find_by_needle<'a>(sections: &'a [SectionNode], needle: &str) -> Option<&'a SectionNode> {
    for section in sections {
        if section
            .title
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(needle))
        {
            return Some(section);
        }
        if let Some(found) = find_by_needle(&section.subsections, needle) {
            return Some(found);
        }
    }
    None
}

/// Resolve a staged keyword path.
///
/// The first keyword is searched across the whole tree; every subsequent
/// keyword only within the previous match's subsections. Returns the final
/// match, or `None` when any stage misses (or the path is empty).
pub fn find_section_by_path<'a, S: AsRef<str>>(
    sections: &'a [SectionNode],
    keywords: &[S],
) -> Option<&'a SectionNode> {
    let mut scope = sections;
    let mut current = None;

    for keyword in keywords {
        let found = find_section_by_keyword(scope, keyword.as_ref())?;
        scope = &found.subsections;
        current = Some(found);
    }
    current
}

/// Join a section's immediate paragraph texts with [`TEXT_DELIMITER`].
///
/// Descendant sections contribute nothing; a section with no immediate text
/// yields the empty string.
pub fn collect_section_text(section: &SectionNode) -> String {
    section.texts.join(TEXT_DELIMITER)
}

/// Flatten all section titles in pre-order.
///
/// This is the title list sent along with keyword suggestion requests.
pub fn collect_titles(sections: &[SectionNode]) -> Vec<String> {
    let mut titles = Vec::new();
    push_titles(sections, &mut titles);
    titles
}

fn push_titles(sections: &[SectionNode], out: &mut Vec<String>) {
    for section in sections {
        if let Some(title) = &section.title {
            out.push(title.clone());
        }
        push_titles(&section.subsections, out);
    }
}
