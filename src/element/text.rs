//! Plain-text views of an element tree, used by the trigger checks.

use super::node::{Element, UniversalTag, LINER_TYPES};

/// Text content of the elements with all markup stripped.
///
/// Line breaks contribute a newline; images and unknown leaf elements
/// contribute nothing.
pub fn plain_text(elements: &[Element]) -> String {
    let mut out = String::new();
    for element in elements {
        push_plain_text(&mut out, element);
    }
    out
}

fn push_plain_text(out: &mut String, element: &Element) {
    match element {
        Element::Text { content } => out.push_str(content),
        Element::Universal {
            tag: UniversalTag::LineBreak,
            ..
        } => out.push('\n'),
        Element::Image { .. } => {}
        other => {
            for child in other.children() {
                push_plain_text(out, child);
            }
        }
    }
}

/// Length of the plain text in characters.
pub fn content_length(elements: &[Element]) -> usize {
    plain_text(elements).chars().count()
}

/// Number of visual lines: line-starting elements plus newlines inside text.
pub fn line_count(elements: &[Element]) -> usize {
    elements
        .iter()
        .map(|element| {
            let own = match element {
                Element::Text { content } => content.matches('\n').count(),
                other if LINER_TYPES.contains(&other.kind()) => 1,
                _ => 0,
            };
            own + line_count(element.children())
        })
        .sum()
}

/// Whether any top-level element belongs to the given platform (e.g. `qq:face`).
///
/// Such elements cannot be reproduced in an image, so their messages are
/// never converted.
pub fn has_platform_elements(elements: &[Element], platform: &str) -> bool {
    !platform.is_empty()
        && elements
            .iter()
            .any(|element| element.kind().contains(platform))
}
