//! Element tree to markup serialization.
//!
//! The serializer walks the tree depth-first and emits markup for the page
//! template's element slot:
//!
//! | element      | markup                                             |
//! |--------------|----------------------------------------------------|
//! | universal    | `<tag attrs>children</tag>` (`<tag />` if empty)   |
//! | `image`      | `<img class="_image" src=".." alt="..">`           |
//! | `text`       | `<span class="_text">escaped&nbsp;text</span>`     |
//! | `template`   | `<span class="_template">children</span>`          |
//! | `random`     | `<span class="_random">one child</span>`           |
//! | `execute`    | `<span class="_execute">{{command}}</span>`        |
//! | anything else| nothing                                            |
//!
//! Text and attribute values are escaped. Attribute names that are not plain
//! markup names are dropped, so message content cannot inject markup into the
//! page.

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use tracing::debug;

use super::node::{attr_string, Element};

/// Tags emitted without a closing tag.
const VOID_TAGS: [&str; 1] = ["img"];

fn attribute_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_:][-A-Za-z0-9_:.]*$").expect("attribute name pattern is valid")
    })
}

/// Whether `name` can be emitted as an attribute name as-is.
fn is_valid_attribute_name(name: &str) -> bool {
    attribute_name_pattern().is_match(name)
}

/// Serialize elements using the thread-local random generator for `random` nodes.
pub fn serialize(elements: &[Element]) -> String {
    serialize_with(elements, &mut rand::thread_rng())
}

/// Serialize elements drawing `random` choices from `rng`.
///
/// With a seeded generator the output is deterministic.
pub fn serialize_with<R: Rng + ?Sized>(elements: &[Element], rng: &mut R) -> String {
    let mut out = String::new();
    for element in elements {
        write_element(&mut out, element, rng);
    }
    out
}

fn write_element<R: Rng + ?Sized>(out: &mut String, element: &Element, rng: &mut R) {
    match element {
        Element::Universal {
            tag,
            attrs,
            children,
        } => {
            let body = serialize_with(children, rng);
            let attrs: Vec<(&str, String)> = attrs
                .iter()
                .map(|(key, value)| (key.as_str(), attr_string(value)))
                .collect();
            write_tag(out, tag.name(), &attrs, &body);
        }
        Element::Image { .. } => {
            let mut attrs = vec![("class", "_image".to_string())];
            if let Some(src) = element.image_src() {
                attrs.push(("src", src));
            }
            if let Some(alt) = element.image_alt() {
                attrs.push(("alt", alt));
            }
            write_tag(out, "img", &attrs, "");
        }
        Element::Text { content } => {
            write_tag(out, "span", &[("class", "_text".to_string())], &escape_text(content));
        }
        Element::Template { children } => {
            let body = serialize_with(children, rng);
            write_tag(out, "span", &[("class", "_template".to_string())], &body);
        }
        Element::Random { children } => {
            if children.is_empty() {
                return;
            }
            let picked = &children[rng.gen_range(0..children.len())];
            let body = serialize_with(std::slice::from_ref(picked), rng);
            write_tag(out, "span", &[("class", "_random".to_string())], &body);
        }
        Element::Execute { children } => {
            let command: String = children
                .iter()
                .filter_map(|child| match child {
                    Element::Text { content } => Some(content.as_str()),
                    _ => None,
                })
                .collect();
            let body = format!("{{{{{}}}}}", htmlescape::encode_minimal(&command));
            write_tag(out, "span", &[("class", "_execute".to_string())], &body);
        }
        Element::Other { .. } => {}
    }
}

/// Emit a single tag. `body` must already be markup.
fn write_tag(out: &mut String, name: &str, attrs: &[(&str, String)], body: &str) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        if !is_valid_attribute_name(key) {
            debug!("Skipping attribute {:?} on <{}>", key, name);
            continue;
        }
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&htmlescape::encode_minimal(value));
        out.push('"');
    }

    if VOID_TAGS.contains(&name) {
        out.push('>');
    } else if body.is_empty() {
        out.push_str(" />");
    } else {
        out.push('>');
        out.push_str(body);
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
}

/// Escape text content and keep its whitespace layout.
pub fn escape_text(content: &str) -> String {
    htmlescape::encode_minimal(content)
        .replace(' ', "&nbsp;")
        .replace('\n', "<br/>")
}

// =============================================================================
// Tests
// =============================================================================
