//! Message element model and markup serialization.
//!
//! Outbound messages are trees of [`Element`]s. Before rendering, the tree is
//! turned into markup for the page template:
//!
//! ```text
//! [Element] ──► markup::serialize ──► "<p><span class=\"_text\">..</span></p>"
//!     │
//!     └──────► text::plain_text / line_count ──► trigger thresholds
//! ```
//!
//! # Example
//!
//! ```
//! use imagify::element::{serialize, Element, UniversalTag};
//!
//! let elements = vec![Element::universal(
//!     UniversalTag::Bold,
//!     vec![Element::text("a b")],
//! )];
//!
//! assert_eq!(serialize(&elements), "<b><span class=\"_text\">a&nbsp;b</span></b>");
//! ```

mod markup;
mod node;
mod text;

pub use markup::{escape_text, serialize, serialize_with};
pub use node::{
    attr_string, Attributes, Element, RawElement, UniversalTag, APPEND_TYPES, LINER_TYPES,
};
pub use text::{content_length, has_platform_elements, line_count, plain_text};
