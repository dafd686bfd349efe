//! Content element tree.
//!
//! Messages arrive as a generic tree of `{ type, attrs, children }` nodes. This
//! module lifts that wire form into [`Element`], a tagged enum over the kinds
//! the serializer understands, with [`Element::Other`] carrying everything
//! else through untouched (platform-specific elements, `at`, `button`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Element attributes, keyed by name.
pub type Attributes = BTreeMap<String, Value>;

/// Element types kept after conversion, appended after the rendered image.
pub const APPEND_TYPES: [&str; 3] = ["at", "button", "quote"];

/// Element types that start a new visual line.
pub const LINER_TYPES: [&str; 4] = ["p", "br", "button", "quote"];

// =============================================================================
// Universal Tags
// =============================================================================

/// Markup tags that are emitted as-is, wrapping their children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniversalTag {
    Paragraph,
    Link,
    LineBreak,
    Bold,
    Strong,
    Italic,
    Emphasis,
    Underline,
    Inserted,
    Strikethrough,
    Deleted,
}

impl UniversalTag {
    /// All universal tags.
    pub const ALL: [UniversalTag; 11] = [
        UniversalTag::Paragraph,
        UniversalTag::Link,
        UniversalTag::LineBreak,
        UniversalTag::Bold,
        UniversalTag::Strong,
        UniversalTag::Italic,
        UniversalTag::Emphasis,
        UniversalTag::Underline,
        UniversalTag::Inserted,
        UniversalTag::Strikethrough,
        UniversalTag::Deleted,
    ];

    /// Look up a tag by its element type name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.name() == name)
    }

    /// The element type name, which is also the emitted tag name.
    pub fn name(self) -> &'static str {
        match self {
            UniversalTag::Paragraph => "p",
            UniversalTag::Link => "a",
            UniversalTag::LineBreak => "br",
            UniversalTag::Bold => "b",
            UniversalTag::Strong => "strong",
            UniversalTag::Italic => "i",
            UniversalTag::Emphasis => "em",
            UniversalTag::Underline => "u",
            UniversalTag::Inserted => "ins",
            UniversalTag::Strikethrough => "s",
            UniversalTag::Deleted => "del",
        }
    }
}

// =============================================================================
// Element
// =============================================================================

/// A node in a rich-content message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawElement", into = "RawElement")]
pub enum Element {
    /// A plain markup tag (`p`, `b`, `a`, ...)
    Universal {
        tag: UniversalTag,
        attrs: Attributes,
        children: Vec<Element>,
    },

    /// An image; `url`/`src` and `content` live in `attrs`
    Image { attrs: Attributes },

    /// A run of text
    Text { content: String },

    /// A grouping node with no markup of its own
    Template { children: Vec<Element> },

    /// Renders exactly one randomly chosen child
    Random { children: Vec<Element> },

    /// A command echo; the command is the text of its `text` children
    Execute { children: Vec<Element> },

    /// Any element kind the serializer does not understand
    Other {
        kind: String,
        attrs: Attributes,
        children: Vec<Element>,
    },
}

impl Element {
    /// Create a text element.
    pub fn text(content: impl Into<String>) -> Self {
        Element::Text {
            content: content.into(),
        }
    }

    /// Create a universal tag element without attributes.
    pub fn universal(tag: UniversalTag, children: Vec<Element>) -> Self {
        Element::Universal {
            tag,
            attrs: Attributes::new(),
            children,
        }
    }

    /// Create an image element pointing at `url`.
    pub fn image(url: impl Into<String>) -> Self {
        let mut attrs = Attributes::new();
        attrs.insert("url".to_string(), Value::String(url.into()));
        Element::Image { attrs }
    }

    /// Create an element of an arbitrary kind.
    pub fn other(kind: impl Into<String>, attrs: Attributes, children: Vec<Element>) -> Self {
        Element::Other {
            kind: kind.into(),
            attrs,
            children,
        }
    }

    /// The element type name.
    pub fn kind(&self) -> &str {
        match self {
            Element::Universal { tag, .. } => tag.name(),
            Element::Image { .. } => "image",
            Element::Text { .. } => "text",
            Element::Template { .. } => "template",
            Element::Random { .. } => "random",
            Element::Execute { .. } => "execute",
            Element::Other { kind, .. } => kind,
        }
    }

    /// Child elements. Images and text never have children.
    pub fn children(&self) -> &[Element] {
        match self {
            Element::Universal { children, .. }
            | Element::Template { children }
            | Element::Random { children }
            | Element::Execute { children }
            | Element::Other { children, .. } => children,
            Element::Image { .. } | Element::Text { .. } => &[],
        }
    }

    /// Image source, taken from `url` and falling back to `src`.
    pub fn image_src(&self) -> Option<String> {
        match self {
            Element::Image { attrs } => attrs
                .get("url")
                .or_else(|| attrs.get("src"))
                .map(attr_string),
            _ => None,
        }
    }

    /// Image alt text, taken from `content`.
    pub fn image_alt(&self) -> Option<String> {
        match self {
            Element::Image { attrs } => attrs.get("content").map(attr_string),
            _ => None,
        }
    }

    /// Whether this element survives conversion next to the rendered image.
    pub fn is_append_type(&self) -> bool {
        APPEND_TYPES.contains(&self.kind())
    }
}

/// String form of an attribute value as it appears in markup.
pub fn attr_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// Wire Form
// =============================================================================

/// The generic `{ type, attrs, children }` node used on the wire.
///
/// Converting to [`Element`] keeps only what serialization uses, so a
/// `RawElement -> Element -> RawElement` round trip is lossy:
///
/// - `text` keeps its `content` attribute and drops other attributes and
///   any children.
/// - `image` keeps its attributes and drops children. The `img` alias comes
///   back as `image`.
/// - `template`, `random` and `execute` keep their children and drop
///   attributes.
///
/// Universal and unknown kinds round-trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub attrs: Attributes,

    #[serde(default)]
    pub children: Vec<RawElement>,
}

/// Lossy for `text`, `image`, `template`, `random` and `execute`; see
/// [`RawElement`].
impl From<RawElement> for Element {
    fn from(raw: RawElement) -> Self {
        let RawElement {
            kind,
            mut attrs,
            children,
        } = raw;
        let children: Vec<Element> = children.into_iter().map(Element::from).collect();

        if let Some(tag) = UniversalTag::from_name(&kind) {
            return Element::Universal {
                tag,
                attrs,
                children,
            };
        }

        match kind.as_str() {
            "image" | "img" => Element::Image { attrs },
            "text" => Element::Text {
                content: attrs
                    .remove("content")
                    .map(|v| attr_string(&v))
                    .unwrap_or_default(),
            },
            "template" => Element::Template { children },
            "random" => Element::Random { children },
            "execute" => Element::Execute { children },
            _ => Element::Other {
                kind,
                attrs,
                children,
            },
        }
    }
}

impl From<Element> for RawElement {
    fn from(element: Element) -> Self {
        let kind = element.kind().to_string();
        let lower = |children: Vec<Element>| -> Vec<RawElement> {
            children.into_iter().map(RawElement::from).collect()
        };

        match element {
            Element::Universal {
                attrs, children, ..
            }
            | Element::Other {
                attrs, children, ..
            } => RawElement {
                kind,
                attrs,
                children: lower(children),
            },
            Element::Image { attrs } => RawElement {
                kind,
                attrs,
                children: Vec::new(),
            },
            Element::Text { content } => {
                let mut attrs = Attributes::new();
                attrs.insert("content".to_string(), Value::String(content));
                RawElement {
                    kind,
                    attrs,
                    children: Vec::new(),
                }
            }
            Element::Template { children }
            | Element::Random { children }
            | Element::Execute { children } => RawElement {
                kind,
                attrs: Attributes::new(),
                children: lower(children),
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
