//! Page template for the render sessions.
//!
//! A template is an HTML page with `{name}` placeholders. Only
//! identifier-shaped placeholders are substituted, so CSS rule bodies such as
//! `{ color: red; }` pass through untouched. Unknown placeholders become
//! empty.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Page used when no template file is configured.
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>{style}</style>
<style>
.background { background-image: url('{background}'); filter: blur({blur}px); }
</style>
</head>
<body>
<div class="background"></div>
<div id="card" class="_card">{element}</div>
<footer class="_footer">Rendered by imagify v{version}</footer>
</body>
</html>
"#;

/// Card style used when no style file is configured.
pub const DEFAULT_STYLE: &str = r#"
html, body { margin: 0; padding: 0; width: fit-content; }
body { font-family: "Noto Sans SC", "Microsoft YaHei", sans-serif; font-size: 16px; }
.background { position: fixed; inset: -20px; background-size: cover; background-position: center; z-index: -1; }
._card { margin: 16px; padding: 16px 20px; max-width: 720px; border-radius: 12px; background: rgba(255, 255, 255, 0.75); line-height: 1.6; word-break: break-all; }
._text { white-space: pre-wrap; }
._image { max-width: 100%; border-radius: 6px; }
._execute { color: #3b6fd1; font-family: monospace; }
._footer { margin: 0 16px 12px; font-size: 12px; color: #666; text-align: right; }
"#;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Values substituted into a [`PageTemplate`].
#[derive(Debug, Clone, Default)]
pub struct PageValues<'a> {
    pub style: &'a str,
    pub background: Option<&'a str>,
    pub blur: u32,
    pub element: &'a str,
}

impl PageValues<'_> {
    fn lookup(&self, name: &str) -> String {
        match name {
            "style" => self.style.to_string(),
            "background" => self.background.unwrap_or_default().to_string(),
            "blur" => self.blur.to_string(),
            "element" => self.element.to_string(),
            "version" => env!("CARGO_PKG_VERSION").to_string(),
            _ => String::new(),
        }
    }
}

/// An HTML page with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTemplate {
    source: String,
}

impl PageTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute `values` into the template.
    pub fn render(&self, values: &PageValues<'_>) -> String {
        placeholder()
            .replace_all(&self.source, |caps: &Captures<'_>| values.lookup(&caps[1]))
            .into_owned()
    }
}

impl Default for PageTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}
