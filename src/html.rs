//! Markup-to-text normalization for Confluence storage-format bodies.
//!
//! The storage format is XHTML with Confluence-specific `ac:` / `ri:`
//! elements. We parse it as an HTML fragment with `scraper`, walk the tree
//! and emit one line per block:
//!
//! - all tags are removed; entities are decoded by the parser
//! - `script`, `style`, `noscript`, `template`, `head` and macro
//!   parameters (`ac:parameter`) are dropped
//! - block-level element boundaries and `<br>` start a new line
//! - whitespace inside a line is collapsed and trimmed, empty lines dropped
//! - `<pre>` and `ac:plain-text-body` keep their own line breaks
//!
//! Structural fidelity is not a goal: the output is context for a language
//! model, not a rendering.

use scraper::node::Node;
use scraper::{ElementRef, Html};
use std::borrow::Cow;

const SKIPPED: &[&str] = &[
    "script",
    "style",
    "noscript",
    "template",
    "head",
    "ac:parameter",
];

const BLOCKS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "br",
    "caption",
    "dd",
    "details",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "summary",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
    "ac:layout",
    "ac:layout-section",
    "ac:layout-cell",
    "ac:structured-macro",
    "ac:rich-text-body",
    "ac:plain-text-body",
    "ac:task",
    "ac:task-body",
];

const PREFORMATTED: &[&str] = &["pre", "ac:plain-text-body"];

/// Convert a markup body into newline-separated plain text.
pub fn html_to_text(markup: &str) -> String {
    let markup = expand_cdata(markup);
    let fragment = Html::parse_fragment(&markup);

    let mut out = LineBuilder::default();
    walk(fragment.root_element(), &mut out);
    out.finish()
}

fn walk(element: ElementRef<'_>, out: &mut LineBuilder) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_text(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    visit_element(child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn visit_element(element: ElementRef<'_>, out: &mut LineBuilder) {
    let name = element.value().name();
    if SKIPPED.contains(&name) {
        return;
    }

    let block = BLOCKS.contains(&name);
    let pre = PREFORMATTED.contains(&name);

    if block {
        out.break_line();
    }
    if pre {
        out.preformatted += 1;
    }

    walk(element, out);

    if pre {
        out.preformatted -= 1;
    }
    if block {
        out.break_line();
    }
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<String>,
    current: String,
    preformatted: usize,
}

impl LineBuilder {
    fn push_text(&mut self, text: &str) {
        if self.preformatted == 0 {
            self.current.push_str(text);
            return;
        }

        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.current.push_str(first);
        }
        for part in parts {
            self.break_line();
            self.current.push_str(part);
        }
    }

    fn break_line(&mut self) {
        let line = self.current.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            self.lines.push(line);
        }
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

/// Replace `<![CDATA[...]]>` sections with their escaped text.
///
/// The HTML parser treats CDATA outside foreign content as a comment, which
/// would silently drop the bodies of code and no-format macros.
fn expand_cdata(markup: &str) -> Cow<'_, str> {
    const OPEN: &str = "<![CDATA[";
    const CLOSE: &str = "]]>";

    if !markup.contains(OPEN) {
        return Cow::Borrowed(markup);
    }

    let mut result = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(start) = rest.find(OPEN) {
        result.push_str(&rest[..start]);
        let inner_start = start + OPEN.len();
        match rest[inner_start..].find(CLOSE) {
            Some(end) => {
                escape_into(&rest[inner_start..inner_start + end], &mut result);
                rest = &rest[inner_start + end + CLOSE.len()..];
            }
            None => {
                escape_into(&rest[inner_start..], &mut result);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    Cow::Owned(result)
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
