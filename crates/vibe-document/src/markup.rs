//! Markup scanning
//!
//! A forgiving scanner over generated page markup:
//! - Recognises opening and closing tags with their attributes
//! - Skips comments, doctype/processing declarations and raw-text bodies
//!   (`script`, `style`, `textarea`, `title`)
//! - Rebuilds an element tree tolerant of unclosed and void elements
//! - Rewrites individual opening tags while preserving every other byte
//!
//! Generated markup is untrusted and frequently malformed, so nothing in
//! here fails: unparseable fragments are treated as text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern is a valid literal")
});

/// Elements whose content is never markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// A single `name="value"` pair on an opening tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name
    pub name: String,
    /// Decoded value (`None` for bare boolean attributes)
    pub value: Option<String>,
}

/// An opening tag found in the markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased element name
    pub name: String,
    /// Attributes in source order
    pub attributes: Vec<Attribute>,
    /// Written as `<name ... />`
    pub self_closing: bool,
    /// Byte range of the whole tag (`<` through `>`)
    pub span: Range<usize>,
}

impl Tag {
    /// Look up an attribute value
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }

    /// Whether the attribute is present at all
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Set (or add) an attribute value
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = Some(value),
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value: Some(value),
            }),
        }
    }

    /// Remove an attribute if present
    pub fn remove_attr(&mut self, name: &str) {
        self.attributes.retain(|a| a.name != name);
    }

    /// Whether this element can never have children
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.self_closing || VOID_ELEMENTS.contains(&self.name.as_str())
    }

    /// Serialize back to markup
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.span.len() + 16);
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            out.push(' ');
            out.push_str(&attr.name);
            if let Some(value) = &attr.value {
                out.push_str("=\"");
                out.push_str(&encode_attribute(value));
                out.push('"');
            }
        }
        if self.self_closing {
            out.push_str(" /");
        }
        out.push('>');
        out
    }
}

/// Scanner output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<name ...>`
    Open(Tag),
    /// `</name>`
    Close {
        /// Lowercased element name
        name: String,
        /// Byte range of the closing tag
        span: Range<usize>,
    },
}

/// Scan markup into a flat token list
#[must_use]
pub fn tokenize(markup: &str) -> Vec<Token> {
    let bytes = markup.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(offset) = markup[pos..].find('<') {
        let start = pos + offset;
        let rest = &markup[start..];

        if rest.starts_with("<!--") {
            pos = match rest.find("-->") {
                Some(end) => start + end + 3,
                None => markup.len(),
            };
            continue;
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = match rest.find('>') {
                Some(end) => start + end + 1,
                None => markup.len(),
            };
            continue;
        }

        if rest.starts_with("</") {
            let name_len = name_length(&bytes[start + 2..]);
            if name_len == 0 {
                pos = start + 2;
                continue;
            }
            let Some(end) = find_tag_end(markup, start + 2 + name_len) else {
                break;
            };
            tokens.push(Token::Close {
                name: markup[start + 2..start + 2 + name_len].to_ascii_lowercase(),
                span: start..end,
            });
            pos = end;
            continue;
        }

        let name_len = name_length(&bytes[start + 1..]);
        if name_len == 0 {
            pos = start + 1;
            continue;
        }
        let name_end = start + 1 + name_len;
        let Some(end) = find_tag_end(markup, name_end) else {
            break;
        };

        let mut inner = &markup[name_end..end - 1];
        let self_closing = inner.trim_end().ends_with('/');
        if self_closing {
            inner = inner.trim_end().trim_end_matches('/');
        }

        let tag = Tag {
            name: markup[start + 1..name_end].to_ascii_lowercase(),
            attributes: parse_attributes(inner),
            self_closing,
            span: start..end,
        };
        let raw_text = RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) && !self_closing;
        let name = tag.name.clone();
        tokens.push(Token::Open(tag));
        pos = end;

        if raw_text {
            match find_raw_text_close(markup, pos, &name) {
                Some((close_start, close_end)) => {
                    tokens.push(Token::Close {
                        name,
                        span: close_start..close_end,
                    });
                    pos = close_end;
                }
                None => break,
            }
        }
    }

    tokens
}

/// Parse an attribute list (the text between the tag name and `>`)
#[must_use]
pub fn parse_attributes(source: &str) -> Vec<Attribute> {
    ATTRIBUTE
        .captures_iter(source)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()));
            Attribute {
                name: caps[1].to_ascii_lowercase(),
                value,
            }
        })
        .collect()
}

/// Decode the handful of entities that matter inside attribute values
#[must_use]
pub fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Encode a value for a double-quoted attribute
#[must_use]
pub fn encode_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// An element with its position in the tree
#[derive(Debug, Clone)]
pub struct Element {
    /// The opening tag
    pub tag: Tag,
    /// Index of the enclosing element, if any
    pub parent: Option<usize>,
}

/// Elements in document order with parent links
///
/// Element indices are the positions of opening tags in document order and
/// are the positional references used elsewhere in the crate.
#[derive(Debug, Clone, Default)]
pub struct ElementTree {
    elements: Vec<Element>,
}

impl ElementTree {
    /// Build the tree for a piece of markup
    #[must_use]
    pub fn parse(markup: &str) -> Self {
        let mut elements: Vec<Element> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();

        for token in tokenize(markup) {
            match token {
                Token::Open(tag) => {
                    let void = tag.is_void();
                    elements.push(Element {
                        tag,
                        parent: stack.last().copied(),
                    });
                    if !void {
                        stack.push(elements.len() - 1);
                    }
                }
                Token::Close { name, .. } => {
                    // Pop up to the matching element; stray closers are ignored.
                    if let Some(depth) = stack
                        .iter()
                        .rposition(|&idx| elements[idx].tag.name == name)
                    {
                        stack.truncate(depth);
                    }
                }
            }
        }

        Self { elements }
    }

    /// All elements in document order
    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Element by index
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    /// Number of elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the markup contains no elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Walk from an element up to the root
    pub fn ancestors_inclusive(&self, index: usize) -> impl Iterator<Item = &Element> + '_ {
        let mut next = (index < self.elements.len()).then_some(index);
        std::iter::from_fn(move || {
            let current = next?;
            let element = &self.elements[current];
            next = element.parent;
            Some(element)
        })
    }
}

/// Rewrite opening tags in place
///
/// `rewrite` receives each opening tag with its element index and returns
/// `Some(tag)` to replace it. Bytes outside rewritten tags are untouched.
pub fn rewrite_tags<F>(markup: &str, mut rewrite: F) -> String
where
    F: FnMut(usize, &Tag) -> Option<Tag>,
{
    let mut out = String::with_capacity(markup.len() + 64);
    let mut cursor = 0;
    let mut index = 0;

    for token in tokenize(markup) {
        let Token::Open(tag) = token else {
            continue;
        };
        if let Some(replacement) = rewrite(index, &tag) {
            out.push_str(&markup[cursor..tag.span.start]);
            out.push_str(&replacement.render());
            cursor = tag.span.end;
        }
        index += 1;
    }

    out.push_str(&markup[cursor..]);
    out
}

/// Remove a markdown code fence wrapped around generated markup
///
/// Language models routinely answer with ```` ```html ... ``` ```` despite
/// being told not to. Only a fence that opens a line counts; backticks
/// inside markup text are content and stay put. Output that already
/// starts with a tag is returned trimmed and otherwise untouched.
#[must_use]
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    match line_fence(trimmed) {
        Some(open) => fenced_body(&trimmed[open + 3..]).trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Offset of the first backtick fence at the start of a line
fn line_fence(text: &str) -> Option<usize> {
    text.match_indices("```")
        .map(|(at, _)| at)
        .find(|&at| at == 0 || text.as_bytes()[at - 1] == b'\n')
}

/// Body of a fenced block, given the text after its opening backticks
fn fenced_body(after_open: &str) -> &str {
    let info_len = after_open
        .bytes()
        .take_while(u8::is_ascii_alphanumeric)
        .count();
    let rest = after_open[info_len..].trim_start_matches(&[' ', '\t', '\r'][..]);
    let body = match rest.strip_prefix('\n') {
        Some(body) => body,
        // `html<p>...` on one line: the info string runs into the markup
        None if rest.starts_with('<') => rest,
        None => after_open,
    };

    match line_fence(body) {
        Some(close) => &body[..close],
        None => {
            let end = body.trim_end();
            end.strip_suffix("```").unwrap_or(end)
        }
    }
}

fn name_length(bytes: &[u8]) -> usize {
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() => bytes
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-' || **b == b':')
            .count(),
        _ => 0,
    }
}

/// Find the `>` closing a tag, honouring quoted attribute values
fn find_tag_end(markup: &str, from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (offset, &b) in markup.as_bytes()[from..].iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(from + offset + 1),
            None => {}
        }
    }
    None
}

fn find_raw_text_close(markup: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let needle = format!("</{name}");
    let haystack = markup[from..].to_ascii_lowercase();
    let rel = haystack.find(&needle)?;
    let close_start = from + rel;
    let close_end = markup[close_start..]
        .find('>')
        .map_or(markup.len(), |end| close_start + end + 1);
    Some((close_start, close_end))
}
