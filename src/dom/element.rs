use indexmap::IndexMap;
use scraper::{ElementRef, Html, Node};
use serde::{Deserialize, Serialize};

/// Attribute carrying an element's identity token
pub const IDENTITY_ATTR: &str = "d-id";

/// Attribute carrying the frame path of elements that live inside iframes
pub const FRAME_PATH_ATTR: &str = "iframe-path";

/// Separator between frame path segments
pub const FRAME_PATH_SEPARATOR: char = '|';

/// Elements with no closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text content is written without escaping
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Document-level elements an HTML parser only accepts once per document
const DOCUMENT_ELEMENTS: &[&str] = &["html", "head", "body"];

/// A node in the composite document tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// Represents a DOM element node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// HTML tag name (e.g., "div", "button", "input")
    pub tag_name: String,

    /// Element attributes in document order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Child nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomNode>,
}

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self { tag_name: tag_name.into(), attributes: IndexMap::new(), children: Vec::new() }
    }

    /// Builder method: set an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(key, value);
        self
    }

    /// Builder method: set the identity token
    pub fn with_identity(self, id: impl Into<String>) -> Self {
        self.with_attribute(IDENTITY_ATTR, id)
    }

    /// Builder method: append a text child
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(DomNode::Text(text.into()));
        self
    }

    /// Builder method: append an element child
    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.add_child(child);
        self
    }

    /// Add a single attribute
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Add a child element
    pub fn add_child(&mut self, child: ElementNode) {
        self.children.push(DomNode::Element(child));
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&String> {
        self.attributes.get(key)
    }

    /// Identity token written by the tagger
    pub fn identity(&self) -> Option<&str> {
        self.get_attribute(IDENTITY_ATTR).map(String::as_str)
    }

    /// Frame path annotation written by the tagger inside iframes
    pub fn frame_path(&self) -> Option<&str> {
        self.get_attribute(FRAME_PATH_ATTR).map(String::as_str)
    }

    /// Check if element matches a tag name (case-insensitive)
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Iterate over direct element children
    pub fn child_elements(&self) -> impl Iterator<Item = &ElementNode> {
        self.children.iter().filter_map(|child| match child {
            DomNode::Element(element) => Some(element),
            DomNode::Text(_) => None,
        })
    }

    /// Concatenated text of this subtree
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                DomNode::Text(text) => out.push_str(text),
                DomNode::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Count elements in this subtree, including self
    pub fn count_elements(&self) -> usize {
        1 + self.child_elements().map(ElementNode::count_elements).sum::<usize>()
    }

    /// All identity tokens in document order
    pub fn identities(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_identities(&mut ids);
        ids
    }

    fn collect_identities<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(id) = self.identity() {
            out.push(id);
        }
        for child in self.child_elements() {
            child.collect_identities(out);
        }
    }

    /// Find the element carrying `id` and the chain of its ancestors (root first)
    pub fn find_with_ancestors(&self, id: &str) -> Option<Vec<&ElementNode>> {
        if self.identity() == Some(id) {
            return Some(vec![self]);
        }

        for child in self.child_elements() {
            if let Some(mut chain) = child.find_with_ancestors(id) {
                chain.insert(0, self);
                return Some(chain);
            }
        }

        None
    }

    /// Find the element carrying `id`
    pub fn find_by_identity(&self, id: &str) -> Option<&ElementNode> {
        self.find_with_ancestors(id).and_then(|chain| chain.last().copied())
    }

    /// Identity tokens of iframe elements in this subtree, in document order
    pub fn iframe_identities(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.collect_iframes(&mut ids);
        ids
    }

    fn collect_iframes(&self, out: &mut Vec<String>) {
        if self.is_tag("iframe") {
            if let Some(id) = self.identity() {
                out.push(id.to_string());
            }
            return;
        }
        for child in self.child_elements() {
            child.collect_iframes(out);
        }
    }

    /// Replace the iframe carrying `id` with `content`. Returns false when no such iframe exists.
    pub fn replace_iframe(&mut self, id: &str, content: ElementNode) -> bool {
        let mut content = Some(content);
        self.replace_iframe_inner(id, &mut content)
    }

    fn replace_iframe_inner(&mut self, id: &str, content: &mut Option<ElementNode>) -> bool {
        for child in self.children.iter_mut() {
            if let DomNode::Element(element) = child {
                if element.is_tag("iframe") && element.identity() == Some(id) {
                    if let Some(replacement) = content.take() {
                        *element = replacement;
                        return true;
                    }
                }
                if element.replace_iframe_inner(id, content) {
                    return true;
                }
            }
        }
        false
    }

    /// Parse a full HTML document into an owned tree rooted at `<html>`
    pub fn parse_document(html: &str) -> ElementNode {
        let document = Html::parse_document(html);
        Self::from_element_ref(document.root_element())
    }

    /// Convert a parsed scraper element into an owned node, dropping comments and doctypes
    pub fn from_element_ref(element: ElementRef<'_>) -> ElementNode {
        let value = element.value();
        let mut node = ElementNode::new(value.name());
        for (key, val) in value.attrs() {
            node.add_attribute(key, val);
        }

        for child in element.children() {
            match child.value() {
                Node::Element(_) => {
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        node.add_child(Self::from_element_ref(child_ref));
                    }
                }
                Node::Text(text) => node.children.push(DomNode::Text(String::from(&**text))),
                _ => {}
            }
        }

        node
    }

    /// Serialize this subtree as HTML
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out, false, false);
        out
    }

    /// Serialize for CSS matching.
    ///
    /// A spliced frame document is a nested `<html>` that an HTML parser would
    /// drop, merging its attributes into the outer document. Here the nested
    /// `html`, `head` and `body` elements are written as `div` with their
    /// attributes, so every frame element keeps its place in the tree.
    pub fn to_matching_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out, true, false);
        out
    }

    fn write_html(&self, out: &mut String, flatten_frames: bool, in_frame: bool) {
        let tag = if flatten_frames && in_frame && DOCUMENT_ELEMENTS.iter().any(|tag| self.is_tag(tag)) {
            "div"
        } else {
            self.tag_name.as_str()
        };

        out.push('<');
        out.push_str(tag);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_into(value, true, out);
            out.push('"');
        }
        out.push('>');

        if VOID_ELEMENTS.iter().any(|void| self.is_tag(void)) {
            return;
        }

        let raw = RAW_TEXT_ELEMENTS.iter().any(|raw| self.is_tag(raw));
        for child in &self.children {
            match child {
                DomNode::Element(element) => {
                    let child_in_frame = in_frame || element.is_tag("html");
                    element.write_html(out, flatten_frames, child_in_frame)
                }
                DomNode::Text(text) if raw => out.push_str(text),
                DomNode::Text(text) => escape_into(text, false, out),
            }
        }

        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_creation() {
        let element = ElementNode::new("button").with_identity("abc").with_text("Submit");

        assert_eq!(element.tag_name, "button");
        assert_eq!(element.identity(), Some("abc"));
        assert_eq!(element.text(), "Submit");
    }

    #[test]
    fn test_parse_and_serialize() {
        let root = ElementNode::parse_document(
            r#"<!DOCTYPE html><html d-id="1"><head></head><body d-id="2"><!-- note --><p d-id="3" class="a&quot;b">x &lt; y<br></p></body></html>"#,
        );

        assert!(root.is_tag("html"));
        assert_eq!(root.identities(), vec!["1", "2", "3"]);

        let html = root.to_html();
        assert!(html.starts_with("<html d-id=\"1\">"));
        assert!(html.contains("class=\"a&quot;b\""));
        assert!(html.contains("x &lt; y<br></p>"));
        assert!(!html.contains("note"));
        assert!(!html.contains("</br>"));
    }

    #[test]
    fn test_find_with_ancestors() {
        let root = ElementNode::new("html").with_identity("h").with_child(
            ElementNode::new("body")
                .with_identity("b")
                .with_child(ElementNode::new("div").with_identity("d").with_child(ElementNode::new("a").with_identity("x"))),
        );

        let chain = root.find_with_ancestors("x").unwrap();
        let ids: Vec<_> = chain.iter().filter_map(|e| e.identity()).collect();
        assert_eq!(ids, vec!["h", "b", "d", "x"]);
        assert!(root.find_by_identity("missing").is_none());
    }

    #[test]
    fn test_replace_iframe() {
        let mut root = ElementNode::new("body").with_child(
            ElementNode::new("div")
                .with_child(ElementNode::new("iframe").with_identity("f1"))
                .with_child(ElementNode::new("iframe").with_identity("f2")),
        );
        assert_eq!(root.iframe_identities(), vec!["f1", "f2"]);

        let frame = ElementNode::new("html").with_child(ElementNode::new("button").with_identity("btn"));
        assert!(root.replace_iframe("f2", frame));
        assert!(!root.replace_iframe("nope", ElementNode::new("html")));

        assert_eq!(root.iframe_identities(), vec!["f1"]);
        assert!(root.find_by_identity("btn").is_some());
        assert_eq!(root.count_elements(), 5);
    }

    #[test]
    fn test_matching_html_keeps_spliced_frames() {
        let mut root = ElementNode::new("html").with_identity("h").with_child(
            ElementNode::new("body").with_identity("b").with_child(ElementNode::new("iframe").with_identity("f1")),
        );
        let frame = ElementNode::new("html")
            .with_identity("h1")
            .with_child(ElementNode::new("body").with_identity("b1").with_attribute("class", "framebody"));
        assert!(root.replace_iframe("f1", frame));

        assert_eq!(
            root.to_matching_html(),
            "<html d-id=\"h\"><body d-id=\"b\"><div d-id=\"h1\"><div d-id=\"b1\" class=\"framebody\"></div></div></body></html>"
        );
        assert!(root.to_html().contains("<html d-id=\"h1\"><body d-id=\"b1\""));
    }

    #[test]
    fn test_raw_text_elements_not_escaped() {
        let root = ElementNode::new("script").with_text("if (a < b && c) {}");
        assert_eq!(root.to_html(), "<script>if (a < b && c) {}</script>");
    }
}
