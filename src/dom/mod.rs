//! Owned, mutable HTML document with browser-like form control state.
//!
//! `scraper` does the parsing; the tree is then copied into an arena so
//! controls can carry live value/checked/selected state and the document can
//! be written back out.

mod page;
mod serialize;

use scraper::Html;

use crate::form::{ElementId, EventKind};

const INPUT_TYPES: &[&str] = &[
    "text", "search", "tel", "url", "email", "password", "date", "month", "week", "time",
    "datetime-local", "number", "range", "color", "checkbox", "radio", "file", "submit", "image",
    "reset", "button", "hidden",
];

#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
    value: Option<String>,
    checked: Option<bool>,
    selected: Option<bool>,
}

impl Element {
    fn new(name: &str, attrs: Vec<(String, String)>) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs,
            value: None,
            checked: None,
            selected: None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }

    pub fn is_control(&self) -> bool {
        matches!(self.name.as_str(), "input" | "select" | "textarea")
    }

    /// The `type` property: normalized input type, `select-one`,
    /// `select-multiple` or `textarea`.
    pub fn control_type(&self) -> String {
        match self.name.as_str() {
            "select" if self.has_attr("multiple") => "select-multiple".to_string(),
            "select" => "select-one".to_string(),
            "textarea" => "textarea".to_string(),
            "input" => {
                let raw = self.attr("type").unwrap_or("").trim().to_ascii_lowercase();
                if INPUT_TYPES.contains(&raw.as_str()) {
                    raw
                } else {
                    "text".to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<usize>,
    children: Vec<usize>,
    data: NodeData,
}

/// An event the document recorded against one of its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomEvent {
    pub target: ElementId,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    doctype: Option<String>,
    events: Vec<DomEvent>,
}

impl Document {
    pub fn parse(html: &str) -> Document {
        let parsed = Html::parse_document(html);
        let doctype = parsed
            .tree
            .root()
            .children()
            .find_map(|n| n.value().as_doctype().map(|d| d.name().to_string()));

        let mut doc = Document {
            nodes: Vec::new(),
            doctype,
            events: Vec::new(),
        };
        doc.copy_tree(&parsed);
        doc
    }

    /// Copy elements and text in document order. Children are pushed in
    /// reverse so the explicit stack pops them first-to-last.
    fn copy_tree(&mut self, parsed: &Html) {
        let mut stack = vec![(None, *parsed.root_element())];
        while let Some((parent, source)) = stack.pop() {
            match source.value() {
                scraper::Node::Element(el) => {
                    let attrs = el
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    let idx = self.push(parent, NodeData::Element(Element::new(el.name(), attrs)));
                    for child in source.children().rev() {
                        stack.push((Some(idx), child));
                    }
                }
                scraper::Node::Text(text) => {
                    self.push(parent, NodeData::Text(String::from(&**text)));
                }
                _ => {}
            }
        }
    }

    fn push(&mut self, parent: Option<usize>, data: NodeData) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            data,
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(idx);
        }
        idx
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.nodes.get(id.0)?.parent.map(ElementId)
    }

    /// All elements in document order.
    pub fn elements(&self) -> Vec<ElementId> {
        if self.nodes.is_empty() {
            return Vec::new();
        }
        self.collect_elements(&[0])
    }

    /// Elements strictly below `id`, in document order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        match self.nodes.get(id.0) {
            Some(node) => self.collect_elements(&node.children),
            None => Vec::new(),
        }
    }

    /// Pre-order walk over `roots` and everything below them, elements only.
    fn collect_elements(&self, roots: &[usize]) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if matches!(node.data, NodeData::Element(_)) {
                out.push(ElementId(idx));
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Element siblings before `id`, nearest first.
    pub fn preceding_siblings(&self, id: ElementId) -> Vec<ElementId> {
        let Some(parent) = self.nodes.get(id.0).and_then(|n| n.parent) else {
            return Vec::new();
        };
        let siblings = &self.nodes[parent].children;
        let pos = siblings.iter().position(|&c| c == id.0).unwrap_or(0);
        siblings[..pos]
            .iter()
            .rev()
            .filter(|&&c| matches!(self.nodes[c].data, NodeData::Element(_)))
            .map(|&c| ElementId(c))
            .collect()
    }

    /// Nearest ancestor (excluding `id` itself) with the given tag.
    pub fn closest(&self, id: ElementId, tag: &str) -> Option<ElementId> {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if self.element(p).is_some_and(|el| el.name == tag) {
                return Some(p);
            }
            cur = self.parent(p);
        }
        None
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, id: ElementId) -> String {
        let mut out = String::new();
        if id.0 >= self.nodes.len() {
            return out;
        }
        let mut stack = vec![id.0];
        while let Some(idx) = stack.pop() {
            match &self.nodes[idx].data {
                NodeData::Text(t) => out.push_str(t),
                NodeData::Element(_) => stack.extend(self.nodes[idx].children.iter().rev()),
            }
        }
        out
    }

    /// Events recorded so far, oldest first.
    pub fn events(&self) -> &[DomEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<DomEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, target: ElementId, kind: EventKind) {
        self.events.push(DomEvent { target, kind });
    }

    /// First element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<ElementId> {
        self.elements()
            .into_iter()
            .find(|&e| self.element(e).and_then(|el| el.attr("id")) == Some(id))
    }

    pub fn to_html(&self) -> String {
        serialize::to_html(self)
    }
}

/// Collapse runs of whitespace and trim, the way `option.text` reads.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_into_arena() {
        let doc = Document::parse("<!DOCTYPE html><p id=a>Hello <b>world</b></p>");
        let p = doc.element_by_id("a").unwrap();
        assert_eq!(doc.element(p).unwrap().name, "p");
        assert_eq!(doc.text_content(p), "Hello world");
        assert_eq!(doc.doctype.as_deref(), Some("html"));
    }

    #[test]
    fn control_types_normalize() {
        let doc = Document::parse(
            r#"<input id=a type=EMAIL><input id=b type=bogus><input id=c>
               <select id=d multiple></select><select id=e></select><textarea id=f></textarea>"#,
        );
        let ty = |id: &str| doc.element(doc.element_by_id(id).unwrap()).unwrap().control_type();
        assert_eq!(ty("a"), "email");
        assert_eq!(ty("b"), "text");
        assert_eq!(ty("c"), "text");
        assert_eq!(ty("d"), "select-multiple");
        assert_eq!(ty("e"), "select-one");
        assert_eq!(ty("f"), "textarea");
    }

    #[test]
    fn siblings_and_ancestors() {
        let doc = Document::parse(
            r#"<form><label>Name <span id=s>x</span></label><div><em id=e></em>t<input id=i></div></form>"#,
        );
        let input = doc.element_by_id("i").unwrap();
        let sibs = doc.preceding_siblings(input);
        assert_eq!(sibs, vec![doc.element_by_id("e").unwrap()]);
        assert!(doc.closest(input, "form").is_some());
        assert!(doc.closest(input, "label").is_none());
        assert!(doc.closest(doc.element_by_id("s").unwrap(), "label").is_some());
    }

    #[test]
    fn deeply_nested_markup() {
        let depth = 20_000;
        let html = format!(
            "<form>{}<input id=deep value=x>{}</form>",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        );
        let doc = Document::parse(&html);
        let input = doc.element_by_id("deep").unwrap();
        assert!(doc.closest(input, "form").is_some());
        assert_eq!(doc.text_content(doc.elements()[0]), "");
        assert!(doc.to_html().contains(r#"id="deep""#));
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(collapse_whitespace("  United\n   States "), "United States");
    }
}
