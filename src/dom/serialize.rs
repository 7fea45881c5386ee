use super::{Document, Element, NodeData};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Write the document back out with live control state reflected into
/// attributes (`value`, `checked`, `selected`) and textarea content.
pub(super) fn to_html(doc: &Document) -> String {
    let mut out = String::new();
    if let Some(name) = &doc.doctype {
        out.push_str(&format!("<!DOCTYPE {}>", name));
    }
    if doc.nodes.is_empty() {
        return out;
    }

    let mut stack = vec![Step::Open(0, false)];
    while let Some(step) = stack.pop() {
        let (idx, raw) = match step {
            Step::Close(name) => {
                out.push_str(&format!("</{}>", name));
                continue;
            }
            Step::Open(idx, raw) => (idx, raw),
        };
        match &doc.nodes[idx].data {
            NodeData::Text(t) if raw => out.push_str(t),
            NodeData::Text(t) => out.push_str(&escape_text(t)),
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (k, v) in reflected_attrs(el) {
                    out.push_str(&format!(" {}=\"{}\"", k, escape_attr(&v)));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.name.as_str()) {
                    continue;
                }

                stack.push(Step::Close(&el.name));
                match (&el.name[..], &el.value) {
                    ("textarea", Some(value)) => out.push_str(&escape_text(value)),
                    _ => {
                        let raw = RAW_TEXT_ELEMENTS.contains(&el.name.as_str());
                        for &child in doc.nodes[idx].children.iter().rev() {
                            stack.push(Step::Open(child, raw));
                        }
                    }
                }
            }
        }
    }
    out
}

enum Step<'a> {
    Open(usize, bool),
    Close(&'a str),
}

fn reflected_attrs(el: &Element) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = el
        .attrs
        .iter()
        .filter(|(k, _)| {
            !(k == "checked" && el.checked.is_some()) && !(k == "selected" && el.selected.is_some())
        })
        .cloned()
        .collect();

    if el.name == "input" {
        if let Some(value) = &el.value {
            match attrs.iter_mut().find(|(k, _)| k == "value") {
                Some(slot) => slot.1 = value.clone(),
                None => attrs.push(("value".to_string(), value.clone())),
            }
        }
    }
    if el.checked == Some(true) {
        attrs.push(("checked".to_string(), String::new()));
    }
    if el.selected == Some(true) {
        attrs.push(("selected".to_string(), String::new()));
    }
    attrs
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

// ── Tests ──
