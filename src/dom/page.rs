use anyhow::{bail, Context, Result};

use super::{collapse_whitespace, Document, Element};
use crate::form::{Control, ElementId, EventKind, FormPage, OptionState, Widget, WidgetKind};

/// Label text is only taken from the parent when it is shorter than this.
const PARENT_TEXT_LIMIT: usize = 100;

impl Document {
    fn forms(&self) -> Vec<ElementId> {
        self.elements()
            .into_iter()
            .filter(|&e| self.element(e).is_some_and(|el| el.name == "form"))
            .collect()
    }

    fn is_control(&self, id: ElementId) -> bool {
        self.element(id).is_some_and(Element::is_control)
    }

    /// Option elements of a select, in order (optgroups included).
    fn option_elements(&self, select: ElementId) -> Vec<ElementId> {
        self.descendants(select)
            .into_iter()
            .filter(|&e| self.element(e).is_some_and(|el| el.name == "option"))
            .collect()
    }

    fn option_value(&self, option: ElementId) -> String {
        match self.element(option).and_then(|el| el.attr("value")) {
            Some(v) => v.to_string(),
            None => collapse_whitespace(&self.text_content(option)),
        }
    }

    /// Effective selectedness of every option. A single select with nothing
    /// marked selects its first enabled option; with several marked, the last wins.
    fn option_states(&self, select: ElementId) -> Vec<OptionState> {
        let multiple = self.element(select).is_some_and(|el| el.has_attr("multiple"));
        let options = self.option_elements(select);
        let mut states: Vec<OptionState> = options
            .iter()
            .map(|&o| {
                let el = self.element(o);
                OptionState {
                    value: self.option_value(o),
                    text: collapse_whitespace(&self.text_content(o)),
                    selected: el
                        .map(|el| el.selected.unwrap_or_else(|| el.has_attr("selected")))
                        .unwrap_or(false),
                }
            })
            .collect();

        if !multiple {
            match states.iter().rposition(|s| s.selected) {
                Some(last) => {
                    for (i, s) in states.iter_mut().enumerate() {
                        s.selected = i == last;
                    }
                }
                None => {
                    let first_enabled = options.iter().position(|&o| {
                        !self.element(o).is_some_and(|el| el.has_attr("disabled"))
                    });
                    if let Some(i) = first_enabled {
                        states[i].selected = true;
                    }
                }
            }
        }
        states
    }

    /// The control's `value` property.
    fn current_value(&self, id: ElementId) -> String {
        let Some(el) = self.element(id) else {
            return String::new();
        };
        match el.name.as_str() {
            "select" => self
                .option_states(id)
                .into_iter()
                .find(|o| o.selected)
                .map(|o| o.value)
                .unwrap_or_default(),
            "textarea" => el.value.clone().unwrap_or_else(|| self.text_content(id)),
            _ => match &el.value {
                Some(v) => v.clone(),
                None => match el.attr("value") {
                    Some(v) => v.to_string(),
                    None if matches!(el.control_type().as_str(), "checkbox" | "radio") => {
                        "on".to_string()
                    }
                    None => String::new(),
                },
            },
        }
    }

    fn is_checked(&self, id: ElementId) -> bool {
        self.element(id)
            .map(|el| el.checked.unwrap_or_else(|| el.has_attr("checked")))
            .unwrap_or(false)
    }

    fn is_connected(&self, id: ElementId) -> bool {
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            cur = p;
        }
        cur.0 == 0 && self.element(id).is_some()
    }

    /// Best-effort human-readable label, first source that applies wins.
    fn resolve_label(&self, id: ElementId) -> String {
        let Some(el) = self.element(id) else {
            return String::new();
        };
        let value = self.current_value(id);

        // <label for=…>
        if let Some(html_id) = el.attr("id").filter(|s| !s.is_empty()) {
            let bound = self.elements().into_iter().find(|&e| {
                self.element(e)
                    .is_some_and(|l| l.name == "label" && l.attr("for") == Some(html_id))
            });
            if let Some(label) = bound {
                return self.text_content(label).trim().to_string();
            }
        }

        // wrapping <label>
        if let Some(label) = self.closest(id, "label") {
            return strip_value(&self.text_content(label), &value).trim().to_string();
        }

        for sib in self.preceding_siblings(id) {
            let text = self.text_content(sib);
            let is_label = self.element(sib).is_some_and(|s| s.name == "label");
            if is_label || !text.trim().is_empty() {
                return text.trim().to_string();
            }
        }

        if let Some(parent) = self.parent(id) {
            let text = strip_value(&self.text_content(parent), &value).trim().to_string();
            if text.chars().count() < PARENT_TEXT_LIMIT {
                return text;
            }
        }

        String::new()
    }

    fn selector_for(&self, id: ElementId, form: Option<(usize, ElementId)>) -> String {
        let Some(el) = self.element(id) else {
            return String::new();
        };
        if let Some(html_id) = el.attr("id").filter(|s| !s.is_empty()) {
            return format!("#{}", html_id);
        }
        if let Some(name) = el.attr("name").filter(|s| !s.is_empty()) {
            return format!("[name=\"{}\"]", name);
        }
        match form {
            Some((form_index, form_el)) => {
                let ordinal = self
                    .descendants(form_el)
                    .into_iter()
                    .filter(|&e| self.element(e).is_some_and(|c| c.name == el.name))
                    .position(|e| e == id)
                    .unwrap_or(0);
                format!(
                    "form:nth-of-type({}) {}:nth-of-type({})",
                    form_index + 1,
                    el.name,
                    ordinal + 1
                )
            }
            None => el.name.clone(),
        }
    }

    fn describe(
        &self,
        id: ElementId,
        form: Option<(usize, ElementId)>,
        input_index: usize,
    ) -> Option<Control> {
        let el = self.element(id)?;
        let text_attr = |name: &str| el.attr(name).unwrap_or("").to_string();
        Some(Control {
            element: id,
            form_index: form.map(|(i, _)| i),
            input_index,
            input_type: el.control_type(),
            name: text_attr("name"),
            id: text_attr("id"),
            placeholder: text_attr("placeholder"),
            label: self.resolve_label(id),
            required: el.has_attr("required"),
            selector: self.selector_for(id, form),
        })
    }

    /// Uncheck the other radios sharing `id`'s name within the same form.
    fn clear_radio_group(&mut self, id: ElementId) {
        let Some(name) = self
            .element(id)
            .and_then(|el| el.attr("name"))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
        else {
            return;
        };
        let owner = self.closest(id, "form");
        let peers: Vec<ElementId> = self
            .elements()
            .into_iter()
            .filter(|&e| e != id)
            .filter(|&e| {
                self.element(e).is_some_and(|el| {
                    el.name == "input"
                        && el.control_type() == "radio"
                        && el.attr("name") == Some(name.as_str())
                })
            })
            .filter(|&e| self.closest(e, "form") == owner)
            .collect();
        for peer in peers {
            if let Some(el) = self.element_mut(peer) {
                el.checked = Some(false);
            }
        }
    }
}

fn strip_value(text: &str, value: &str) -> String {
    if value.is_empty() {
        text.to_string()
    } else {
        text.replacen(value, "", 1)
    }
}

/// Browser sanitization for `<input type=number>`: anything that is not a
/// finite number becomes empty.
fn sanitize_number(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && !value.starts_with('+') => value.to_string(),
        _ => String::new(),
    }
}

impl FormPage for Document {
    fn controls(&self) -> Vec<Control> {
        let mut out = Vec::new();

        for (form_index, form) in self.forms().into_iter().enumerate() {
            let controls = self
                .descendants(form)
                .into_iter()
                .filter(|&e| self.is_control(e));
            for (input_index, id) in controls.enumerate() {
                out.extend(self.describe(id, Some((form_index, form)), input_index));
            }
        }

        let standalone = self
            .elements()
            .into_iter()
            .filter(|&e| self.is_control(e) && self.closest(e, "form").is_none());
        for (input_index, id) in standalone.enumerate() {
            out.extend(self.describe(id, None, input_index));
        }

        out
    }

    fn widget(&self, element: ElementId) -> Option<Widget> {
        if !self.is_connected(element) || !self.is_control(element) {
            return None;
        }
        let el = self.element(element)?;
        let kind = WidgetKind::from_type(&el.control_type());
        let options = if el.name == "select" {
            self.option_states(element)
        } else {
            Vec::new()
        };
        Some(Widget {
            kind,
            value: self.current_value(element),
            checked: self.is_checked(element),
            options,
        })
    }

    fn set_value(&mut self, element: ElementId, value: &str) -> Result<()> {
        let el = self
            .element_mut(element)
            .context("element is no longer in the document")?;
        match el.name.as_str() {
            "textarea" => el.value = Some(value.to_string()),
            "input" => match el.control_type().as_str() {
                "file" if !value.is_empty() => bail!(
                    "this input accepts a filename, which may only be set to the empty string"
                ),
                "number" => el.value = Some(sanitize_number(value)),
                _ => el.value = Some(value.to_string()),
            },
            other => bail!("<{}> does not hold a text value", other),
        }
        Ok(())
    }

    fn set_checked(&mut self, element: ElementId, checked: bool) -> Result<()> {
        let kind = self
            .element(element)
            .context("element is no longer in the document")?
            .control_type();
        if kind != "checkbox" && kind != "radio" {
            bail!("{} input cannot be checked", kind);
        }
        if kind == "radio" && checked {
            self.clear_radio_group(element);
        }
        if let Some(el) = self.element_mut(element) {
            el.checked = Some(checked);
        }
        Ok(())
    }

    fn select_option(&mut self, element: ElementId, index: usize) -> Result<()> {
        let el = self
            .element(element)
            .context("element is no longer in the document")?;
        if el.name != "select" {
            bail!("<{}> has no options", el.name);
        }
        let multiple = el.has_attr("multiple");
        let options = self.option_elements(element);
        let Some(&target) = options.get(index) else {
            bail!("option {} out of range ({} options)", index, options.len());
        };

        if !multiple {
            for &o in &options {
                if let Some(opt) = self.element_mut(o) {
                    opt.selected = Some(false);
                }
            }
        } else {
            // Freeze current selectedness so the new pick adds to it.
            let states = self.option_states(element);
            for (&o, state) in options.iter().zip(states) {
                if let Some(opt) = self.element_mut(o) {
                    opt.selected = Some(state.selected);
                }
            }
        }
        if let Some(opt) = self.element_mut(target) {
            opt.selected = Some(true);
        }
        Ok(())
    }

    fn focus(&mut self, element: ElementId) {
        self.record(element, EventKind::Focus);
    }

    fn dispatch(&mut self, element: ElementId, event: EventKind) {
        self.record(element, event);
    }
}

// ── Tests ──
