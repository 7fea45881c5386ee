pub mod category;
pub mod classify;
pub mod coverage;
pub mod detect;
pub mod extract;
pub mod fill;
pub mod value;

use std::fmt;

use anyhow::Result;
use serde::Serialize;

pub use category::Category;
pub use coverage::{analyze, Coverage};
pub use detect::detect;
pub use extract::extract;
pub use fill::{fill, FillOptions, FillReport};

/// Opaque handle to an element owned by a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

/// One form control as a page adapter sees it, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub element: ElementId,
    /// `None` for controls outside any form.
    pub form_index: Option<usize>,
    pub input_index: usize,
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub label: String,
    pub required: bool,
    pub selector: String,
}

/// A detected, classified input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(skip)]
    pub element: ElementId,
    pub form_index: Option<usize>,
    pub input_index: usize,
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub label: String,
    pub required: bool,
    pub category: Category,
    pub selector: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    SelectOne,
    SelectMultiple,
    Checkbox,
    Radio,
    Date,
    File,
    Number,
    Text,
}

impl WidgetKind {
    /// Map a control's `type` (as `Field::input_type` reports it) to a kind.
    pub fn from_type(input_type: &str) -> WidgetKind {
        match input_type {
            "select-one" => WidgetKind::SelectOne,
            "select-multiple" => WidgetKind::SelectMultiple,
            "checkbox" => WidgetKind::Checkbox,
            "radio" => WidgetKind::Radio,
            "date" => WidgetKind::Date,
            "file" => WidgetKind::File,
            "number" => WidgetKind::Number,
            _ => WidgetKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionState {
    pub value: String,
    pub text: String,
    pub selected: bool,
}

/// Live state of one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    pub kind: WidgetKind,
    pub value: String,
    pub checked: bool,
    pub options: Vec<OptionState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Focus,
    Input,
    Change,
    Blur,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Focus => "focus",
            EventKind::Input => "input",
            EventKind::Change => "change",
            EventKind::Blur => "blur",
        })
    }
}

/// The tree the engine works against. Enumeration, label lookup and selectors
/// are the adapter's job; the engine only decides what to write.
pub trait FormPage {
    /// Every input, select and textarea: form controls in form order first,
    /// then controls outside any form.
    fn controls(&self) -> Vec<Control>;

    /// `None` once the element is gone from the page.
    fn widget(&self, element: ElementId) -> Option<Widget>;

    fn set_value(&mut self, element: ElementId, value: &str) -> Result<()>;

    fn set_checked(&mut self, element: ElementId, checked: bool) -> Result<()>;

    /// Select the option at `index` (within `Widget::options`).
    fn select_option(&mut self, element: ElementId, index: usize) -> Result<()>;

    fn focus(&mut self, element: ElementId);

    fn dispatch(&mut self, element: ElementId, event: EventKind);
}
