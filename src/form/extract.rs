use serde_json::{Map, Value};
use tracing::debug;

use super::detect::detect;
use super::value::insert;
use super::{FormPage, Widget, WidgetKind};

/// Read the page's current values back into a profile-shaped object.
///
/// Unknown fields and blank values (empty text, empty selections) are left
/// out. Checkboxes always report a boolean, so an unticked box reads `false`.
pub fn extract<P: FormPage + ?Sized>(page: &P) -> Value {
    let mut data = Map::new();

    for field in detect(page) {
        if !field.category.is_known() {
            continue;
        }
        let Some(widget) = page.widget(field.element) else {
            continue;
        };
        if let Some(value) = read_widget(&widget) {
            insert(&mut data, field.category, value);
        }
    }

    debug!("Extracted {} top-level sections", data.len());
    Value::Object(data)
}

/// The widget's value as profile data, or `None` when it holds nothing.
pub fn read_widget(widget: &Widget) -> Option<Value> {
    match widget.kind {
        WidgetKind::Checkbox => Some(Value::Bool(widget.checked)),
        WidgetKind::Radio => (widget.checked && !widget.value.is_empty())
            .then(|| Value::String(widget.value.clone())),
        WidgetKind::SelectOne => widget
            .options
            .iter()
            .find(|o| o.selected)
            .filter(|o| !o.value.is_empty())
            .map(|o| Value::String(o.value.clone())),
        WidgetKind::SelectMultiple => {
            let values: Vec<Value> = widget
                .options
                .iter()
                .filter(|o| o.selected)
                .map(|o| Value::String(o.value.clone()))
                .collect();
            (!values.is_empty()).then_some(Value::Array(values))
        }
        WidgetKind::Date | WidgetKind::File | WidgetKind::Number | WidgetKind::Text => {
            (!widget.value.is_empty()).then(|| Value::String(widget.value.clone()))
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use serde_json::json;

    #[test]
    fn blank_form_extracts_nothing() {
        let html = std::fs::read_to_string("tests/fixtures/greenhouse.html").unwrap();
        let doc = Document::parse(&html);
        assert_eq!(extract(&doc), json!({}));
    }

    #[test]
    fn reads_prefilled_values() {
        let doc = Document::parse(
            r#"<form>
                 <label for="fn">First name</label><input id="fn" value="Ada">
                 <label for="city">City</label><input id="city" value="London">
                 <label for="country">Country</label>
                 <select id="country"><option value="">-</option><option value="UK" selected>United Kingdom</option></select>
                 <label for="langs">Languages</label>
                 <select id="langs" multiple><option value="en" selected>English</option><option value="fr" selected>French</option></select>
                 <label><input type="checkbox" name="relocate_skill" checked> Skills relocation</label>
                 <label for="notes">Favourite colour</label><input id="notes" value="teal">
               </form>"#,
        );
        assert_eq!(
            extract(&doc),
            json!({
                "personalInfo": {
                    "firstName": "Ada",
                    "address": {"city": "London", "country": "UK"}
                },
                "skills": {"languages": ["en", "fr"], "technical": true}
            })
        );
    }

    #[test]
    fn radio_reports_checked_member_only() {
        let doc = Document::parse(
            r#"<form>
                 <input type="radio" name="degree" value="BS">
                 <input type="radio" name="degree" value="MS" checked>
                 <input type="radio" name="degree" value="PhD">
               </form>"#,
        );
        assert_eq!(extract(&doc), json!({"education": {"degree": "MS"}}));
    }

    #[test]
    fn read_widget_blank_cases() {
        let blank = |kind| Widget {
            kind,
            value: String::new(),
            checked: false,
            options: Vec::new(),
        };
        for kind in [
            WidgetKind::Radio,
            WidgetKind::SelectOne,
            WidgetKind::SelectMultiple,
            WidgetKind::Text,
            WidgetKind::Date,
        ] {
            assert_eq!(read_widget(&blank(kind)), None, "{:?}", kind);
        }
        assert_eq!(read_widget(&blank(WidgetKind::Checkbox)), Some(Value::Bool(false)));
    }

    #[test]
    fn unticked_checkbox_reads_false() {
        let doc = Document::parse(r#"<form><input type="checkbox" name="skill"></form>"#);
        assert_eq!(extract(&doc), json!({"skills": {"technical": false}}));
    }

    #[tokio::test]
    async fn cleared_checkbox_round_trips_false() {
        let mut doc = Document::parse(r#"<form><input type="checkbox" name="skill" checked></form>"#);
        let profile = json!({"skills": {"technical": false}});
        let options = crate::form::FillOptions {
            settle: std::time::Duration::ZERO,
        };
        let report = crate::form::fill(&mut doc, &profile, &options).await.unwrap();
        assert_eq!(report.filled_count, 1);
        assert_eq!(extract(&doc), profile);
    }
}
