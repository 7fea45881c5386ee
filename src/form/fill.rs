use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::detect::detect;
use super::value::{lookup, normalize_date, to_text, truthy};
use super::{EventKind, Field, FormPage, OptionState, WidgetKind};

/// Pause after each successful write.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct FillOptions {
    pub settle: Duration,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillReport {
    pub success: bool,
    pub filled_count: usize,
    pub total_fields: usize,
    pub errors: Vec<String>,
}

/// Fill every detected field that has a value in `profile`.
///
/// Fields are re-detected first, so the page may have changed since the last
/// `detect`. A field whose path is missing from the profile is skipped; a
/// field whose write fails is reported in `errors` and the pass continues.
/// Only a missing profile fails the whole call.
pub async fn fill<P: FormPage + ?Sized>(
    page: &mut P,
    profile: &Value,
    options: &FillOptions,
) -> Result<FillReport> {
    if !truthy(profile) {
        bail!("No profile data provided");
    }

    let fields = detect(page);
    let mut filled_count = 0;
    let mut errors = Vec::new();

    for field in &fields {
        if !field.category.is_known() {
            continue;
        }
        let Some(value) = lookup(profile, field.category).filter(|v| !v.is_null()) else {
            continue;
        };

        match write_field(page, field, value) {
            Ok(()) => {
                filled_count += 1;
                if !options.settle.is_zero() {
                    tokio::time::sleep(options.settle).await;
                }
            }
            Err(e) => {
                warn!("Failed to fill {} ({}): {:#}", field.category, field.selector, e);
                errors.push(format!("Failed to fill {}: {:#}", field.category, e));
            }
        }
    }

    info!(
        "Filled {} of {} fields ({} errors)",
        filled_count,
        fields.len(),
        errors.len()
    );

    Ok(FillReport {
        success: true,
        filled_count,
        total_fields: fields.len(),
        errors,
    })
}

/// Write one value according to the widget's kind, then fire
/// input → change → blur on it.
fn write_field<P: FormPage + ?Sized>(page: &mut P, field: &Field, value: &Value) -> Result<()> {
    let el = field.element;
    let widget = page
        .widget(el)
        .context("element is no longer in the document")?;

    page.focus(el);

    match widget.kind {
        WidgetKind::SelectOne | WidgetKind::SelectMultiple => {
            match match_option(&widget.options, value) {
                Some(index) => page.select_option(el, index)?,
                None => debug!("No option of {} matches {}", field.selector, value),
            }
        }
        WidgetKind::Checkbox => page.set_checked(el, truthy(value))?,
        WidgetKind::Radio => {
            if value.as_str() == Some(widget.value.as_str()) {
                page.set_checked(el, true)?;
            }
        }
        WidgetKind::Date => match normalize_date(value) {
            Some(date) => page.set_value(el, &date)?,
            None => debug!("Skipping unparseable date for {}: {}", field.selector, value),
        },
        WidgetKind::File | WidgetKind::Number | WidgetKind::Text => {
            page.set_value(el, &to_text(value))?
        }
    }

    for event in [EventKind::Input, EventKind::Change, EventKind::Blur] {
        page.dispatch(el, event);
    }
    Ok(())
}

/// Exact value-or-text match first, then a case-insensitive substring match.
pub fn match_option(options: &[OptionState], value: &Value) -> Option<usize> {
    if let Some(s) = value.as_str() {
        if let Some(i) = options.iter().position(|o| o.value == s || o.text == s) {
            return Some(i);
        }
    }

    let needle = to_text(value).to_lowercase();
    options.iter().position(|o| {
        o.value.to_lowercase().contains(&needle) || o.text.to_lowercase().contains(&needle)
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomEvent, Document};
    use crate::form::extract::extract;
    use crate::form::{Category, ElementId};
    use serde_json::json;

    fn no_wait() -> FillOptions {
        FillOptions {
            settle: Duration::ZERO,
        }
    }

    fn opt(value: &str, text: &str) -> OptionState {
        OptionState {
            value: value.into(),
            text: text.into(),
            selected: false,
        }
    }

    fn profile() -> Value {
        let raw = std::fs::read_to_string("tests/fixtures/profile.json").unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn greenhouse() -> Document {
        let html = std::fs::read_to_string("tests/fixtures/greenhouse.html").unwrap();
        Document::parse(&html)
    }

    fn value_of(doc: &Document, id: &str) -> String {
        doc.widget(doc.element_by_id(id).unwrap()).unwrap().value
    }

    #[test]
    fn option_matching_prefers_exact() {
        let options = vec![opt("USA-East", "US East"), opt("US", "United States")];
        assert_eq!(match_option(&options, &json!("US")), Some(1));
        assert_eq!(match_option(&options, &json!("united states")), Some(1));
        assert_eq!(match_option(&options, &json!("us")), Some(0));
        assert_eq!(match_option(&options, &json!("Mexico")), None);
    }

    #[test]
    fn option_matching_coerces_numbers() {
        let options = vec![opt("", "Select"), opt("5", "5 years"), opt("10", "10+ years")];
        assert_eq!(match_option(&options, &json!(10)), Some(2));
    }

    #[tokio::test]
    async fn case_mismatched_select_uses_substring_fallback() {
        let mut doc = Document::parse(
            r#"<form><label for="country">Country</label>
               <select id="country"><option value="">Pick</option><option value="US">United States</option></select></form>"#,
        );
        let p = json!({"personalInfo": {"address": {"country": "united states"}}});
        let report = fill(&mut doc, &p, &no_wait()).await.unwrap();
        assert_eq!(report.filled_count, 1);
        assert_eq!(value_of(&doc, "country"), "US");
    }

    #[tokio::test]
    async fn fills_greenhouse_form() {
        let mut doc = greenhouse();
        let report = fill(&mut doc, &profile(), &no_wait()).await.unwrap();

        assert!(report.success);
        assert_eq!(report.total_fields, 13);
        assert_eq!(value_of(&doc, "first_name"), "Ada");
        assert_eq!(value_of(&doc, "last_name"), "Lovelace");
        assert_eq!(value_of(&doc, "email"), "ada@example.com");
        assert_eq!(value_of(&doc, "city"), "London");
        assert_eq!(value_of(&doc, "country"), "CA");
        assert_eq!(value_of(&doc, "start_date"), "2024-09-01");
        assert_eq!(value_of(&doc, "favorite_color"), "");
        assert!(value_of(&doc, "cover_letter").starts_with("Dear hiring team"));
        assert_eq!(value_of(&doc, "newsletter_email"), "ada@example.com");
    }

    #[tokio::test]
    async fn failing_field_does_not_block_the_rest() {
        let mut doc = Document::parse(
            r#"<form>
                 <input id="first_name">
                 <input type="file" id="cover_letter">
                 <input id="last_name">
               </form>"#,
        );
        let p = json!({
            "personalInfo": {"firstName": "Ada", "lastName": "Lovelace"},
            "application": {"coverLetter": "Dear hiring team"}
        });
        let report = fill(&mut doc, &p, &no_wait()).await.unwrap();

        assert_eq!(report.total_fields, 3);
        assert_eq!(report.filled_count, 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Failed to fill application.coverLetter"));
        assert_eq!(value_of(&doc, "last_name"), "Lovelace");
    }

    #[tokio::test]
    async fn unknown_fields_are_never_written() {
        let mut doc = Document::parse(r#"<form><input id="favorite_color"></form>"#);
        let p = json!({"unknown": "red", "favorite_color": "red"});
        let report = fill(&mut doc, &p, &no_wait()).await.unwrap();
        assert_eq!(report.total_fields, 1);
        assert_eq!(report.filled_count, 0);
        assert_eq!(value_of(&doc, "favorite_color"), "");
        assert!(doc.events().is_empty());
    }

    #[tokio::test]
    async fn events_fire_in_order() {
        let mut doc = Document::parse(r#"<form><input id="email"></form>"#);
        let p = json!({"personalInfo": {"email": "ada@example.com"}});
        fill(&mut doc, &p, &no_wait()).await.unwrap();

        let target = doc.element_by_id("email").unwrap();
        let kinds: Vec<EventKind> = doc
            .events()
            .iter()
            .map(|e: &DomEvent| {
                assert_eq!(e.target, target);
                e.kind
            })
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::Focus, EventKind::Input, EventKind::Change, EventKind::Blur]
        );
    }

    #[tokio::test]
    async fn missing_profile_fails_whole_operation() {
        let mut doc = greenhouse();
        let err = fill(&mut doc, &Value::Null, &no_wait()).await.unwrap_err();
        assert_eq!(err.to_string(), "No profile data provided");
        assert!(doc.events().is_empty());
    }

    #[tokio::test]
    async fn widget_kinds() {
        let mut doc = Document::parse(
            r#"<form>
                 <input type="checkbox" id="skills_checkbox" name="skill">
                 <input type="radio" name="degree" id="bs" value="BS">
                 <input type="radio" name="degree" id="ms" value="MS">
                 <input type="date" id="graduation">
                 <input type="date" id="end_date">
                 <select id="languages" multiple>
                   <option value="en">English</option><option value="fr">French</option>
                 </select>
               </form>"#,
        );
        let p = json!({
            "skills": {"technical": ["Rust"], "languages": "French"},
            "education": {"degree": "MS", "graduationDate": "May 15, 2020"},
            "workExperience": {"endDate": "whenever"}
        });
        let report = fill(&mut doc, &p, &no_wait()).await.unwrap();
        assert!(report.errors.is_empty());

        let w = |id: &str| doc.widget(doc.element_by_id(id).unwrap()).unwrap();
        assert!(w("skills_checkbox").checked);
        assert!(!w("bs").checked);
        assert!(w("ms").checked);
        assert_eq!(w("graduation").value, "2020-05-15");
        assert_eq!(w("end_date").value, "");
        let langs: Vec<bool> = w("languages").options.iter().map(|o| o.selected).collect();
        assert_eq!(langs, vec![false, true]);
    }

    #[tokio::test]
    async fn fill_then_extract_is_a_subset() {
        let mut doc = greenhouse();
        let p = profile();
        fill(&mut doc, &p, &no_wait()).await.unwrap();
        let extracted = extract(&doc);

        fn assert_subset(part: &Value, whole: &Value, path: &str) {
            match part {
                Value::Object(map) => {
                    for (k, v) in map {
                        let sub = whole.get(k).unwrap_or_else(|| panic!("{}.{} not in profile", path, k));
                        assert_subset(v, sub, &format!("{}.{}", path, k));
                    }
                }
                leaf => assert_eq!(leaf, whole, "value at {}", path),
            }
        }
        assert_subset(&extracted, &p, "");
        assert!(extracted.get("education").is_none());
        assert_eq!(
            crate::form::value::lookup(&extracted, Category::FirstName),
            Some(&json!("Ada"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn settles_between_writes() {
        let mut doc = Document::parse(r#"<form><input id="first_name"><input id="last_name"></form>"#);
        let p = json!({"personalInfo": {"firstName": "Ada", "lastName": "Lovelace"}});
        let started = tokio::time::Instant::now();
        fill(&mut doc, &p, &FillOptions::default()).await.unwrap();
        assert!(started.elapsed() >= DEFAULT_SETTLE * 2);
    }

    #[test]
    fn stale_element_is_an_error() {
        let mut doc = Document::parse(r#"<form><input id="email"></form>"#);
        let field = Field {
            element: ElementId(9999),
            form_index: Some(0),
            input_index: 0,
            input_type: "text".into(),
            name: String::new(),
            id: "email".into(),
            placeholder: String::new(),
            label: String::new(),
            required: false,
            category: Category::Email,
            selector: "#email".into(),
        };
        let err = write_field(&mut doc, &field, &json!("a@b.co")).unwrap_err();
        assert!(err.to_string().contains("no longer"));
    }
}
