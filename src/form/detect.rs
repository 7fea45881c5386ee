use tracing::debug;

use super::classify::{classify, FieldText};
use super::{Control, Field, FormPage};

/// Control types that never carry profile data.
const SKIPPED_TYPES: &[&str] = &["hidden", "submit", "button"];

impl Field {
    pub fn from_control(control: Control) -> Field {
        let category = classify(&FieldText {
            name: &control.name,
            id: &control.id,
            placeholder: &control.placeholder,
            label: &control.label,
        });
        Field {
            element: control.element,
            form_index: control.form_index,
            input_index: control.input_index,
            input_type: control.input_type,
            name: control.name,
            id: control.id,
            placeholder: control.placeholder,
            label: control.label,
            required: control.required,
            category,
            selector: control.selector,
        }
    }
}

/// Enumerate and classify every fillable control on the page. Built fresh on
/// each call; callers must not hold on to the result across page mutations.
pub fn detect<P: FormPage + ?Sized>(page: &P) -> Vec<Field> {
    let fields: Vec<Field> = page
        .controls()
        .into_iter()
        .filter(|c| !SKIPPED_TYPES.contains(&c.input_type.as_str()))
        .map(Field::from_control)
        .collect();

    debug!(
        "Detected {} form fields ({} classified)",
        fields.len(),
        fields.iter().filter(|f| f.category.is_known()).count()
    );
    fields
}

// ── Tests ──
