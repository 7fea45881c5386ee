//! How much of a detected form the classifier understood.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::classify::{classify, FieldText};
use super::Field;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9]+").unwrap());

/// Shorter words are ignored when looking for repeats in unmapped names.
const MIN_WORD_LEN: usize = 3;
/// Names listed in one suggestion.
const SAMPLE: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub total: usize,
    pub mapped: usize,
    /// Names of fields classified as `unknown`.
    pub unmapped: Vec<String>,
    /// Mapped fields whose name and id alone would not classify the same way.
    pub weak: Vec<String>,
    /// Mapped fields per top-level profile section.
    pub by_section: BTreeMap<String, usize>,
    pub suggestions: Vec<String>,
}

impl Coverage {
    /// Share of fields that mapped to a category, 0 for an empty form.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.mapped as f64 / self.total as f64
        }
    }
}

fn display_name(field: &Field) -> &str {
    [&field.name, &field.id, &field.selector]
        .into_iter()
        .find(|s| !s.is_empty())
        .map_or("", |s| s.as_str())
}

pub fn analyze(fields: &[Field]) -> Coverage {
    let mut cov = Coverage {
        total: fields.len(),
        ..Coverage::default()
    };

    for field in fields {
        let name = display_name(field).to_string();
        if !field.category.is_known() {
            cov.unmapped.push(name);
            continue;
        }
        cov.mapped += 1;
        if let Some(section) = field.category.segments().next() {
            *cov.by_section.entry(section.to_string()).or_default() += 1;
        }
        let by_attrs = classify(&FieldText {
            name: &field.name,
            id: &field.id,
            ..FieldText::default()
        });
        if by_attrs != field.category {
            cov.weak.push(name);
        }
    }

    cov.suggestions = suggestions(&cov);
    cov
}

fn suggestions(cov: &Coverage) -> Vec<String> {
    let mut out = Vec::new();

    if !cov.unmapped.is_empty() {
        out.push(format!(
            "Found {} unmapped fields out of {} total",
            cov.unmapped.len(),
            cov.total
        ));
    }

    if !cov.weak.is_empty() {
        out.push(format!(
            "Review {} mappings matched only by label or placeholder: {}",
            cov.weak.len(),
            sample(cov.weak.iter().map(String::as_str))
        ));
    }

    let mut words: BTreeMap<String, usize> = BTreeMap::new();
    for name in &cov.unmapped {
        let lower = name.to_lowercase();
        for word in WORD_RE.find_iter(&lower) {
            if word.len() >= MIN_WORD_LEN {
                *words.entry(word.as_str().to_string()).or_default() += 1;
            }
        }
    }
    let repeated: Vec<&str> = words
        .iter()
        .filter(|(_, n)| **n > 1)
        .map(|(w, _)| w.as_str())
        .collect();
    if !repeated.is_empty() {
        out.push(format!(
            "Consider adding rules for words repeated across unmapped fields: {}",
            sample(repeated.into_iter())
        ));
    }

    out
}

fn sample<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.take(SAMPLE).collect::<Vec<_>>().join(", ")
}

// ── Tests ──
