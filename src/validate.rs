//! Profile validation: structural checks on a whole profile, and per-value
//! format checks for what a fill is about to write.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::form::value::{lookup, to_text, truthy};
use crate::form::{Category, Field};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});
static PHONE_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{0,15}$").unwrap());
static PHONE_NOISE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-\(\)]").unwrap());
static PROFILE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap());
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d{4}-\d{2}-\d{2}$|^present$|^current$").unwrap());

static PHONE_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\+]?[1-9]?[\d\s\-\(\)\.]{7,15}$").unwrap());
static URL_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());
static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$|^[A-Z]\d[A-Z]\s?\d[A-Z]\d$").unwrap());
static GPA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d\.\d{1,2}$|^[0-4]\.\d{1,2}$").unwrap());
static SALARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?\d{1,3}(,\d{3})*(\.\d{2})?$").unwrap());

const KNOWN_SECTIONS: &[&str] = &[
    "personalInfo",
    "workExperience",
    "education",
    "skills",
    "application",
    "metadata",
];
const SKILL_LISTS: &[&str] = &["technical", "languages", "certifications", "softSkills"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn report(&self) -> String {
        let mut out = vec!["=".repeat(50), "PROFILE VALIDATION".to_string(), "=".repeat(50)];
        out.push(if self.is_valid() { "PASSED" } else { "FAILED" }.to_string());

        if !self.errors.is_empty() {
            out.push(format!("\nErrors ({}):", self.errors.len()));
            for (i, e) in self.errors.iter().enumerate() {
                out.push(format!("  {}. {}", i + 1, e));
            }
        }
        if !self.warnings.is_empty() {
            out.push(format!("\nWarnings ({}):", self.warnings.len()));
            for (i, w) in self.warnings.iter().enumerate() {
                out.push(format!("  {}. {}", i + 1, w));
            }
        }
        if self.errors.is_empty() && self.warnings.is_empty() {
            out.push("\nNo issues found.".to_string());
        }
        out.join("\n")
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

// ── Whole-profile checks ──

pub fn validate_profile(profile: &Value) -> Validation {
    let mut v = Validation::default();
    let Some(sections) = profile.as_object() else {
        v.error("Profile data must be an object");
        return v;
    };

    let section = |name: &str| sections.get(name).unwrap_or(&Value::Null);
    personal_info(&mut v, section("personalInfo"));
    work_experience(&mut v, section("workExperience"));
    education(&mut v, section("education"));
    skills(&mut v, section("skills"));

    let unknown: Vec<&str> = sections
        .keys()
        .map(String::as_str)
        .filter(|k| !KNOWN_SECTIONS.contains(k))
        .collect();
    if !unknown.is_empty() {
        v.warn(format!("Unknown sections found: {}", unknown.join(", ")));
    }
    v
}

/// Presence check where empty lists and objects also count as missing.
fn present(value: &Value) -> bool {
    match value {
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        other => truthy(other),
    }
}

fn str_of<'a>(obj: &'a Value, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or("")
}

fn require(v: &mut Validation, obj: &Value, keys: &[&str], prefix: &str) {
    for key in keys {
        if !obj.get(*key).is_some_and(present) {
            v.error(format!("{}: {} is required", prefix, key));
        }
    }
}

fn personal_info(v: &mut Validation, info: &Value) {
    if !present(info) {
        v.error("Personal information section is required");
        return;
    }
    require(v, info, &["firstName", "lastName", "email"], "Personal info");

    let email = str_of(info, "email");
    if !email.is_empty() && !EMAIL_RE.is_match(email) {
        v.error(format!("Personal info: Invalid email format: {}", email));
    }

    let phone = str_of(info, "phone");
    if !phone.is_empty() && !PHONE_DIGITS_RE.is_match(&PHONE_NOISE_RE.replace_all(phone, "")) {
        v.warn(format!("Personal info: Phone number format may be invalid: {}", phone));
    }

    for key in ["linkedin", "website"] {
        let url = str_of(info, key);
        if !url.is_empty() && !PROFILE_URL_RE.is_match(url) {
            v.error(format!("Personal info: Invalid {} URL format: {}", key, url));
        }
    }

    if let Some(address) = info.get("address").filter(|a| a.is_object()) {
        if address.get("street").is_some_and(|s| !present(s)) {
            v.warn("Personal info: Address street is empty");
        }
    }
}

fn check_date(v: &mut Validation, entry: &Value, key: &str, label: &str, prefix: &str) {
    let date = str_of(entry, key);
    if !date.is_empty() && !DATE_RE.is_match(date) {
        v.error(format!("{}: Invalid {} format: {}", prefix, label, date));
    }
}

fn work_experience(v: &mut Validation, work: &Value) {
    if !present(work) {
        v.warn("Work experience section is empty");
        return;
    }
    let positions = work.get("positions").unwrap_or(&Value::Null);
    if !present(positions) {
        v.warn("No work positions found");
        return;
    }
    let Some(positions) = positions.as_array() else {
        v.error("Work experience positions must be a list");
        return;
    };

    for (i, position) in positions.iter().enumerate() {
        let prefix = format!("Position {}", i + 1);
        if !position.is_object() {
            v.error(format!("{}: Must be an object", prefix));
            continue;
        }
        require(v, position, &["company", "title", "startDate"], &prefix);
        check_date(v, position, "startDate", "start date", &prefix);
        check_date(v, position, "endDate", "end date", &prefix);

        let (start, end) = (str_of(position, "startDate"), str_of(position, "endDate"));
        let ongoing = matches!(end.to_lowercase().as_str(), "present" | "current");
        if !start.is_empty() && !end.is_empty() && !ongoing && start > end {
            v.warn(format!("{}: Start date is after end date", prefix));
        }
    }
}

fn education(v: &mut Validation, edu: &Value) {
    if !present(edu) {
        v.warn("Education section is empty");
        return;
    }
    let schools = edu.get("schools").unwrap_or(&Value::Null);
    if !present(schools) {
        v.warn("No educational institutions found");
        return;
    }
    let Some(schools) = schools.as_array() else {
        v.error("Education schools must be a list");
        return;
    };

    for (i, school) in schools.iter().enumerate() {
        let prefix = format!("School {}", i + 1);
        if !school.is_object() {
            v.error(format!("{}: Must be an object", prefix));
            continue;
        }
        require(v, school, &["institution", "degree", "fieldOfStudy"], &prefix);
        check_date(v, school, "graduationDate", "graduation date", &prefix);

        let Some(gpa) = school.get("gpa").filter(|g| present(g)) else {
            continue;
        };
        let parsed = match gpa {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(g) if (0.0..=4.0).contains(&g) => {}
            Some(_) => v.warn(format!(
                "{}: GPA {} seems unusual (expected 0-4.0)",
                prefix,
                to_text(gpa)
            )),
            None => v.error(format!("{}: Invalid GPA format: {}", prefix, to_text(gpa))),
        }
    }
}

fn skills(v: &mut Validation, skills: &Value) {
    if !present(skills) {
        v.warn("Skills section is empty");
        return;
    }
    if !SKILL_LISTS.iter().any(|k| skills.get(*k).is_some_and(present)) {
        v.warn("No skills found in any category");
    }

    if let Some(technical) = skills.get("technical").filter(|t| present(t)) {
        if !technical.is_array() {
            v.error("Technical skills must be a list");
        }
    }

    if let Some(languages) = skills.get("languages").filter(|l| present(l)) {
        match languages.as_array() {
            None => v.error("Languages must be a list"),
            Some(entries) => {
                for entry in entries {
                    if entry.is_object() && entry.get("language").is_none() {
                        v.warn("Language entry missing 'language' field");
                    }
                }
            }
        }
    }
}

// ── Per-value checks ──

/// Check one field value against the format its category expects.
/// Blank values always pass; categories without a format always pass.
pub fn validate_value(category: Category, value: &str) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }

    let (re, msg): (&Regex, &str) = match category {
        Category::Email => (&EMAIL_RE, "Invalid email format"),
        Category::Phone => (&PHONE_VALUE_RE, "Invalid phone number format"),
        Category::Linkedin | Category::Website => (&URL_VALUE_RE, "Invalid URL format"),
        Category::ZipCode => (&ZIP_RE, "Invalid ZIP/postal code format"),
        Category::Gpa => (&GPA_RE, "Invalid GPA format (should be like 3.75)"),
        Category::Salary => (&SALARY_RE, "Invalid salary format"),
        _ => return Ok(()),
    };
    if re.is_match(value) {
        Ok(())
    } else {
        Err(msg.to_string())
    }
}

/// Warnings for profile values a fill would write into `fields`.
/// Each category is reported at most once.
pub fn lint(fields: &[Field], profile: &Value) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut warnings = Vec::new();

    for field in fields {
        if !field.category.is_known() || !seen.insert(field.category) {
            continue;
        }
        let Some(value) = lookup(profile, field.category) else {
            continue;
        };
        if value.is_array() || value.is_object() || value.is_null() {
            continue;
        }
        if let Err(msg) = validate_value(field.category, &to_text(value)) {
            warnings.push(format!("{}: {} ({})", field.category, msg, to_text(value)));
        }
    }
    warnings
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::form::detect;
    use serde_json::json;

    fn fixture_profile() -> Value {
        let raw = std::fs::read_to_string("tests/fixtures/profile.json").unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn fixture_profile_is_clean() {
        let v = validate_profile(&fixture_profile());
        assert!(v.is_valid(), "{:?}", v.errors);
        assert!(v.warnings.is_empty(), "{:?}", v.warnings);
        assert!(v.report().contains("No issues found"));
    }

    #[test]
    fn non_object_profile() {
        let v = validate_profile(&json!(["nope"]));
        assert_eq!(v.errors, vec!["Profile data must be an object"]);
    }

    #[test]
    fn empty_profile_reports_every_section() {
        let v = validate_profile(&json!({}));
        assert_eq!(v.errors, vec!["Personal information section is required"]);
        assert_eq!(
            v.warnings,
            vec![
                "Work experience section is empty",
                "Education section is empty",
                "Skills section is empty",
            ]
        );
    }

    #[test]
    fn personal_info_checks() {
        let v = validate_profile(&json!({
            "personalInfo": {
                "firstName": "Ada",
                "lastName": "",
                "email": "ada-at-example",
                "phone": "(020) 555-0199x",
                "linkedin": "linkedin.com/in/ada",
                "address": {"street": ""}
            }
        }));
        assert!(v.errors.contains(&"Personal info: lastName is required".to_string()));
        assert!(v
            .errors
            .contains(&"Personal info: Invalid email format: ada-at-example".to_string()));
        assert!(v
            .errors
            .iter()
            .any(|e| e.starts_with("Personal info: Invalid linkedin URL format")));
        assert!(v
            .warnings
            .iter()
            .any(|w| w.starts_with("Personal info: Phone number format may be invalid")));
        assert!(v.warnings.contains(&"Personal info: Address street is empty".to_string()));
    }

    #[test]
    fn position_checks() {
        let v = validate_profile(&json!({
            "personalInfo": {"firstName": "A", "lastName": "B", "email": "a@b.co"},
            "workExperience": {"positions": [
                {"company": "X", "title": "Y", "startDate": "2020-01-01", "endDate": "2019-01-01"},
                {"company": "X", "startDate": "Jan 2020", "endDate": "Present"},
                "intern"
            ]}
        }));
        assert_eq!(
            v.errors,
            vec![
                "Position 2: title is required",
                "Position 2: Invalid start date format: Jan 2020",
                "Position 3: Must be an object",
            ]
        );
        assert!(v.warnings.contains(&"Position 1: Start date is after end date".to_string()));
    }

    #[test]
    fn gpa_checks() {
        let school = |gpa: Value| {
            json!({
                "personalInfo": {"firstName": "A", "lastName": "B", "email": "a@b.co"},
                "education": {"schools": [
                    {"institution": "U", "degree": "BS", "fieldOfStudy": "CS", "gpa": gpa}
                ]}
            })
        };
        assert!(validate_profile(&school(json!("3.5"))).is_valid());
        assert!(validate_profile(&school(json!(3.5))).is_valid());

        let high = validate_profile(&school(json!("4.7")));
        assert!(high.is_valid());
        assert!(high.warnings.iter().any(|w| w.contains("GPA 4.7 seems unusual")));

        let bad = validate_profile(&school(json!("A+")));
        assert_eq!(bad.errors, vec!["School 1: Invalid GPA format: A+"]);
    }

    #[test]
    fn skills_checks() {
        let v = validate_profile(&json!({
            "personalInfo": {"firstName": "A", "lastName": "B", "email": "a@b.co"},
            "skills": {"technical": "Rust", "languages": [{"level": "native"}, "French"]},
            "hobbies": ["chess"]
        }));
        assert_eq!(v.errors, vec!["Technical skills must be a list"]);
        assert!(v.warnings.contains(&"Language entry missing 'language' field".to_string()));
        assert!(v.warnings.contains(&"Unknown sections found: hobbies".to_string()));

        let none = validate_profile(&json!({"skills": {"technical": []}}));
        assert!(none.warnings.contains(&"No skills found in any category".to_string()));
    }

    #[test]
    fn value_formats() {
        assert!(validate_value(Category::Email, "ada@example.com").is_ok());
        assert!(validate_value(Category::Email, "ada@").is_err());
        assert!(validate_value(Category::Phone, "+1 (555) 010-0199").is_ok());
        assert!(validate_value(Category::Phone, "call me").is_err());
        assert!(validate_value(Category::Website, "ftp://ada.dev").is_err());
        assert!(validate_value(Category::ZipCode, "94107-1234").is_ok());
        assert!(validate_value(Category::ZipCode, "K1A 0B1").is_ok());
        assert!(validate_value(Category::ZipCode, "SW1Y 4JH").is_err());
        assert!(validate_value(Category::Gpa, "3.75").is_ok());
        assert!(validate_value(Category::Gpa, "375").is_err());
        assert!(validate_value(Category::Salary, "$120,000").is_ok());
        assert!(validate_value(Category::Salary, "lots").is_err());
        assert!(validate_value(Category::Email, "   ").is_ok());
        assert!(validate_value(Category::City, "anything at all").is_ok());
    }

    #[test]
    fn lint_reports_values_headed_for_the_form() {
        let doc = Document::parse(
            r#"<form>
                 <input id="email"><input id="newsletter_email">
                 <input id="zip"><input id="gpa">
               </form>"#,
        );
        let fields = detect(&doc);
        let profile = json!({
            "personalInfo": {"email": "not-an-email", "address": {"zipCode": "94107"}},
            "education": {"gpa": "four"}
        });
        let warnings = lint(&fields, &profile);
        assert_eq!(
            warnings,
            vec![
                "personalInfo.email: Invalid email format (not-an-email)",
                "education.gpa: Invalid GPA format (should be like 3.75) (four)",
            ]
        );
    }
}
