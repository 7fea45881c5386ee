use std::sync::LazyLock;

use regex::Regex;

use super::category::Category;

/// The text a classifier looks at for one input.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldText<'a> {
    pub name: &'a str,
    pub id: &'a str,
    pub placeholder: &'a str,
    pub label: &'a str,
}

impl FieldText<'_> {
    pub fn haystack(&self) -> String {
        format!("{} {} {} {}", self.name, self.id, self.placeholder, self.label).to_lowercase()
    }
}

enum Pattern {
    Re(&'static str),
    /// Matches when some occurrence has none of the words later on its line.
    NotFollowedBy(&'static str, &'static [&'static str]),
}

struct RuleSpec {
    category: Category,
    patterns: &'static [Pattern],
    reject: Option<&'static str>,
}

use Pattern::{NotFollowedBy, Re};

/// First match wins. Overlapping vocabulary (names, dates) is settled by position.
const RULES: &[RuleSpec] = &[
    // Personal information
    RuleSpec {
        category: Category::FirstName,
        patterns: &[Re(r"first.?name"), Re(r"fname"), Re(r"given.?name")],
        reject: None,
    },
    RuleSpec {
        category: Category::LastName,
        patterns: &[Re(r"last.?name"), Re(r"lname"), Re(r"family.?name"), Re(r"surname")],
        reject: None,
    },
    RuleSpec {
        category: Category::FullName,
        patterns: &[Re(r"full.?name"), NotFollowedBy(r"name", &["first", "last"])],
        reject: Some(r"company|organization"),
    },
    RuleSpec {
        category: Category::Email,
        patterns: &[Re(r"email"), Re(r"e-mail")],
        reject: None,
    },
    RuleSpec {
        category: Category::Phone,
        patterns: &[Re(r"phone"), Re(r"mobile"), Re(r"tel")],
        reject: None,
    },
    RuleSpec {
        category: Category::Street,
        patterns: &[
            Re(r"address.*line.?1"),
            Re(r"street"),
            NotFollowedBy(r"address", &["email"]),
        ],
        reject: None,
    },
    RuleSpec {
        category: Category::AddressLine2,
        patterns: &[Re(r"address.*line.?2"), Re(r"apartment"), Re(r"apt"), Re(r"suite")],
        reject: None,
    },
    RuleSpec {
        category: Category::City,
        patterns: &[Re(r"city")],
        reject: None,
    },
    RuleSpec {
        category: Category::State,
        patterns: &[Re(r"state"), Re(r"province")],
        reject: None,
    },
    RuleSpec {
        category: Category::ZipCode,
        patterns: &[Re(r"zip"), Re(r"postal")],
        reject: None,
    },
    RuleSpec {
        category: Category::Country,
        patterns: &[Re(r"country")],
        reject: None,
    },
    RuleSpec {
        category: Category::Linkedin,
        patterns: &[Re(r"linkedin")],
        reject: None,
    },
    RuleSpec {
        category: Category::Website,
        patterns: &[Re(r"website"), Re(r"portfolio"), Re(r"url")],
        reject: None,
    },
    // Work experience
    RuleSpec {
        category: Category::CurrentCompany,
        patterns: &[Re(r"current.?company"), Re(r"employer"), Re(r"company.*name")],
        reject: None,
    },
    RuleSpec {
        category: Category::CurrentTitle,
        patterns: &[Re(r"current.?title"), Re(r"job.?title"), Re(r"position")],
        reject: None,
    },
    RuleSpec {
        category: Category::YearsExperience,
        patterns: &[Re(r"years?.?experience"), Re(r"experience.*years?")],
        reject: None,
    },
    RuleSpec {
        category: Category::Salary,
        patterns: &[Re(r"salary"), Re(r"compensation"), Re(r"pay")],
        reject: None,
    },
    RuleSpec {
        category: Category::StartDate,
        patterns: &[Re(r"start.?date"), Re(r"from.?date")],
        reject: None,
    },
    RuleSpec {
        category: Category::EndDate,
        patterns: &[Re(r"end.?date"), Re(r"to.?date")],
        reject: None,
    },
    // Education
    RuleSpec {
        category: Category::School,
        patterns: &[Re(r"school"), Re(r"university"), Re(r"college"), Re(r"institution")],
        reject: None,
    },
    RuleSpec {
        category: Category::Degree,
        patterns: &[Re(r"degree"), Re(r"education")],
        reject: None,
    },
    RuleSpec {
        category: Category::FieldOfStudy,
        patterns: &[Re(r"major"), Re(r"field.?of.?study"), Re(r"study")],
        reject: None,
    },
    RuleSpec {
        category: Category::GraduationDate,
        patterns: &[Re(r"graduation"), Re(r"grad.?date")],
        reject: None,
    },
    RuleSpec {
        category: Category::Gpa,
        patterns: &[Re(r"gpa")],
        reject: None,
    },
    // Skills
    RuleSpec {
        category: Category::TechnicalSkills,
        patterns: &[Re(r"skill"), Re(r"competenc"), Re(r"proficienc")],
        reject: None,
    },
    RuleSpec {
        category: Category::Languages,
        patterns: &[Re(r"language")],
        reject: None,
    },
    RuleSpec {
        category: Category::Certifications,
        patterns: &[Re(r"certification"), Re(r"certificate")],
        reject: None,
    },
    // Application specific
    RuleSpec {
        category: Category::CoverLetter,
        patterns: &[Re(r"cover.?letter"), Re(r"motivation")],
        reject: None,
    },
    RuleSpec {
        category: Category::WhyCompany,
        patterns: &[Re(r"why.*company"), Re(r"why.*interested")],
        reject: None,
    },
    // `start.?date` never fires here while StartDate sits above.
    RuleSpec {
        category: Category::Availability,
        patterns: &[Re(r"availability"), Re(r"start.?date")],
        reject: None,
    },
];

enum Matcher {
    Plain(Regex),
    Guarded(Regex, &'static [&'static str]),
}

impl Matcher {
    fn is_match(&self, haystack: &str) -> bool {
        match self {
            Matcher::Plain(re) => re.is_match(haystack),
            Matcher::Guarded(re, words) => re.find_iter(haystack).any(|m| {
                let line = rest_of_line(&haystack[m.end()..]);
                !words.iter().any(|w| line.contains(w))
            }),
        }
    }
}

fn rest_of_line(s: &str) -> &str {
    s.split(['\n', '\r', '\u{2028}', '\u{2029}']).next().unwrap_or("")
}

struct Rule {
    category: Category,
    matchers: Vec<Matcher>,
    reject: Option<Regex>,
}

impl Rule {
    fn compile(spec: &'static RuleSpec) -> Rule {
        let matchers = spec
            .patterns
            .iter()
            .map(|p| match p {
                Re(src) => Matcher::Plain(Regex::new(src).unwrap()),
                NotFollowedBy(src, words) => Matcher::Guarded(Regex::new(src).unwrap(), *words),
            })
            .collect();
        Rule {
            category: spec.category,
            matchers,
            reject: spec.reject.map(|src| Regex::new(src).unwrap()),
        }
    }

    fn is_match(&self, haystack: &str) -> bool {
        self.matchers.iter().any(|m| m.is_match(haystack))
            && !self.reject.as_ref().is_some_and(|r| r.is_match(haystack))
    }
}

static RULE_TABLE: LazyLock<Vec<Rule>> = LazyLock::new(|| RULES.iter().map(Rule::compile).collect());

/// Classify one input by its name, id, placeholder and label text.
pub fn classify(text: &FieldText<'_>) -> Category {
    classify_haystack(&text.haystack())
}

/// Classify an already lower-cased haystack.
pub fn classify_haystack(haystack: &str) -> Category {
    RULE_TABLE
        .iter()
        .find(|rule| rule.is_match(haystack))
        .map(|rule| rule.category)
        .unwrap_or(Category::Unknown)
}

/// Every category whose rule matches, in table order. The first entry is what
/// `classify` returns.
pub fn candidates(haystack: &str) -> Vec<Category> {
    RULE_TABLE
        .iter()
        .filter(|rule| rule.is_match(haystack))
        .map(|rule| rule.category)
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn by_name(name: &str) -> Category {
        classify(&FieldText {
            name,
            ..Default::default()
        })
    }

    fn by_label(label: &str) -> Category {
        classify(&FieldText {
            label,
            ..Default::default()
        })
    }

    #[test]
    fn table_covers_every_known_category_once() {
        for c in Category::ALL.iter().filter(|c| c.is_known()) {
            let n = RULES.iter().filter(|r| r.category == *c).count();
            assert_eq!(n, 1, "{} appears {} times", c, n);
        }
    }

    #[test]
    fn first_and_last_name_beat_full_name() {
        assert_eq!(by_name("first_name"), Category::FirstName);
        assert_eq!(by_name("lastName"), Category::LastName);
        assert_eq!(by_name("surname"), Category::LastName);
        assert_eq!(by_label("Given name"), Category::FirstName);
    }

    #[test]
    fn bare_name_is_full_name() {
        assert_eq!(by_name("name"), Category::FullName);
        assert_eq!(by_label("Your full name"), Category::FullName);
    }

    #[test]
    fn name_followed_by_first_is_not_full_name() {
        // "name" then "first" later on the line: the guard rejects that occurrence
        assert_ne!(by_label("name (first)"), Category::FullName);
        assert_eq!(by_label("name (first)"), Category::Unknown);
    }

    #[test]
    fn company_name_is_not_full_name() {
        assert_eq!(by_name("company_name"), Category::CurrentCompany);
        assert_eq!(by_label("Organization name"), Category::Unknown);
    }

    #[test]
    fn email_address_is_email_not_street() {
        assert_eq!(by_label("E-mail address"), Category::Email);
        assert_eq!(by_name("address"), Category::Street);
    }

    #[test]
    fn address_guard_skips_email_suffix() {
        // no email pattern can fire first here, so only the guard decides
        assert!(!candidates("address for email").contains(&Category::Street));
        assert!(candidates("address").contains(&Category::Street));
    }

    #[test]
    fn address_line_two_is_shadowed_by_street() {
        assert_eq!(by_label("Address line 2"), Category::Street);
        assert_eq!(by_label("Apartment, suite"), Category::AddressLine2);
    }

    #[test]
    fn start_date_goes_to_work_experience() {
        assert_eq!(by_name("start_date"), Category::StartDate);
        assert_eq!(by_label("Availability"), Category::Availability);
        let c = candidates("start date");
        assert_eq!(c, vec![Category::StartDate, Category::Availability]);
    }

    #[test]
    fn assorted_vocabulary() {
        assert_eq!(by_name("city"), Category::City);
        assert_eq!(by_name("postal_code"), Category::ZipCode);
        assert_eq!(by_label("LinkedIn Profile URL"), Category::Linkedin);
        assert_eq!(by_label("Portfolio"), Category::Website);
        assert_eq!(by_label("Job Title"), Category::CurrentTitle);
        assert_eq!(by_name("years_experience"), Category::YearsExperience);
        assert_eq!(by_label("Desired salary"), Category::Salary);
        assert_eq!(by_label("University"), Category::School);
        assert_eq!(by_label("GPA"), Category::Gpa);
        assert_eq!(by_label("Technical skills"), Category::TechnicalSkills);
        assert_eq!(by_label("Spoken languages"), Category::Languages);
        assert_eq!(by_label("Cover letter"), Category::CoverLetter);
        assert_eq!(by_label("Why do you want to join our company?"), Category::WhyCompany);
    }

    #[test]
    fn no_match_is_unknown() {
        assert_eq!(by_label("Favourite colour"), Category::Unknown);
        assert_eq!(classify(&FieldText::default()), Category::Unknown);
    }

    #[test]
    fn classification_is_deterministic() {
        let text = FieldText {
            name: "applicant_email",
            id: "email-1",
            placeholder: "you@example.com",
            label: "Email",
        };
        let first = classify(&text);
        for _ in 0..10 {
            assert_eq!(classify(&text), first);
        }
        assert_eq!(first, Category::Email);
    }

    #[test]
    fn haystack_is_lowercased_and_joined() {
        let text = FieldText {
            name: "First",
            id: "ID",
            placeholder: "",
            label: "Label",
        };
        assert_eq!(text.haystack(), "first id  label");
    }
}
