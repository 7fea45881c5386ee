use std::fmt;

use serde::{Serialize, Serializer};

/// A slot in the profile schema, identified by its dotted path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    Street,
    AddressLine2,
    City,
    State,
    ZipCode,
    Country,
    Linkedin,
    Website,
    CurrentCompany,
    CurrentTitle,
    YearsExperience,
    Salary,
    StartDate,
    EndDate,
    School,
    Degree,
    FieldOfStudy,
    GraduationDate,
    Gpa,
    TechnicalSkills,
    Languages,
    Certifications,
    CoverLetter,
    WhyCompany,
    Availability,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 31] = [
        Category::FirstName,
        Category::LastName,
        Category::FullName,
        Category::Email,
        Category::Phone,
        Category::Street,
        Category::AddressLine2,
        Category::City,
        Category::State,
        Category::ZipCode,
        Category::Country,
        Category::Linkedin,
        Category::Website,
        Category::CurrentCompany,
        Category::CurrentTitle,
        Category::YearsExperience,
        Category::Salary,
        Category::StartDate,
        Category::EndDate,
        Category::School,
        Category::Degree,
        Category::FieldOfStudy,
        Category::GraduationDate,
        Category::Gpa,
        Category::TechnicalSkills,
        Category::Languages,
        Category::Certifications,
        Category::CoverLetter,
        Category::WhyCompany,
        Category::Availability,
        Category::Unknown,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Category::FirstName => "personalInfo.firstName",
            Category::LastName => "personalInfo.lastName",
            Category::FullName => "personalInfo.fullName",
            Category::Email => "personalInfo.email",
            Category::Phone => "personalInfo.phone",
            Category::Street => "personalInfo.address.street",
            Category::AddressLine2 => "personalInfo.address.line2",
            Category::City => "personalInfo.address.city",
            Category::State => "personalInfo.address.state",
            Category::ZipCode => "personalInfo.address.zipCode",
            Category::Country => "personalInfo.address.country",
            Category::Linkedin => "personalInfo.linkedin",
            Category::Website => "personalInfo.website",
            Category::CurrentCompany => "workExperience.currentCompany",
            Category::CurrentTitle => "workExperience.currentTitle",
            Category::YearsExperience => "workExperience.yearsExperience",
            Category::Salary => "workExperience.salary",
            Category::StartDate => "workExperience.startDate",
            Category::EndDate => "workExperience.endDate",
            Category::School => "education.school",
            Category::Degree => "education.degree",
            Category::FieldOfStudy => "education.fieldOfStudy",
            Category::GraduationDate => "education.graduationDate",
            Category::Gpa => "education.gpa",
            Category::TechnicalSkills => "skills.technical",
            Category::Languages => "skills.languages",
            Category::Certifications => "skills.certifications",
            Category::CoverLetter => "application.coverLetter",
            Category::WhyCompany => "application.whyCompany",
            Category::Availability => "application.availability",
            Category::Unknown => "unknown",
        }
    }

    pub fn from_path(path: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.path() == path)
    }

    pub fn is_known(self) -> bool {
        self != Category::Unknown
    }

    /// Path segments, e.g. `["personalInfo", "address", "city"]`.
    pub fn segments(self) -> impl Iterator<Item = &'static str> {
        self.path().split('.')
    }

    /// Last path segment, used as the field name in validation messages.
    pub fn leaf(self) -> &'static str {
        self.segments().last().unwrap_or("unknown")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.path())
    }
}

// ── Tests ──
