//! Recognizing job boards and applicant-tracking systems by URL.

use reqwest::Url;

/// Hosts whose pages are application forms often enough to scan unasked.
pub const JOB_SITE_DOMAINS: &[&str] = &[
    "linkedin.com",
    "indeed.com",
    "glassdoor.com",
    "monster.com",
    "careerbuilder.com",
    "ziprecruiter.com",
    "simplyhired.com",
    "dice.com",
    "workday.com",
    "greenhouse.io",
    "lever.co",
    "smartrecruiters.com",
    "bamboohr.com",
    "workable.com",
];

/// True when `url` is served from one of [`JOB_SITE_DOMAINS`] or a subdomain
/// of one. Unparseable URLs and URLs without a host are never job sites.
pub fn is_job_site(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    JOB_SITE_DOMAINS.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

// ── Tests ──
