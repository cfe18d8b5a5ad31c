//! Query and country-code sanitization.
//!
//! The suspicion filter is deliberately conservative: a query that might
//! carry personal data (phone numbers, emails, pasted URLs, long free text)
//! is rejected before any network work happens. The country code stays
//! coarse: two letters or `"--"`.

use regex::Regex;

const MAX_QUERY_LEN: usize = 120;
const MAX_QUERY_WORDS: usize = 9;

/// Verdict of the suspicion filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCheck {
    pub accept: bool,
    pub reason: Option<String>,
}

impl QueryCheck {
    pub fn accepted() -> Self {
        Self {
            accept: true,
            reason: None,
        }
    }

    pub fn rejected(reason: &str) -> Self {
        Self {
            accept: false,
            reason: Some(reason.to_string()),
        }
    }
}

/// Sanitization collaborator consumed by the job.
pub trait Sanitizer: Send + Sync {
    /// Two lower-case letters, or `"--"` when unknown.
    fn safe_country_code(&self) -> String;

    /// Decide whether a query is safe to refetch and report on.
    fn check_suspicious_query(&self, query: &str) -> QueryCheck;
}

/// Normalize a raw country code to the coarse wire form.
pub fn sanitize_country_code(raw: &str) -> String {
    let code = raw.trim();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        code.to_ascii_lowercase()
    } else {
        "--".to_string()
    }
}

/// Heuristic sanitizer with a fixed country code.
pub struct BasicSanitizer {
    country: String,
    long_digit_run: Regex,
    email: Regex,
}

impl BasicSanitizer {
    pub fn new(country: &str) -> Self {
        Self {
            country: sanitize_country_code(country),
            long_digit_run: Regex::new(r"\d{7,}").expect("digit-run regex is valid"),
            email: Regex::new(r"[^\s@]+@[^\s@]+\.[A-Za-z]{2,}").expect("email regex is valid"),
        }
    }
}

impl Sanitizer for BasicSanitizer {
    fn safe_country_code(&self) -> String {
        self.country.clone()
    }

    fn check_suspicious_query(&self, query: &str) -> QueryCheck {
        let query = query.trim();
        if query.is_empty() {
            return QueryCheck::rejected("empty query");
        }
        if query.len() > MAX_QUERY_LEN {
            return QueryCheck::rejected("query too long");
        }
        if query.split_whitespace().count() > MAX_QUERY_WORDS {
            return QueryCheck::rejected("too many terms");
        }
        if self.long_digit_run.is_match(query) {
            return QueryCheck::rejected("long digit run");
        }
        if self.email.is_match(query) {
            return QueryCheck::rejected("looks like an email address");
        }
        if query.contains("://") || query.starts_with("www.") {
            return QueryCheck::rejected("looks like a url");
        }
        QueryCheck::accepted()
    }
}
