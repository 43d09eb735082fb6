use std::sync::OnceLock;

use regex::Regex;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const MAX_EMAIL_LEN: usize = 254;

static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

/// Shape check for login and contact addresses. Expects already-trimmed input.
pub fn validate_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN {
        return false;
    }

    EMAIL_REGEX
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}
