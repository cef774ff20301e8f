//! Form checks applied identically by the server and the client

use once_cell::sync::Lazy;
use regex::Regex;

/// One `@`, no whitespace, and a dot somewhere in the domain
pub static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ordinary_addresses() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        // Dots may sit anywhere after the @
        assert!(is_valid_email("a@b.c.d"));
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        for email in [
            "",
            "plainaddress",
            "@example.com",
            "user@",
            "user@example",
            "user@@example.com",
            "us er@example.com",
            "user@exa mple.com",
            "user@example.com\n",
        ] {
            assert!(!is_valid_email(email), "{:?} should be rejected", email);
        }
    }
}
