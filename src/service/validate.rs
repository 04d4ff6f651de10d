//! Input validation shared by every service.

use std::sync::LazyLock;

use regex::Regex;

use super::{ApiError, Result};

// Literal patterns: construction cannot fail at runtime.
static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]{2,127}$").expect("valid name pattern")
});

static SLUG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug pattern")
});

const MAX_SLUG: usize = 128;
const MAX_TITLE: usize = 256;
const MAX_DESCRIPTION: usize = 512;

/// Lowercase identifier: letter or underscore first, 3 to 128 characters.
pub fn name(value: &str) -> Result<()> {
    if NAME.is_match(value) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "invalid name {value:?}: expected lowercase letters, digits and underscores, \
             3 to 128 characters, not starting with a digit"
        )))
    }
}

pub fn slug(value: &str) -> Result<()> {
    if value.len() <= MAX_SLUG && SLUG.is_match(value) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "invalid slug {value:?}: expected lowercase words separated by single dashes, \
             at most {MAX_SLUG} characters"
        )))
    }
}

pub fn title(value: &str) -> Result<()> {
    let len = value.chars().count();
    if (1..=MAX_TITLE).contains(&len) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "title must be 1 to {MAX_TITLE} characters, got {len}"
        )))
    }
}

pub fn description(value: &str) -> Result<()> {
    let len = value.chars().count();
    if len <= MAX_DESCRIPTION {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION} characters, got {len}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        LazyLock::force(&NAME);
        LazyLock::force(&SLUG);
    }

    #[test]
    fn names() {
        for ok in ["crm", "_private", "orders_by_day", "a12"] {
            assert!(name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "ab", "1abc", "Orders", "has-dash", "with space"] {
            assert!(name(bad).is_err(), "{bad}");
        }
        assert!(name(&"a".repeat(128)).is_ok());
        assert!(name(&"a".repeat(129)).is_err());
    }

    #[test]
    fn slugs() {
        for ok in ["crm", "customer-list", "v2"] {
            assert!(slug(ok).is_ok(), "{ok}");
        }
        for bad in ["", "-crm", "crm-", "a--b", "Crm", "a_b"] {
            assert!(slug(bad).is_err(), "{bad}");
        }
        assert!(slug(&"a".repeat(129)).is_err());
    }

    #[test]
    fn titles_and_descriptions() {
        assert!(title("").is_err());
        assert!(title("Customers").is_ok());
        assert!(title(&"é".repeat(256)).is_ok());
        assert!(title(&"x".repeat(257)).is_err());

        assert!(description("").is_ok());
        assert!(description(&"x".repeat(513)).is_err());
    }

    #[test]
    fn errors_are_bad_requests() {
        assert_eq!(name("X").unwrap_err().code(), "BAD_REQUEST_ERROR");
    }
}
