//! Resource name validation

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;

/// Upper bound the API server enforces on subdomain names
pub const MAX_SUBDOMAIN_LEN: usize = 253;

static SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("subdomain pattern compiles")
});

/// Lowercase alphanumeric segments separated by `.`, hyphens only inside a segment
pub fn is_rfc1123_subdomain(name: &str) -> bool {
    name.len() <= MAX_SUBDOMAIN_LEN && SUBDOMAIN.is_match(name)
}

/// Check `value` and report it as `field` on failure
pub fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if is_rfc1123_subdomain(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

pub fn validate_port(field: &'static str, value: i32) -> Result<(), ValidationError> {
    if (1..=65535).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPort { field, value })
    }
}
