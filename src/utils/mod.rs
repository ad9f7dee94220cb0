//! Utility functions for jarpack

pub mod attributes;

use std::env;

pub use attributes::{clear_protective_attributes, set_hidden};

/// Check if an environment variable is set to a truthy value
/// Accepts: "1", "true", "on", "yes", "t" (case insensitive)
pub fn is_env_true(key: &str) -> bool {
    match env::var(key) {
        Ok(val) => {
            let val_lower = val.to_lowercase();
            matches!(val_lower.as_str(), "1" | "true" | "on" | "yes" | "t")
        }
        Err(_) => false,
    }
}

/// Expand `$ENV{NAME}` references using the process environment.
///
/// Unset variables expand to the empty string. Text produced by an expansion
/// is not scanned again, and an unterminated `$ENV{` is kept verbatim.
pub fn expand_env_vars(input: &str) -> String {
    expand_env_vars_with(input, |name| env::var(name).ok())
}

/// Same as [`expand_env_vars`] with an explicit lookup
pub fn expand_env_vars_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    const OPEN: &str = "$ENV{";

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        match after_open.find('}') {
            Some(0) => {
                // `$ENV{}` names nothing; keep it and move past the opener
                result.push_str(&rest[..start + OPEN.len()]);
                rest = after_open;
            }
            Some(end) => {
                result.push_str(&rest[..start]);
                let name = &after_open[..end];
                result.push_str(&lookup(name).unwrap_or_default());
                rest = &after_open[end + 1..];
            }
            None => break,
        }
    }

    result.push_str(rest);
    result
}

/// Milliseconds since the Unix epoch, used as the packaging fingerprint
pub fn current_timestamp_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "APPDATA" => Some("C:\\Users\\dev\\AppData\\Roaming".to_string()),
            "APP" => Some("demo".to_string()),
            "LOOP" => Some("$ENV{APP}".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_known_variable() {
        assert_eq!(
            expand_env_vars_with("$ENV{APPDATA}\\myapp", lookup),
            "C:\\Users\\dev\\AppData\\Roaming\\myapp"
        );
    }

    #[test]
    fn test_expand_multiple_and_unset() {
        assert_eq!(
            expand_env_vars_with("$ENV{APP}/$ENV{MISSING}/$ENV{APP}", lookup),
            "demo//demo"
        );
    }

    #[test]
    fn test_expansion_is_not_rescanned() {
        assert_eq!(expand_env_vars_with("$ENV{LOOP}", lookup), "$ENV{APP}");
    }

    #[test]
    fn test_malformed_references_kept() {
        assert_eq!(expand_env_vars_with("a$ENV{APP", lookup), "a$ENV{APP");
        assert_eq!(expand_env_vars_with("$ENV{}x", lookup), "$ENV{}x");
        assert_eq!(expand_env_vars_with("plain", lookup), "plain");
    }

    #[test]
    fn test_timestamp_is_recent() {
        // 2020-01-01 in milliseconds
        assert!(current_timestamp_millis() > 1_577_836_800_000);
    }
}
