use regex::Regex;
use std::sync::OnceLock;

/// Longest identifier prefix written to logs when a reference is rejected.
const LOG_PREFIX_LEN: usize = 64;

fn identifier_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.]+$").expect("identifier pattern is valid"))
}

/// Returns `true` when `s` may be interpolated into SQL text as a column or table reference.
///
/// Only ASCII letters, digits, underscores and dots are accepted, which admits
/// qualified references such as `expeditions.expedition_name` and nothing that
/// could close a quote, open a comment or start another statement. Values are
/// never interpolated; they are always bound as parameters.
#[must_use]
pub fn is_safe_identifier(s: &str) -> bool {
    identifier_regex().is_match(s)
}

/// Shortens an untrusted identifier before it is written to a log line
pub(crate) fn log_prefix(s: &str) -> &str {
    match s.char_indices().nth(LOG_PREFIX_LEN) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_and_qualified_columns() {
        assert!(is_safe_identifier("created_at"));
        assert!(is_safe_identifier("e.expedition_name"));
        assert!(is_safe_identifier("regions.code"));
        assert!(is_safe_identifier("Column_2"));
    }

    #[test]
    fn test_rejects_injection_attempts() {
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("DROP TABLE users"));
        assert!(!is_safe_identifier("name; DELETE FROM roles"));
        assert!(!is_safe_identifier("name'--"));
        assert!(!is_safe_identifier("\"name\""));
        assert!(!is_safe_identifier("name)"));
        assert!(!is_safe_identifier("name\n"));
    }

    #[test]
    fn test_rejects_non_ascii_letters() {
        assert!(!is_safe_identifier("namé"));
        assert!(!is_safe_identifier("名前"));
    }

    #[test]
    fn test_log_prefix_truncates_on_char_boundary() {
        let long = "é".repeat(100);
        assert_eq!(log_prefix(&long).chars().count(), LOG_PREFIX_LEN);
        assert_eq!(log_prefix("short"), "short");
    }
}
