//! Learner and chapter identifiers
//!
//! Identifiers are opaque. The only rules enforced here are the ones the
//! store key depends on: non-empty, no surrounding whitespace, no control
//! characters, no key separator and no ':' at either end. The last rule
//! keeps the first "::" in a key unambiguous, so distinct pairs never share
//! a key and a learner prefix never matches another learner.

use tracing::debug;

use crate::error::ValidationError;

/// Separator between learner and chapter in a session key
pub const KEY_SEPARATOR: &str = "::";

/// Validate an identifier before it is used to build a store key
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
    debug!(%field, %value, "validate_identifier: called");
    if value.is_empty() {
        return Err(ValidationError::EmptyIdentifier(field));
    }
    if value.trim() != value {
        return Err(ValidationError::MalformedIdentifier {
            field,
            reason: "leading or trailing whitespace",
        });
    }
    if value.chars().any(char::is_control) {
        return Err(ValidationError::MalformedIdentifier {
            field,
            reason: "control character",
        });
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(ValidationError::MalformedIdentifier {
            field,
            reason: "contains '::'",
        });
    }
    if value.starts_with(':') || value.ends_with(':') {
        return Err(ValidationError::MalformedIdentifier {
            field,
            reason: "starts or ends with ':'",
        });
    }
    Ok(())
}

/// Store key for a (learner, chapter) pair
pub fn session_key(learner_id: &str, chapter_id: &str) -> String {
    format!("{}{}{}", learner_id, KEY_SEPARATOR, chapter_id)
}

/// Key prefix shared by every session of one learner
pub fn learner_prefix(learner_id: &str) -> String {
    format!("{}{}", learner_id, KEY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_valid_learner_id() {
        assert!(validate_identifier("learner_id", "a@x.com").is_ok());
        assert!(validate_identifier("chapter_id", "Suites numériques").is_ok());
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert_eq!(
            validate_identifier("learner_id", ""),
            Err(ValidationError::EmptyIdentifier("learner_id"))
        );
    }

    #[test]
    fn test_malformed_identifiers_rejected() {
        assert!(matches!(
            validate_identifier("chapter_id", " ch1"),
            Err(ValidationError::MalformedIdentifier { field: "chapter_id", .. })
        ));
        assert!(matches!(
            validate_identifier("chapter_id", "ch\n1"),
            Err(ValidationError::MalformedIdentifier { .. })
        ));
        assert!(matches!(
            validate_identifier("learner_id", "a::b"),
            Err(ValidationError::MalformedIdentifier { .. })
        ));
    }

    #[test]
    fn test_colon_at_either_end_rejected() {
        for value in ["a:", ":b", ":"] {
            assert!(
                matches!(
                    validate_identifier("learner_id", value),
                    Err(ValidationError::MalformedIdentifier { .. })
                ),
                "{value} should be rejected"
            );
        }
        assert!(validate_identifier("chapter_id", "ch:1").is_ok());
    }

    #[test]
    fn test_keys_of_distinct_pairs_differ() {
        // ("a:", "b") and ("a", ":b") would both map to "a:::b"
        assert!(validate_identifier("learner_id", "a:").is_err());
        assert!(validate_identifier("chapter_id", ":b").is_err());

        let pairs = [("a", "b:c"), ("a:b", "c"), ("a", "b"), ("a:", "b")];
        let valid: Vec<_> = pairs
            .iter()
            .filter(|(l, c)| validate_identifier("learner_id", l).is_ok() && validate_identifier("chapter_id", c).is_ok())
            .collect();
        let mut keys: Vec<String> = valid.iter().map(|(l, c)| session_key(l, c)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), valid.len());
        assert!(!session_key("a:b", "c").starts_with(&learner_prefix("a")));
    }

    #[test]
    fn test_session_key_layout() {
        assert_eq!(session_key("a@x.com", "ch1"), "a@x.com::ch1");
        assert!(session_key("a@x.com", "ch1").starts_with(&learner_prefix("a@x.com")));
    }
}
