//! Identifier rule
//!
//! An identifier is safe when it starts with a non-digit, consists only of
//! `[A-Za-z0-9_]`, and is not a reserved word in any downstream consumer.
//! Checks run in that order and stop at the first violation.

use crate::reserved::ReservedWordRegistry;
use schemagate_core::DiagnosticCode;

/// Why a single identifier was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierViolation {
    #[error("identifier '{0}' starts with a digit")]
    StartsWithDigit(String),

    #[error("identifier '{identifier}' contains illegal character {character:?}")]
    IllegalCharacter { identifier: String, character: Option<char> },

    #[error("identifier '{0}' is a reserved word")]
    ReservedWord(String),
}

impl IdentifierViolation {
    /// Stable diagnostic code for this violation
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::StartsWithDigit(_) => DiagnosticCode::IdentStartsWithDigit,
            Self::IllegalCharacter { .. } => DiagnosticCode::IdentIllegalCharacter,
            Self::ReservedWord(_) => DiagnosticCode::IdentReservedWord,
        }
    }
}

/// Validate a single identifier.
pub fn check_identifier(identifier: &str) -> Result<(), IdentifierViolation> {
    let mut chars = identifier.chars();

    match chars.next() {
        None => {
            return Err(IdentifierViolation::IllegalCharacter {
                identifier: String::new(),
                character: None,
            })
        }
        Some(first) if first.is_ascii_digit() => {
            return Err(IdentifierViolation::StartsWithDigit(identifier.to_string()));
        }
        Some(_) => {}
    }

    if let Some(bad) = identifier
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(IdentifierViolation::IllegalCharacter {
            identifier: identifier.to_string(),
            character: Some(bad),
        });
    }

    if ReservedWordRegistry::contains(identifier) {
        return Err(IdentifierViolation::ReservedWord(identifier.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers() {
        for id in ["users", "user_id", "varA", "_internal", "selection", "t2"] {
            assert_eq!(check_identifier(id), Ok(()), "{id}");
        }
    }

    #[test]
    fn leading_digit() {
        assert_eq!(
            check_identifier("1table"),
            Err(IdentifierViolation::StartsWithDigit("1table".to_string()))
        );
    }

    #[test]
    fn illegal_character() {
        let err = check_identifier("my-col").unwrap_err();
        assert_eq!(
            err,
            IdentifierViolation::IllegalCharacter {
                identifier: "my-col".to_string(),
                character: Some('-'),
            }
        );
        assert_eq!(err.code(), DiagnosticCode::IdentIllegalCharacter);

        assert!(check_identifier("naïve").is_err());
        assert!(check_identifier("has space").is_err());
    }

    #[test]
    fn reserved_words_case_insensitive() {
        assert!(matches!(check_identifier("select"), Err(IdentifierViolation::ReservedWord(_))));
        assert!(matches!(check_identifier("Select"), Err(IdentifierViolation::ReservedWord(_))));
        assert!(matches!(check_identifier("ORDER"), Err(IdentifierViolation::ReservedWord(_))));
    }

    #[test]
    fn digit_rule_wins_over_illegal_character() {
        assert!(matches!(
            check_identifier("9-lives"),
            Err(IdentifierViolation::StartsWithDigit(_))
        ));
    }

    #[test]
    fn empty_identifier_rejected() {
        assert!(matches!(
            check_identifier(""),
            Err(IdentifierViolation::IllegalCharacter { character: None, .. })
        ));
    }
}
