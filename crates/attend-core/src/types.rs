//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A store-assigned identifier was not a positive integer.
    #[error("{field} must be a positive integer, got {value:?}")]
    InvalidId { field: &'static str, value: String },

    /// The value does not look like an email address.
    #[error("invalid email address: {value:?}")]
    InvalidEmail { value: String },
}

/// Generates a store-assigned integer ID newtype with common trait implementations.
///
/// Zero and negative values are rejected so an unassigned identifier can never
/// masquerade as a real one.
macro_rules! define_record_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: i64) -> Result<Self, ValidationError> {
                if id <= 0 {
                    return Err(ValidationError::InvalidId {
                        field: $field_name,
                        value: id.to_string(),
                    });
                }
                Ok(Self(id))
            }

            /// Returns the raw integer value.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                let value = trimmed.parse::<i64>().map_err(|_| ValidationError::InvalidId {
                    field: $field_name,
                    value: trimmed.to_string(),
                })?;
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_record_id!(
    /// Identifier of an attendee row, assigned by the store.
    AttendeeId, "attendee ID"
);

define_record_id!(
    /// Identifier of a session row, assigned by the store.
    SessionId, "session ID"
);

/// Minimum accepted email length, exclusive.
const MIN_EMAIL_LEN: usize = 3;

/// A validated email address as typed by a participant.
///
/// Casing is kept as typed for storage; comparisons are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Validates an email address.
    ///
    /// The value is trimmed, then must contain `@`, contain no whitespace,
    /// and be longer than three characters.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }
        let valid = trimmed.contains('@')
            && !trimmed.chars().any(char::is_whitespace)
            && trimmed.chars().count() > MIN_EMAIL_LEN;
        if !valid {
            return Err(ValidationError::InvalidEmail {
                value: trimmed.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the email as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a stored value.
    pub fn matches(&self, stored: &str) -> bool {
        self.0.to_lowercase() == stored.trim().to_lowercase()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_rejects_zero_and_negative() {
        assert!(matches!(
            AttendeeId::new(0),
            Err(ValidationError::InvalidId { .. })
        ));
        assert!(matches!(
            SessionId::new(-4),
            Err(ValidationError::InvalidId { .. })
        ));
    }

    #[test]
    fn record_id_parses_trimmed_cell_text() {
        let id: AttendeeId = " 17 ".parse().unwrap();
        assert_eq!(id.get(), 17);
        assert_eq!(id.to_string(), "17");
    }

    #[test]
    fn record_id_rejects_blank_and_garbage() {
        assert_eq!(
            "".parse::<SessionId>().unwrap_err(),
            ValidationError::Empty {
                field: "session ID"
            }
        );
        assert!(matches!(
            "#REF!".parse::<SessionId>(),
            Err(ValidationError::InvalidId { .. })
        ));
    }

    #[test]
    fn email_accepts_plain_address() {
        let email = Email::parse("  jane@x.com ").unwrap();
        assert_eq!(email.as_str(), "jane@x.com");
    }

    #[test]
    fn email_rejects_missing_at_sign() {
        assert!(matches!(
            Email::parse("jane.x.com"),
            Err(ValidationError::InvalidEmail { .. })
        ));
    }

    #[test]
    fn email_rejects_inner_whitespace() {
        assert!(matches!(
            Email::parse("jane doe@x.com"),
            Err(ValidationError::InvalidEmail { .. })
        ));
    }

    #[test]
    fn email_rejects_too_short() {
        assert!(matches!(
            Email::parse("a@b"),
            Err(ValidationError::InvalidEmail { .. })
        ));
        assert!(Email::parse("a@bc").is_ok());
    }

    #[test]
    fn email_matches_case_insensitively() {
        let email = Email::parse("ANA@X.COM").unwrap();
        assert!(email.matches("ana@x.com"));
        assert!(email.matches(" Ana@X.com "));
        assert!(!email.matches("ana@y.com"));
    }
}
