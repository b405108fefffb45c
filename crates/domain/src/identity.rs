//! Identity keys that partition the session history.

use geosession_core::{AppError, AppResult, NonEmptyString};

/// Stable partition key of one user's session history.
///
/// The key is stored verbatim apart from surrounding whitespace; callers that
/// accept email addresses should normalise through [`EmailAddress`] first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Creates an identity from a non-blank key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = NonEmptyString::new(value)
            .map_err(|_| AppError::Validation("identity must not be empty".to_owned()))?;

        Ok(Self(value.as_str().trim().to_owned()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<EmailAddress> for Identity {
    fn from(value: EmailAddress) -> Self {
        Self(value.0)
    }
}

/// Validated, lower-cased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, exactly one `@`, no
    /// whitespace, local part and domain non-empty, domain contains a `.` that
    /// is neither its first nor last character.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation("email is required".to_owned()));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(
                "email address must not contain whitespace".to_owned(),
            ));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        };

        if domain.contains('@') {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(AppError::Validation(
                "email domain must contain an inner '.'".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_is_normalised() {
        let email = EmailAddress::new("  USER@Example.COM ");
        assert_eq!(
            email.map(|value| value.as_str().to_owned()).ok().as_deref(),
            Some("user@example.com")
        );
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("noatsign").is_err());
    }

    #[test]
    fn email_with_two_at_signs_is_rejected() {
        assert!(EmailAddress::new("a@b@example.com").is_err());
    }

    #[test]
    fn email_without_domain_dot_is_rejected() {
        assert!(EmailAddress::new("user@nodot").is_err());
        assert!(EmailAddress::new("user@example.").is_err());
    }

    #[test]
    fn empty_email_is_rejected() {
        assert!(EmailAddress::new("").is_err());
    }

    #[test]
    fn identity_from_email_keeps_normalised_value() {
        let identity = EmailAddress::new("User@Example.com").map(Identity::from);
        assert_eq!(
            identity.map(|value| value.to_string()).ok().as_deref(),
            Some("user@example.com")
        );
    }

    #[test]
    fn blank_identity_is_rejected() {
        assert!(Identity::new(" \t").is_err());
    }
}
