use thiserror::Error;

/// Attribute validation failures, reported as 422 error objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} too long: {len} characters (max: {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Invalid email format: '{email}'")]
    InvalidEmail { email: String },

    #[error("Invalid timestamp '{value}': expected RFC 3339")]
    InvalidTimestamp { value: String },

    #[error("{field} must be a string")]
    NotAString { field: &'static str },
}

impl ValidationError {
    pub fn empty(field: &'static str) -> Self {
        Self::Empty { field }
    }

    pub fn too_long(field: &'static str, len: usize, max: usize) -> Self {
        Self::TooLong { field, len, max }
    }

    pub fn invalid_email(email: impl Into<String>) -> Self {
        Self::InvalidEmail {
            email: email.into(),
        }
    }

    pub fn invalid_timestamp(value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
        }
    }

    pub fn not_a_string(field: &'static str) -> Self {
        Self::NotAString { field }
    }
}
