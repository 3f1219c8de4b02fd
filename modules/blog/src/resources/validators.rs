use chrono::{DateTime, SecondsFormat, Utc};
use jsonapi::{Context, Error};
use serde_json::Value;

use crate::error::ValidationError;

/// Non-blank string of at most `max` characters.
pub fn text(
    field: &'static str,
    max: usize,
) -> impl Fn(&Value, &Context<'_>) -> Result<(), String> + Send + Sync + 'static {
    move |value: &Value, _ctx: &Context<'_>| {
        let s = value
            .as_str()
            .ok_or_else(|| ValidationError::not_a_string(field).to_string())?;
        let len = s.chars().count();
        if s.trim().is_empty() {
            Err(ValidationError::empty(field).to_string())
        } else if len > max {
            Err(ValidationError::too_long(field, len, max).to_string())
        } else {
            Ok(())
        }
    }
}

pub fn email(value: &Value, _ctx: &Context<'_>) -> Result<(), String> {
    let s = value
        .as_str()
        .ok_or_else(|| ValidationError::not_a_string("email").to_string())?;
    let valid = match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::invalid_email(s).to_string())
    }
}

/// Null or an RFC 3339 timestamp.
pub fn timestamp(value: &Value, _ctx: &Context<'_>) -> Result<(), String> {
    match value {
        Value::Null => Ok(()),
        Value::String(s) if DateTime::parse_from_rfc3339(s).is_ok() => Ok(()),
        Value::String(s) => Err(ValidationError::invalid_timestamp(s.as_str()).to_string()),
        other => Err(ValidationError::invalid_timestamp(other.to_string()).to_string()),
    }
}

/// Rewrite a parseable timestamp in UTC; anything else is left for
/// [`timestamp`] to reject.
pub fn to_utc(value: Value, _ctx: &Context<'_>) -> Result<Value, Error> {
    Ok(match value.as_str().map(DateTime::parse_from_rfc3339) {
        Some(Ok(parsed)) => Value::String(format_utc(parsed.with_timezone(&Utc))),
        _ => value,
    })
}

pub fn format_utc(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
