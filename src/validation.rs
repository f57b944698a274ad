use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Field name → human readable reasons, serialized as the `errors` object of a 422.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, reason: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims the input and treats an empty result as absent.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Reads a JSON field that must be a string when given.
///
/// `Some(None)` for absent or `null`, `Some(Some(_))` for a string, and `None` once a
/// type error has been recorded for any other JSON value.
pub fn string_value<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&'a Value>,
) -> Option<Option<&'a str>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(Value::String(s)) => Some(Some(s.as_str())),
        Some(_) => {
            errors.add(field, format!("The {field} field must be a string."));
            None
        }
    }
}

/// Required string with an upper bound on its character count.
pub fn required_string<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&'a str>,
    max: usize,
) -> Option<&'a str> {
    match present(value) {
        None => {
            errors.add(field, format!("The {field} field is required."));
            None
        }
        Some(v) if v.chars().count() > max => {
            errors.add(
                field,
                format!("The {field} field must not be greater than {max} characters."),
            );
            None
        }
        Some(v) => Some(v),
    }
}
