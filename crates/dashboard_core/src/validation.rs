//! Field-level checks run against a draft before anything is dispatched.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Required,
    Invalid(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("is required"),
            Self::Invalid(reason) => f.write_str(reason),
        }
    }
}

/// Structured error map keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, FieldError>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn insert(&mut self, field: &'static str, error: FieldError) {
        self.0.entry(field).or_insert(error);
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (field, error)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field} {error}")?;
        }
        Ok(())
    }
}

/// Collects field errors while coercing raw draft values into typed ones.
#[derive(Debug, Default)]
pub struct FieldChecks {
    errors: FieldErrors,
}

impl FieldChecks {
    pub fn required_text(&mut self, field: &'static str, raw: &str) -> Option<String> {
        let value = raw.trim();
        if value.is_empty() {
            self.errors.insert(field, FieldError::Required);
            return None;
        }
        Some(value.to_string())
    }

    pub fn optional_text(&mut self, raw: &str) -> Option<String> {
        let value = raw.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    /// Blank input is a missing value, never a zero or NaN.
    pub fn required_number<T: FromStr>(&mut self, field: &'static str, raw: &str) -> Option<T> {
        let value = raw.trim();
        if value.is_empty() {
            self.errors.insert(field, FieldError::Required);
            return None;
        }
        match value.parse::<T>() {
            Ok(number) => Some(number),
            Err(_) => {
                self.errors
                    .insert(field, FieldError::Invalid("must be a whole number".into()));
                None
            }
        }
    }

    /// Non-negative decimal with at most two fraction digits, normalized to
    /// `<whole>.<cents>` so no part of the amount is dropped.
    pub fn required_amount(&mut self, field: &'static str, raw: &str) -> Option<String> {
        let value = raw.trim();
        if value.is_empty() {
            self.errors.insert(field, FieldError::Required);
            return None;
        }
        let (whole, fraction) = match value.split_once('.') {
            Some((whole, fraction)) if !fraction.is_empty() => (whole, fraction),
            Some(_) => ("", ""),
            None => (value, ""),
        };
        let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !digits(whole) || !digits(fraction) || fraction.len() > 2 {
            self.errors.insert(
                field,
                FieldError::Invalid("must be an amount with at most two decimals".into()),
            );
            return None;
        }
        let whole = match whole.trim_start_matches('0') {
            "" => "0",
            trimmed => trimmed,
        };
        Some(format!("{whole}.{fraction:0<2}"))
    }

    pub fn required_date(&mut self, field: &'static str, raw: &str) -> Option<NaiveDate> {
        let value = raw.trim();
        if value.is_empty() {
            self.errors.insert(field, FieldError::Required);
            return None;
        }
        match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.errors
                    .insert(field, FieldError::Invalid("must be a YYYY-MM-DD date".into()));
                None
            }
        }
    }

    pub fn required_choice<T: Copy>(&mut self, field: &'static str, choice: Option<T>) -> Option<T> {
        if choice.is_none() {
            self.errors.insert(field, FieldError::Required);
        }
        choice
    }

    pub fn reject(&mut self, field: &'static str, reason: impl Into<String>) {
        self.errors.insert(field, FieldError::Invalid(reason.into()));
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }

    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
