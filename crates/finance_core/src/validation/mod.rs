//! crates/finance_core/src/validation/mod.rs
//!
//! The validation layer. Candidate records arrive as JSON objects (field -> value)
//! and leave either as normalized domain values or as a field -> messages report.
//! Nothing here touches storage, so a failed record can never be half-persisted.

mod accounts;
mod records;

pub use accounts::{LoginAttempt, Registration};
pub use records::LOAN_REQUIRED_FIELDS;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::ChatMessage;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A candidate record as received on the wire.
pub type Record = Map<String, Value>;

/// Key used for errors that belong to the record as a whole.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

//=========================================================================================
// Error Reports
//=========================================================================================

/// Field name -> one or more human-readable messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Index-aligned report for a batch; valid members hold an empty report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BatchErrors(pub Vec<FieldErrors>);

impl BatchErrors {
    pub fn invalid_indexes(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, errors)| !errors.is_empty())
            .map(|(index, _)| index)
            .collect()
    }
}

//=========================================================================================
// The Validate Contract
//=========================================================================================

/// Implemented by every input type the outer layers accept.
pub trait Validate: Sized {
    /// `today` bounds every "not in the future" rule.
    fn validate(record: &Record, today: NaiveDate) -> Result<Self, FieldErrors>;
}

/// A create body holds either one object or a list of objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<T> {
    Single(T),
    Batch(Vec<T>),
}

impl<T> Submission<T> {
    pub fn is_batch(&self) -> bool {
        matches!(self, Submission::Batch(_))
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Submission::Single(item) => vec![item],
            Submission::Batch(items) => items,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("invalid record: {0}")]
    Single(FieldErrors),
    #[error("invalid batch at indexes {:?}", .0.invalid_indexes())]
    Batch(BatchErrors),
}

/// Validates a create body. A batch is accepted only when every member is valid.
pub fn validate_submission<T: Validate>(
    body: &Value,
    today: NaiveDate,
) -> Result<Submission<T>, SubmissionError> {
    match body {
        Value::Object(record) => T::validate(record, today)
            .map(Submission::Single)
            .map_err(SubmissionError::Single),
        Value::Array(items) if items.is_empty() => Err(SubmissionError::Single(
            FieldErrors::single(NON_FIELD_ERRORS, "This list may not be empty."),
        )),
        Value::Array(items) => {
            let mut valid = Vec::with_capacity(items.len());
            let mut reports = Vec::with_capacity(items.len());
            for item in items {
                match expect_record(item).and_then(|record| T::validate(record, today)) {
                    Ok(value) => {
                        valid.push(value);
                        reports.push(FieldErrors::new());
                    }
                    Err(errors) => reports.push(errors),
                }
            }
            if valid.len() == items.len() {
                Ok(Submission::Batch(valid))
            } else {
                Err(SubmissionError::Batch(BatchErrors(reports)))
            }
        }
        other => Err(SubmissionError::Single(not_a_record(other))),
    }
}

/// Borrows a JSON object or reports what was received instead.
pub fn expect_record(value: &Value) -> Result<&Record, FieldErrors> {
    value.as_object().ok_or_else(|| not_a_record(value))
}

fn not_a_record(value: &Value) -> FieldErrors {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    };
    FieldErrors::single(
        NON_FIELD_ERRORS,
        format!("Invalid data. Expected a dictionary, but got {}.", kind),
    )
}

/// Overlays a partial update on the stored representation of a record.
pub fn merge_records(mut base: Record, patch: &Record) -> Record {
    for (field, value) in patch {
        base.insert(field.clone(), value.clone());
    }
    base
}

/// True when the field is missing or explicitly null.
pub fn is_absent(record: &Record, field: &str) -> bool {
    matches!(record.get(field), None | Some(Value::Null))
}

//=========================================================================================
// Field Reader
//=========================================================================================

/// Precision limits of a fixed-point column.
#[derive(Debug, Clone, Copy)]
pub struct DecimalSpec {
    pub whole_digits: u32,
    pub decimal_places: u32,
}

/// NUMERIC(12,2)
pub const MONEY: DecimalSpec = DecimalSpec { whole_digits: 10, decimal_places: 2 };
/// NUMERIC(5,2)
pub const RATE: DecimalSpec = DecimalSpec { whole_digits: 3, decimal_places: 2 };

/// Reads typed fields out of a record, collecting every problem instead of stopping
/// at the first one.
pub struct FieldReader<'a> {
    record: &'a Record,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self { record, errors: FieldErrors::new() }
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Records `message` against `field` unless `ok` holds.
    pub fn ensure(&mut self, field: &str, ok: bool, message: &str) {
        if !ok {
            self.error(field, message);
        }
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains(field)
    }

    pub fn is_absent(&self, field: &str) -> bool {
        is_absent(self.record, field)
    }

    fn required(&mut self, field: &str) -> Option<&'a Value> {
        match self.record.get(field) {
            None => {
                self.error(field, "This field is required.");
                None
            }
            Some(Value::Null) => {
                self.error(field, "This field may not be null.");
                None
            }
            Some(value) => Some(value),
        }
    }

    fn optional(&self, field: &str) -> Option<&'a Value> {
        match self.record.get(field) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    /// A required string, trimmed, with a character-count window.
    pub fn text(&mut self, field: &str, min_len: usize, max_len: usize) -> Option<String> {
        let value = self.required(field)?;
        self.read_text(field, value, min_len, max_len)
    }

    pub fn optional_text(&mut self, field: &str, max_len: usize) -> Option<String> {
        let value = self.optional(field)?;
        match value {
            Value::String(s) if s.trim().is_empty() => None,
            _ => self.read_text(field, value, 0, max_len),
        }
    }

    fn read_text(
        &mut self,
        field: &str,
        value: &Value,
        min_len: usize,
        max_len: usize,
    ) -> Option<String> {
        let Some(raw) = value.as_str() else {
            self.error(field, "Not a valid string.");
            return None;
        };
        let trimmed = raw.trim();
        let length = trimmed.chars().count();
        if length == 0 {
            self.error(field, "This field may not be blank.");
            return None;
        }
        if length < min_len {
            self.error(
                field,
                format!("Ensure this field has at least {} characters.", min_len),
            );
            return None;
        }
        if length > max_len {
            self.error(
                field,
                format!("Ensure this field has no more than {} characters.", max_len),
            );
            return None;
        }
        Some(trimmed.to_string())
    }

    /// A list of `{role, content}` conversation turns. Each bad entry is reported by index.
    pub fn optional_turns(&mut self, field: &str) -> Option<Vec<ChatMessage>> {
        let value = self.optional(field)?;
        let Some(items) = value.as_array() else {
            self.error(field, "Expected a list of conversation turns.");
            return None;
        };
        let mut turns = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match serde_json::from_value::<ChatMessage>(item.clone()) {
                Ok(turn) => turns.push(turn),
                Err(_) => self.error(
                    field,
                    format!(
                        "Turn {} needs a role of system, user or assistant and a string content.",
                        index
                    ),
                ),
            }
        }
        if self.has_error(field) {
            None
        } else {
            Some(turns)
        }
    }

    /// A secret is taken verbatim: no trimming.
    pub fn secret(&mut self, field: &str) -> Option<String> {
        let value = self.required(field)?;
        match value.as_str() {
            Some("") => {
                self.error(field, "This field may not be blank.");
                None
            }
            Some(raw) => Some(raw.to_string()),
            None => {
                self.error(field, "Not a valid string.");
                None
            }
        }
    }

    pub fn integer(&mut self, field: &str) -> Option<i64> {
        let value = self.required(field)?;
        self.read_integer(field, value)
    }

    pub fn optional_integer(&mut self, field: &str) -> Option<i64> {
        let value = self.optional(field)?;
        self.read_integer(field, value)
    }

    fn read_integer(&mut self, field: &str, value: &Value) -> Option<i64> {
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.error(field, "A valid integer is required.");
        }
        parsed
    }

    pub fn decimal(&mut self, field: &str, spec: DecimalSpec) -> Option<Decimal> {
        let value = self.required(field)?;
        self.read_decimal(field, value, spec)
    }

    pub fn optional_decimal(&mut self, field: &str, spec: DecimalSpec) -> Option<Decimal> {
        let value = self.optional(field)?;
        self.read_decimal(field, value, spec)
    }

    fn read_decimal(&mut self, field: &str, value: &Value, spec: DecimalSpec) -> Option<Decimal> {
        let Some(parsed) = parse_decimal(value) else {
            self.error(field, "A valid number is required.");
            return None;
        };
        let normalized = parsed.normalize();
        if normalized.scale() > spec.decimal_places {
            self.error(
                field,
                format!(
                    "Ensure that there are no more than {} decimal places.",
                    spec.decimal_places
                ),
            );
            return None;
        }
        let limit = Decimal::from(10i64.pow(spec.whole_digits));
        if normalized.abs().trunc() >= limit {
            self.error(
                field,
                format!(
                    "Ensure that there are no more than {} digits before the decimal point.",
                    spec.whole_digits
                ),
            );
            return None;
        }
        let mut coerced = normalized;
        coerced.rescale(spec.decimal_places);
        Some(coerced)
    }

    pub fn date(&mut self, field: &str) -> Option<NaiveDate> {
        let value = self.required(field)?;
        let parsed = value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
        if parsed.is_none() {
            self.error(
                field,
                "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
            );
        }
        parsed
    }

    /// One of a closed set of lowercase values.
    pub fn choice<T: FromStr>(&mut self, field: &str, allowed: &[&str]) -> Option<T> {
        let value = self.required(field)?;
        let parsed = value.as_str().and_then(|s| s.parse::<T>().ok());
        if parsed.is_none() {
            let shown = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            self.error(
                field,
                format!(
                    "\"{}\" is not a valid choice. Allowed values: {}.",
                    shown,
                    allowed.join(", ")
                ),
            );
        }
        parsed
    }

    /// Returns the built value when no field failed, the full report otherwise.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, FieldErrors> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        build().ok_or_else(|| FieldErrors::single(NON_FIELD_ERRORS, "Invalid data."))
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewIncome;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    #[test]
    fn decimals_are_coerced_to_two_places() {
        let record = json!({ "amount": 5000 });
        let mut fields = FieldReader::new(record.as_object().unwrap());
        let amount = fields.decimal("amount", MONEY).unwrap();
        assert_eq!(amount.to_string(), "5000.00");
    }

    #[test]
    fn decimals_reject_excess_precision() {
        let record = json!({ "amount": "10.125", "big": "12345678901.00" });
        let mut fields = FieldReader::new(record.as_object().unwrap());
        assert!(fields.decimal("amount", MONEY).is_none());
        assert!(fields.decimal("big", MONEY).is_none());
        let errors = fields.finish(|| Some(())).unwrap_err();
        assert_eq!(
            errors.messages("amount"),
            ["Ensure that there are no more than 2 decimal places."]
        );
        assert_eq!(
            errors.messages("big"),
            ["Ensure that there are no more than 10 digits before the decimal point."]
        );
    }

    #[test]
    fn missing_and_null_fields_are_reported_differently() {
        let record = json!({ "source": null });
        let mut fields = FieldReader::new(record.as_object().unwrap());
        fields.text("source", 3, 255);
        fields.date("date_received");
        let errors = fields.finish(|| Some(())).unwrap_err();
        assert_eq!(errors.messages("source"), ["This field may not be null."]);
        assert_eq!(errors.messages("date_received"), ["This field is required."]);
    }

    #[test]
    fn batch_with_one_bad_member_reports_by_index() {
        let body = json!([
            { "source": "Salary", "amount": "100.00", "date_received": "2025-03-01" },
            { "source": "X", "amount": "-1", "date_received": "2025-03-01" },
            "not an object"
        ]);
        let err = validate_submission::<NewIncome>(&body, today()).unwrap_err();
        let SubmissionError::Batch(report) = err else {
            panic!("expected a batch report");
        };
        assert_eq!(report.0.len(), 3);
        assert!(report.0[0].is_empty());
        assert!(report.0[1].contains("source"));
        assert!(report.0[1].contains("amount"));
        assert!(report.0[2].contains(NON_FIELD_ERRORS));
        assert_eq!(report.invalid_indexes(), vec![1, 2]);
    }

    #[test]
    fn batch_of_valid_members_is_accepted_whole() {
        let body = json!([
            { "source": "Salary", "amount": "100.00", "date_received": "2025-03-01" },
            { "source": "Bonus", "amount": 25, "date_received": "2025-03-02" }
        ]);
        let submission = validate_submission::<NewIncome>(&body, today()).unwrap();
        assert!(submission.is_batch());
        assert_eq!(submission.into_vec().len(), 2);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let err = validate_submission::<NewIncome>(&json!([]), today()).unwrap_err();
        assert!(matches!(err, SubmissionError::Single(e) if e.contains(NON_FIELD_ERRORS)));
    }

    #[test]
    fn merge_overlays_only_supplied_fields() {
        let base = json!({ "source": "Salary", "amount": "10.00" });
        let patch = json!({ "amount": "20.00" });
        let merged = merge_records(
            base.as_object().unwrap().clone(),
            patch.as_object().unwrap(),
        );
        assert_eq!(merged["source"], "Salary");
        assert_eq!(merged["amount"], "20.00");
    }
}
