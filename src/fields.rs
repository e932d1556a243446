use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Prefix added to the key of a field whose value was parsed as JSON.
pub const JSON_KEY_PREFIX: char = '$';

/// Typed value of an extracted field once it's been coerced
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Value kept as it was received
    Text(String),
    /// Digit-only value, kept exact whatever its size
    Integer(Number),
    /// Value holding a JSON object
    Json(Value),
}

/// Result of trying to read a field value as a structure.
#[derive(Debug, PartialEq)]
pub enum Coerced {
    /// The value was a JSON object
    Parsed(Value),
    /// The value must stay a string
    Raw(String),
}

/// First code point of every run of ten Unicode decimal digits (category Nd).
const DECIMAL_ZEROS: [u32; 68] = [
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66,
    0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946,
    0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0,
    0xA9F0, 0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x11066, 0x110F0, 0x11136, 0x111D0,
    0x112F0, 0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730, 0x118E0, 0x11950, 0x11C50, 0x11D50,
    0x11DA0, 0x11F50, 0x16A60, 0x16AC0, 0x16B50, 0x1D7CE, 0x1D7D8, 0x1D7E2, 0x1D7EC, 0x1D7F6,
    0x1E140, 0x1E2F0, 0x1E4F0, 0x1E950, 0x1FBF0,
];

fn decimal_digit(c: char) -> Option<char> {
    let code = c as u32;
    let run = DECIMAL_ZEROS.partition_point(|&zero| zero <= code);
    let zero = DECIMAL_ZEROS.get(run.checked_sub(1)?)?;
    char::from_digit(code - zero, 10)
}

/// Read a value made only of decimal digits, in any script, as an integer.
fn parse_integer(value: &str) -> Option<Number> {
    if value.is_empty() {
        return None;
    }
    let digits = value.chars().map(decimal_digit).collect::<Option<String>>()?;
    // JSON numbers can't have leading zeros
    let significant = match digits.trim_start_matches('0') {
        "" => "0",
        rest => rest,
    };
    significant.parse().ok()
}

/// Only values that look like an object are worth a parse attempt.
fn parse_object(value: &str) -> Coerced {
    if !value.starts_with('{') {
        return Coerced::Raw(value.to_owned());
    }
    match serde_json::from_str::<Value>(value) {
        Ok(parsed) => Coerced::Parsed(parsed),
        Err(_) => Coerced::Raw(value.to_owned()),
    }
}

/// Coerce one extracted field, returning the key to store it under.
pub fn coerce_field(key: &str, value: &str) -> (String, FieldValue) {
    if let Some(n) = parse_integer(value) {
        return (key.to_owned(), FieldValue::Integer(n));
    }

    match parse_object(value) {
        Coerced::Parsed(parsed) => (
            format!("{JSON_KEY_PREFIX}{key}"),
            FieldValue::Json(parsed),
        ),
        Coerced::Raw(raw) => (key.to_owned(), FieldValue::Text(raw)),
    }
}

/// Coerce every extracted field of a log event.
pub fn coerce_fields(fields: &BTreeMap<String, String>) -> BTreeMap<String, FieldValue> {
    fields
        .iter()
        .map(|(key, value)| coerce_field(key, value))
        .collect()
}
