//! Registry of the named pure transforms a field mapping may reference.
//! Transforms never fail: a value they cannot interpret passes through
//! unchanged so a sloppy buyer config degrades to the raw value instead
//! of dropping the field.

use serde_json::Value;

pub type Transform = fn(&Value) -> Value;

const REGISTRY: &[(&str, Transform)] = &[
    ("boolean_to_yes_no", boolean_to_yes_no),
    ("yes_no_to_boolean", yes_no_to_boolean),
    ("phone_e164", phone_e164),
    ("date_mdy", date_mdy),
    ("uppercase", uppercase),
    ("lowercase", lowercase),
    ("trim", trim),
    ("zip5", zip5),
];

pub fn lookup(name: &str) -> Option<Transform> {
    REGISTRY
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, transform)| *transform)
}

pub fn is_known(name: &str) -> bool {
    lookup(name).is_some()
}

fn boolean_to_yes_no(value: &Value) -> Value {
    match value {
        Value::Bool(true) => Value::String("yes".to_string()),
        Value::Bool(false) => Value::String("no".to_string()),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Value::String("yes".to_string()),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Value::String("no".to_string()),
        other => other.clone(),
    }
}

fn yes_no_to_boolean(value: &Value) -> Value {
    match value {
        Value::String(s) if s.eq_ignore_ascii_case("yes") => Value::Bool(true),
        Value::String(s) if s.eq_ignore_ascii_case("no") => Value::Bool(false),
        other => other.clone(),
    }
}

/// Normalizes US phone numbers to E.164 (`+1XXXXXXXXXX`). Inputs that are
/// not 10 digits (or 11 starting with a 1) after stripping formatting are
/// left untouched.
fn phone_e164(value: &Value) -> Value {
    let Value::String(raw) = value else {
        return value.clone();
    };
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => Value::String(format!("+1{digits}")),
        11 if digits.starts_with('1') => Value::String(format!("+{digits}")),
        _ => value.clone(),
    }
}

/// `YYYY-MM-DD` to `MM/DD/YYYY`, the format most legacy buyer CRMs expect.
fn date_mdy(value: &Value) -> Value {
    let Value::String(raw) = value else {
        return value.clone();
    };
    match chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Value::String(date.format("%m/%d/%Y").to_string()),
        Err(_) => value.clone(),
    }
}

fn uppercase(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_uppercase()),
        other => other.clone(),
    }
}

fn lowercase(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other.clone(),
    }
}

fn trim(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    }
}

/// First five digits of a ZIP or ZIP+4.
fn zip5(value: &Value) -> Value {
    let Value::String(raw) = value else {
        return value.clone();
    };
    let digits: String = raw.chars().filter(char::is_ascii_digit).take(5).collect();
    if digits.len() == 5 {
        Value::String(digits)
    } else {
        value.clone()
    }
}
