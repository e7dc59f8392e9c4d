use serde_json::Value;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// Parses an address sent as a JSON string in a form field.
///
/// Only JSON objects are accepted.
pub fn parse_address(raw: &str) -> Option<Value> {
    serde_json::from_str::<Value>(raw)
        .ok()
        .filter(Value::is_object)
}

/// Accepts an address either as a JSON object or as a string holding one.
pub fn address_from_value(value: &Value) -> Option<Value> {
    match value {
        Value::String(raw) => parse_address(raw),
        Value::Object(_) => Some(value.clone()),
        _ => None,
    }
}

/// `true` and `"true"` are true, anything else is false.
pub fn flag_from_value(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(raw) => raw == "true",
        _ => false,
    }
}

/// Largest fee accepted, in whole currency units.
pub const MAX_AMOUNT: i64 = 10_000_000;

/// Reads an amount given either as a JSON integer or an integer string.
///
/// # Returns
///
/// `None` for fractions, non-numeric input, negatives and anything above
/// [`MAX_AMOUNT`].
pub fn amount_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().filter(|amount| (0..=MAX_AMOUNT).contains(amount)),
        Value::String(raw) => amount_from_str(raw),
        _ => None,
    }
}

pub fn amount_from_str(raw: &str) -> Option<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|amount| (0..=MAX_AMOUNT).contains(amount))
}

/// Returns the trimmed value when present and non-blank.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_needs_eight_characters() {
        assert!(!is_strong_password("1234567"));
        assert!(is_strong_password("12345678"));
    }

    #[test]
    fn address_must_be_a_json_object() {
        assert_eq!(
            parse_address(r#"{"line1":"17th Cross","line2":"Richmond"}"#),
            Some(json!({"line1": "17th Cross", "line2": "Richmond"}))
        );
        assert_eq!(parse_address("17th Cross"), None);
        assert_eq!(parse_address("[1,2]"), None);
        assert_eq!(
            address_from_value(&json!({"line1": "x"})),
            Some(json!({"line1": "x"}))
        );
        assert_eq!(address_from_value(&json!(3)), None);
    }

    #[test]
    fn flags_accept_bool_or_string() {
        assert!(flag_from_value(&json!(true)));
        assert!(flag_from_value(&json!("true")));
        assert!(!flag_from_value(&json!("yes")));
        assert!(!flag_from_value(&json!(null)));
    }

    #[test]
    fn amounts_accept_number_or_string() {
        assert_eq!(amount_from_value(&json!(500)), Some(500));
        assert_eq!(amount_from_value(&json!("750")), Some(750));
        assert_eq!(amount_from_value(&json!("abc")), None);
        assert_eq!(amount_from_str("-5"), None);
    }

    #[test]
    fn amounts_reject_floats_and_huge_values() {
        assert_eq!(amount_from_str("1e17"), None);
        assert_eq!(amount_from_str("NaN"), None);
        assert_eq!(amount_from_str("inf"), None);
        assert_eq!(amount_from_str("49.5"), None);
        assert_eq!(amount_from_str("10000001"), None);
        assert_eq!(amount_from_str(" 10000000 "), Some(MAX_AMOUNT));
        assert_eq!(amount_from_value(&json!(1e17)), None);
        assert_eq!(amount_from_value(&json!(i64::MAX)), None);
        assert_eq!(amount_from_value(&json!(12.5)), None);
    }

    #[test]
    fn blank_values_are_absent() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" Jane ")), Some("Jane".to_string()));
        assert_eq!(non_blank(None), None);
    }
}
