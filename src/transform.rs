//! Record transformation rules.
//!
//! A record payload is parsed into a JSON object and passed through an ordered
//! list of [`Rule`]s. Each rule takes the mapping by value and hands back the
//! edited mapping, so a rule list is just a fold over the record:
//!
//! - `ProcessingTimestamp` stamps `processing_timestamp` with the local time
//! - `UppercaseMessage` uppercases a string `message`
//! - `RemovePassword` drops `password`
//! - `CalculateProduct` stores `value1 * value2` under `calculated`
//! - `FlattenNested` copies each `nested.K` to a top-level `flat_K`
//!
//! Rules whose precondition is not met leave the mapping unchanged.

use serde_json::{Number, Value};

use crate::clock::Clock;

pub type Mapping = serde_json::Map<String, Value>;

pub const PROCESSING_TIMESTAMP: &str = "processing_timestamp";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Reasons a record cannot be transformed. Any of them turns the record into
/// a `ProcessingFailed` pass-through.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TransformError {
    #[error("failed to decode record payload: {0}")]
    Decode(String),
    #[error("failed to parse record payload: {0}")]
    Parse(String),
    #[error("failed to serialize transformed record: {0}")]
    Serialization(String),
}

impl TransformError {
    pub fn kind(&self) -> &'static str {
        match self {
            TransformError::Decode(_) => "DecodeError",
            TransformError::Parse(_) => "ParseError",
            TransformError::Serialization(_) => "SerializationError",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    ProcessingTimestamp,
    UppercaseMessage,
    RemovePassword,
    CalculateProduct,
    FlattenNested,
}

impl Rule {
    pub fn apply(&self, data: Mapping, clock: &dyn Clock) -> Result<Mapping, TransformError> {
        match self {
            Rule::ProcessingTimestamp => Ok(processing_timestamp(data, clock)),
            Rule::UppercaseMessage => Ok(uppercase_message(data)),
            Rule::RemovePassword => Ok(remove_password(data)),
            Rule::CalculateProduct => calculate_product(data),
            Rule::FlattenNested => Ok(flatten_nested(data)),
        }
    }
}

/// Apply `rules` in order, stopping at the first failing rule.
pub fn apply_rules(
    data: Mapping,
    rules: &[Rule],
    clock: &dyn Clock,
) -> Result<Mapping, TransformError> {
    rules
        .iter()
        .try_fold(data, |data, rule| rule.apply(data, clock))
}

pub fn processing_timestamp(mut data: Mapping, clock: &dyn Clock) -> Mapping {
    let now = clock.now().format(TIMESTAMP_FORMAT).to_string();
    data.insert(PROCESSING_TIMESTAMP.to_string(), Value::String(now));
    data
}

pub fn uppercase_message(mut data: Mapping) -> Mapping {
    if let Some(Value::String(message)) = data.get_mut("message") {
        *message = message.to_uppercase();
    }
    data
}

pub fn remove_password(mut data: Mapping) -> Mapping {
    // shift_remove keeps the order of the remaining keys
    data.shift_remove("password");
    data
}

pub fn calculate_product(mut data: Mapping) -> Result<Mapping, TransformError> {
    let (Some(value1), Some(value2)) = (data.get("value1"), data.get("value2")) else {
        return Ok(data);
    };
    let (Some(value1), Some(value2)) = (as_float(value1), as_float(value2)) else {
        return Ok(data);
    };

    let product = value1 * value2;
    let calculated = Number::from_f64(product).ok_or_else(|| {
        TransformError::Serialization(format!(
            "calculated value {} is not representable as a JSON number",
            product
        ))
    })?;
    data.insert("calculated".to_string(), Value::Number(calculated));
    Ok(data)
}

pub fn flatten_nested(mut data: Mapping) -> Mapping {
    let flattened: Vec<(String, Value)> = match data.get("nested") {
        Some(Value::Object(nested)) => nested
            .iter()
            .map(|(key, value)| (format!("flat_{}", key), value.clone()))
            .collect(),
        _ => Vec::new(),
    };

    // later writes win on collision with an existing flat_ key
    data.extend(flattened);
    data
}

/// Lenient float conversion: numbers as-is, trimmed numeric strings, and
/// booleans as 1.0 / 0.0. Anything else does not convert.
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse a float literal, allowing single `_` digit separators ("1_000.5").
fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim();
    if !s.contains('_') {
        return s.parse::<f64>().ok();
    }

    let bytes = s.as_bytes();
    let mut literal = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        if c != '_' {
            literal.push(c);
            continue;
        }
        let between_digits = i > 0
            && bytes[i - 1].is_ascii_digit()
            && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if !between_digits {
            return None;
        }
    }
    literal.parse::<f64>().ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use serde_json::json;

    fn mapping(value: Value) -> Mapping {
        match value {
            Value::Object(map) => map,
            other => panic!("expected a JSON object, got {}", other),
        }
    }

    fn fixed_clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_micro_opt(10, 30, 45, 123456)
                .unwrap(),
        )
    }

    #[test]
    fn test_processing_timestamp() {
        let data = processing_timestamp(mapping(json!({"a": 1})), &fixed_clock());
        assert_eq!(data["processing_timestamp"], "2024-03-15T10:30:45.123456");
        assert_eq!(data["a"], 1);
    }

    #[test]
    fn test_processing_timestamp_keeps_microseconds_when_zero() {
        let clock = FixedClock(
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        let data = processing_timestamp(
            mapping(json!({"processing_timestamp": "old"})),
            &clock,
        );
        assert_eq!(data["processing_timestamp"], "2024-01-01T00:00:00.000000");
    }

    #[test]
    fn test_uppercase_message() {
        let data = uppercase_message(mapping(json!({"message": "hello wörld"})));
        assert_eq!(data["message"], "HELLO WÖRLD");

        // non-string messages are left alone
        let data = uppercase_message(mapping(json!({"message": 42})));
        assert_eq!(data["message"], 42);

        let data = uppercase_message(mapping(json!({"other": "x"})));
        assert!(!data.contains_key("message"));
    }

    #[test]
    fn test_remove_password_preserves_order() {
        let data = remove_password(mapping(json!({"a": 1, "password": "secret", "b": 2, "c": 3})));
        assert!(!data.contains_key("password"));
        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_calculate_product() {
        let data = calculate_product(mapping(json!({"value1": "2", "value2": "3"}))).unwrap();
        assert_eq!(data["calculated"], json!(6.0));
        assert!(data["calculated"].is_f64());

        let data = calculate_product(mapping(json!({"value1": 1.5, "value2": 4}))).unwrap();
        assert_eq!(data["calculated"], json!(6.0));

        let data = calculate_product(mapping(json!({"value1": " 2.5 ", "value2": true}))).unwrap();
        assert_eq!(data["calculated"], json!(2.5));
    }

    #[test]
    fn test_calculate_product_skips_unparseable() {
        let data = calculate_product(mapping(json!({"value1": "abc", "value2": "3"}))).unwrap();
        assert!(!data.contains_key("calculated"));

        let data = calculate_product(mapping(json!({"value1": null, "value2": "3"}))).unwrap();
        assert!(!data.contains_key("calculated"));

        let data = calculate_product(mapping(json!({"value1": [1], "value2": {"x": 1}}))).unwrap();
        assert!(!data.contains_key("calculated"));

        let data = calculate_product(mapping(json!({"value1": "2"}))).unwrap();
        assert!(!data.contains_key("calculated"));
    }

    #[test]
    fn test_calculate_product_digit_separators() {
        let data = calculate_product(mapping(json!({"value1": "1_000", "value2": "0.5"}))).unwrap();
        assert_eq!(data["calculated"], json!(500.0));

        let data = calculate_product(mapping(json!({"value1": "2_5.0_0", "value2": 2}))).unwrap();
        assert_eq!(data["calculated"], json!(50.0));

        for bad in ["_1000", "1000_", "1__000", "1_.5", "1._5"] {
            let data = calculate_product(mapping(json!({"value1": bad, "value2": "2"}))).unwrap();
            assert!(!data.contains_key("calculated"), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_calculate_product_non_finite() {
        let err = calculate_product(mapping(json!({"value1": "inf", "value2": "2"}))).unwrap_err();
        assert_eq!(err.kind(), "SerializationError");

        let err = calculate_product(mapping(json!({"value1": "nan", "value2": 1}))).unwrap_err();
        assert_eq!(err.kind(), "SerializationError");
    }

    #[test]
    fn test_flatten_nested() {
        let data = flatten_nested(mapping(json!({"nested": {"a": 1, "b": {"c": 2}}})));
        assert_eq!(data["flat_a"], 1);
        assert_eq!(data["flat_b"], json!({"c": 2}));
        assert_eq!(data["nested"], json!({"a": 1, "b": {"c": 2}}));
        assert!(!data.contains_key("flat_c"));

        let data = flatten_nested(mapping(json!({"nested": "not a mapping"})));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_flatten_nested_overwrites_existing_key() {
        let data = flatten_nested(mapping(json!({"flat_a": "old", "nested": {"a": "new"}})));
        assert_eq!(data["flat_a"], "new");
        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["flat_a", "nested"]);
    }

    #[test]
    fn test_apply_rules_in_order() {
        let rules = [
            Rule::ProcessingTimestamp,
            Rule::UppercaseMessage,
            Rule::RemovePassword,
            Rule::CalculateProduct,
            Rule::FlattenNested,
        ];
        let data = apply_rules(
            mapping(json!({"message": "hi", "password": "secret", "value1": "2", "value2": "3"})),
            &rules,
            &fixed_clock(),
        )
        .unwrap();

        assert_eq!(
            Value::Object(data),
            json!({
                "message": "HI",
                "value1": "2",
                "value2": "3",
                "processing_timestamp": "2024-03-15T10:30:45.123456",
                "calculated": 6.0
            })
        );
    }

    #[test]
    fn test_structural_rules_are_idempotent() {
        let rules = [
            Rule::UppercaseMessage,
            Rule::RemovePassword,
            Rule::CalculateProduct,
            Rule::FlattenNested,
        ];
        let input = mapping(json!({
            "message": "hi",
            "password": "secret",
            "value1": 4,
            "value2": "0.5",
            "nested": {"x": [1, 2]}
        }));

        let once = apply_rules(input, &rules, &fixed_clock()).unwrap();
        let twice = apply_rules(once.clone(), &rules, &fixed_clock()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice["calculated"], json!(2.0));
        assert_eq!(twice["flat_x"], json!([1, 2]));
    }
}
