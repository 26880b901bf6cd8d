use std::{collections::BTreeMap, sync::OnceLock};

use regex::Regex;
use serde_json::{Number, Value};

use crate::{Error, Result};

/// Validated tags or properties: lowercase-hyphen keys mapped to stringified values.
pub type KeyValueMap = BTreeMap<String, String>;

fn key_pattern() -> &'static Regex {
    static KEY_PATTERN: OnceLock<Regex> = OnceLock::new();
    KEY_PATTERN.get_or_init(|| Regex::new("^[a-z-]+$").expect("key pattern is a valid regex"))
}

/// Validate a tag/property dictionary and coerce its values to strings.
///
/// `property` names the dictionary being validated (`"tags"` or `"properties"`) and is only used
/// in error messages. Validation stops at the first offending entry; nothing is returned for a
/// partially valid input.
pub fn validate_key_value_map<I, K, V>(property: &str, contents: I) -> Result<KeyValueMap>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let mut validated = KeyValueMap::new();
    for (key, value) in contents {
        let key = key.into();
        if !key_pattern().is_match(&key) {
            return Err(Error::invalid_message(format!(
                "The key [{key}] of the \"{property}\" property is invalid. Keys must be strings and may only contain lowercase letters and hyphens."
            )));
        }

        let Some(value) = stringify(value.into()) else {
            return Err(Error::invalid_message(format!(
                "The value for the key [{key}] of the \"{property}\" property is invalid. Values must always be stringable."
            )));
        };

        validated.insert(key, value);
    }
    Ok(validated)
}

/// Null and scalars have a string form. Arrays and objects don't.
///
/// Booleans follow the API's historical form: `true` is `"1"` and `false` is empty. Whole floats
/// drop their fractional part, so `1.0` and `1` both become `"1"`.
fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(true) => Some("1".to_owned()),
        Value::Bool(false) => Some(String::new()),
        Value::Number(n) => Some(number_to_string(&n)),
        Value::String(s) => Some(s),
        Value::Array(_) | Value::Object(_) => None,
    }
}

// Integers below 2^53 are exactly representable as f64.
const MAX_WHOLE_FLOAT: f64 = 9_007_199_254_740_992.0;

fn number_to_string(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_WHOLE_FLOAT => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}
