//! Lenient request field decoding.
//!
//! Tool arguments arrive from form-style clients as either strings or
//! numbers. They are passed through to the command line as text.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accept a string, number or boolean as text; `null` becomes empty.
pub(crate) fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "loose_string")]
        value: String,
    }

    fn decode(body: Value) -> String {
        serde_json::from_value::<Probe>(body).unwrap().value
    }

    #[test]
    fn strings_pass_through() {
        assert_eq!(decode(json!({ "value": "1e-5" })), "1e-5");
    }

    #[test]
    fn numbers_and_booleans_become_text() {
        assert_eq!(decode(json!({ "value": 11 })), "11");
        assert_eq!(decode(json!({ "value": 0.5 })), "0.5");
        assert_eq!(decode(json!({ "value": true })), "true");
    }

    #[test]
    fn absent_or_null_is_empty() {
        assert_eq!(decode(json!({})), "");
        assert_eq!(decode(json!({ "value": null })), "");
    }
}
