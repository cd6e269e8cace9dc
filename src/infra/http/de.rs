//! Lenient deserializers for vendor payloads.

use serde::{Deserialize, Deserializer};

/// Accepts `12`, `12.5`, `"12"`, `"12.5"`, `""` (zero) or `null` (zero)
pub fn number_from_any<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(NumberOrString::Number(value)) => Ok(value),
        Some(NumberOrString::Text(text)) if text.trim().is_empty() => Ok(0.0),
        Some(NumberOrString::Text(text)) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Treats `null` as an empty list
pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Treats `null` as an empty string
pub fn null_as_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "number_from_any")]
        value: f64,
        #[serde(default, deserialize_with = "null_as_empty")]
        items: Vec<String>,
    }

    fn parse(json: &str) -> Result<Holder, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_number_from_any() {
        assert_eq!(parse(r#"{"value": 12}"#).unwrap().value, 12.0);
        assert_eq!(parse(r#"{"value": "12.5"}"#).unwrap().value, 12.5);
        assert_eq!(parse(r#"{"value": ""}"#).unwrap().value, 0.0);
        assert_eq!(parse(r#"{"value": null}"#).unwrap().value, 0.0);
        assert_eq!(parse(r#"{}"#).unwrap().value, 0.0);
        assert!(parse(r#"{"value": "abc"}"#).is_err());
    }

    #[test]
    fn test_null_as_empty() {
        assert!(parse(r#"{"items": null}"#).unwrap().items.is_empty());
        assert_eq!(parse(r#"{"items": ["a"]}"#).unwrap().items, vec!["a".to_string()]);
    }
}
