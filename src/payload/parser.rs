use crate::{reading::RawReading, Error, Result};
use serde_json::{Map, Value};
use std::fmt;

use super::Channel;

/// Opaque server-side marker (timestamp or counter) used to spot a frozen feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaleToken(String);

impl StaleToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for StaleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One decoded sensor record, shared by the serial device and the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorPayload {
    pub reading: RawReading,
    pub token: Option<StaleToken>,
}

impl SensorPayload {
    pub fn new(reading: RawReading) -> Self {
        Self {
            reading,
            token: None,
        }
    }

    /// Parse a JSON text holding exactly one record object.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(decode_record(map)),
            other => Err(Error::Parse(format!(
                "expected a JSON object, got {}",
                kind_of(other)
            ))),
        }
    }

    /// Decode a device line, tolerating noise around the JSON object.
    pub fn from_line(line: &str) -> Result<Self> {
        let object = extract_json_object(line)
            .ok_or_else(|| Error::Parse("no JSON object in line".into()))?;
        Self::from_json_str(object)
    }
}

/// Map a record to a reading. Field problems are absorbed as 0, never rejected.
pub fn decode_record(map: &Map<String, Value>) -> SensorPayload {
    let mut reading = RawReading::zero();
    for channel in Channel::ALL {
        let value = channel
            .keys()
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|v| !v.is_null())
            .map(coerce_number)
            .unwrap_or(0.0);
        reading.set(channel, value);
    }
    let token = map.get("ts").and_then(StaleToken::from_value);
    SensorPayload { reading, token }
}

/// Lenient number coercion: numbers, numeric strings and booleans count,
/// anything else (or a non-finite result) is 0.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Slice between the first `{` and the last `}` of a line.
pub fn extract_json_object(line: &str) -> Option<&str> {
    let start = line.find('{')?;
    let end = line.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&line[start..=end])
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_zero() {
        let payload = SensorPayload::from_json_str(r#"{"toe":120}"#).unwrap();
        assert_eq!(payload.reading.get(Channel::Toe), 120.0);
        assert_eq!(payload.reading.get(Channel::Inside), 0.0);
        assert_eq!(payload.reading.get(Channel::Bridge), 0.0);
        assert!(payload.token.is_none());
    }

    #[test]
    fn heel_alias_matches_canonical_key() {
        let alias = SensorPayload::from_json_str(r#"{"heel":321}"#).unwrap();
        let canonical = SensorPayload::from_json_str(r#"{"vrist2":321}"#).unwrap();
        assert_eq!(alias, canonical);
        assert_eq!(alias.reading.get(Channel::Vrist2), 321.0);
    }

    #[test]
    fn canonical_key_wins_over_alias() {
        let payload =
            SensorPayload::from_json_str(r#"{"inside2":5,"innside2":6,"outside":7}"#).unwrap();
        assert_eq!(payload.reading.get(Channel::Inside2), 5.0);
    }

    #[test]
    fn null_field_falls_through_to_alias() {
        let payload = SensorPayload::from_json_str(r#"{"vrist2":null,"wrist2":44}"#).unwrap();
        assert_eq!(payload.reading.get(Channel::Vrist2), 44.0);
    }

    #[test]
    fn bad_field_values_coerce_to_zero() {
        let payload =
            SensorPayload::from_json_str(r#"{"toe":"abc","inside":"250","laces":[1],"bridge":true}"#)
                .unwrap();
        assert_eq!(payload.reading.get(Channel::Toe), 0.0);
        assert_eq!(payload.reading.get(Channel::Inside), 250.0);
        assert_eq!(payload.reading.get(Channel::Laces), 0.0);
        assert_eq!(payload.reading.get(Channel::Bridge), 1.0);
    }

    #[test]
    fn token_accepts_string_and_number() {
        let s = SensorPayload::from_json_str(r#"{"ts":"2024-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(s.token, Some(StaleToken::new("2024-01-01T00:00:00Z")));
        let n = SensorPayload::from_json_str(r#"{"ts":1718000000123}"#).unwrap();
        assert_eq!(n.token, Some(StaleToken::new("1718000000123")));
        let empty = SensorPayload::from_json_str(r#"{"ts":""}"#).unwrap();
        assert!(empty.token.is_none());
    }

    #[test]
    fn noisy_line_extracts_object() {
        let payload = SensorPayload::from_line(r#"garbage{"toe":100}trailing"#).unwrap();
        assert_eq!(payload.reading.get(Channel::Toe), 100.0);
    }

    #[test]
    fn line_without_object_is_rejected() {
        assert!(SensorPayload::from_line("not json at all").is_err());
        assert!(SensorPayload::from_line("} backwards {").is_err());
        assert!(SensorPayload::from_line("{broken").is_err());
    }

    #[test]
    fn non_object_json_is_rejected() {
        let err = SensorPayload::from_json_str("[1,2,3]").unwrap_err();
        assert!(format!("{err}").contains("array"));
    }
}
