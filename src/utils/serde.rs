/*!
 * Serde utilities for common serialization/deserialization patterns.
 *
 * Configuration and secret payloads are written by hand, so scalar fields that are
 * semantically strings or ports are accepted in either their string or numeric form.
 */

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize an optional field that may be written as a string or a number.
///
/// Used by cron schedule fields, where both `minute = 0` and `minute = "0/15"` are
/// reasonable to write.
///
/// ```toml
/// [job_flows.steps.cron]
/// minute = 0          # becomes "0"
/// hour = "4"          # stays "4"
/// week_day = "MON-FRI"
/// ```
pub fn deserialize_optional_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "Expected a string or number, found {other}"
        ))),
    }
}

/// Deserialize a port that may be stored as a number or a numeric string.
///
/// Secret payloads written by different tooling disagree on this.
pub fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Value = Deserialize::deserialize(deserializer)?;
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|port| u16::try_from(port).ok())
            .ok_or_else(|| D::Error::custom(format!("Port out of range: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<u16>()
            .map_err(|e| D::Error::custom(format!("Invalid port '{s}': {e}"))),
        other => Err(D::Error::custom(format!(
            "Port must be a number or numeric string, found {other}"
        ))),
    }
}
