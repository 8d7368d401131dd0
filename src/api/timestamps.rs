use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Reads a backend timestamp without failing the surrounding record.
///
/// Accepts RFC 3339, zone-less `YYYY-MM-DD HH:MM:SS[.fff]` (taken as UTC) and
/// integer epoch milliseconds. Anything else becomes `None`.
pub(crate) fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_value))
}

fn parse_value(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::String(s) => parse_str(s.trim()),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    };
    if parsed.is_none() && !value.is_null() {
        debug!(%value, "Unreadable timestamp; ignoring");
    }
    parsed
}

fn parse_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepted_forms() {
        let rfc = parse_value(&json!("2024-03-01T10:00:00Z")).unwrap();
        assert_eq!(rfc.to_rfc3339(), "2024-03-01T10:00:00+00:00");

        let offset = parse_value(&json!("2024-03-01T12:00:00+02:00")).unwrap();
        assert_eq!(offset, rfc);

        let spaced = parse_value(&json!("2024-03-01 10:00:00")).unwrap();
        assert_eq!(spaced, rfc);

        let fractional = parse_value(&json!("2024-03-01 10:00:00.250")).unwrap();
        assert_eq!(fractional.timestamp_millis(), rfc.timestamp_millis() + 250);

        let millis = parse_value(&json!(rfc.timestamp_millis())).unwrap();
        assert_eq!(millis, rfc);
    }

    #[test]
    fn unreadable_values_become_none() {
        assert_eq!(parse_value(&json!("yesterday")), None);
        assert_eq!(parse_value(&json!("")), None);
        assert_eq!(parse_value(&json!(true)), None);
        assert_eq!(parse_value(&json!({"seconds": 1})), None);
        assert_eq!(parse_value(&json!(null)), None);
    }
}
