use serde::Deserialize;
use serde_json::Value;

/// Field whose presence marks a usage document (API response or cache body) as valid.
pub const USAGE_MARKER_FIELD: &str = "five_hour";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UsageWindow {
    /// Percent of the window consumed. May fall outside 0..=100.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub utilization: f64,
    /// ISO-8601 reset instant. Kept raw so the renderer can tell
    /// "missing" and "unparseable" apart from a real time.
    #[serde(default, deserialize_with = "lenient_string")]
    pub resets_at: Option<String>,
}

/// Rate-limit usage for the rolling five hour session and the seven day week.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UsageSnapshot {
    #[serde(default, deserialize_with = "lenient_window")]
    pub five_hour: UsageWindow,
    #[serde(default, deserialize_with = "lenient_window")]
    pub seven_day: UsageWindow,
}

impl UsageSnapshot {
    /// Accept a usage document only when its marker field is truthy.
    pub fn from_document(doc: &Value) -> Option<Self> {
        if !is_truthy(doc.get(USAGE_MARKER_FIELD)) {
            return None;
        }
        serde_json::from_value(doc.clone()).ok()
    }
}

/// Loose truthiness: null, false, 0, "" and missing are all false.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(v.as_f64().unwrap_or(0.0))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(v.as_str().map(str::to_string))
}

fn lenient_window<'de, D>(deserializer: D) -> Result<UsageWindow, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(v).unwrap_or_default())
}
