use serde_json::Value;

/// Snapshot the host pipes into the statusline command on every prompt render.
///
/// Every field is optional in the payload. A field that is missing or carries
/// the wrong JSON type falls back to its default instead of rejecting the whole
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusInput {
    pub model_display_name: String,
    pub total_cost_usd: f64,
    /// Not clamped here; the renderer clamps the bar and prints the raw value.
    pub context_used_percentage: f64,
    pub current_dir: String,
    pub session_id: String,
}

impl Default for StatusInput {
    fn default() -> Self {
        Self {
            model_display_name: "?".to_string(),
            total_cost_usd: 0.0,
            context_used_percentage: 0.0,
            current_dir: String::new(),
            session_id: "default".to_string(),
        }
    }
}

impl StatusInput {
    /// Parse raw stdin bytes. Empty or malformed input yields the defaults.
    pub fn from_slice(raw: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(err) => {
                tracing::debug!("stdin is not valid json ({err}), using defaults");
                Self::default()
            }
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let str_at = |ptr: &str| value.pointer(ptr).and_then(Value::as_str);
        let num_at = |ptr: &str| value.pointer(ptr).and_then(Value::as_f64);

        Self {
            model_display_name: str_at("/model/display_name")
                .map(str::to_string)
                .unwrap_or(defaults.model_display_name),
            total_cost_usd: num_at("/cost/total_cost_usd").unwrap_or(defaults.total_cost_usd),
            context_used_percentage: num_at("/context_window/used_percentage")
                .unwrap_or(defaults.context_used_percentage),
            current_dir: str_at("/workspace/current_dir")
                .map(str::to_string)
                .unwrap_or(defaults.current_dir),
            session_id: str_at("/session_id")
                .map(str::to_string)
                .unwrap_or(defaults.session_id),
        }
    }

    /// Last path segment of the working directory, `/` or `\` separated.
    pub fn folder_name(&self) -> &str {
        crate::utils::leaf_name(&self.current_dir)
    }
}
