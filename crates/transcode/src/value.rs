//! JSON value → CSV cell conversion.

use serde_json::Value;

/// Wrapper for CSV cell values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvValue(pub String);

impl CsvValue {
    /// Get the inner CSV string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Get a reference to the inner CSV string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Value> for CsvValue {
    fn from(value: &Value) -> Self {
        match value {
            // Null - empty string
            Value::Null => CsvValue::default(),

            Value::Bool(b) => CsvValue(b.to_string()),

            // Numbers keep their source text, including integers beyond 64 bits
            Value::Number(n) => CsvValue(n.to_string()),

            // Strings are written unquoted; the CSV writer handles escaping
            Value::String(s) => CsvValue(s.clone()),

            // Nested values - serialize as compact JSON
            Value::Array(_) | Value::Object(_) => {
                CsvValue(serde_json::to_string(value).unwrap_or_default())
            }
        }
    }
}

impl From<Option<&Value>> for CsvValue {
    fn from(value: Option<&Value>) -> Self {
        value.map(CsvValue::from).unwrap_or_default()
    }
}
