use crate::error::Result;
use serde::Serialize;
use serde_json::Value;

/// Settings shared by every piece of diagnostic and error output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializerSettings {
    /// Indent nested values.
    pub pretty: bool,
}

/// The process-wide JSON serializer.
///
/// Action arguments in the diagnostic log and structured error bodies both go
/// through one instance so their formatting never diverges.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    settings: SerializerSettings,
}

impl JsonSerializer {
    pub fn new(settings: SerializerSettings) -> Self {
        Self { settings }
    }

    pub fn to_text<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let text = if self.settings.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(text)
    }

    /// Render an already captured value. A `Value` always serializes.
    pub fn value_to_text(&self, value: &Value) -> String {
        if self.settings.pretty {
            format!("{:#}", value)
        } else {
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_and_pretty_rendering() {
        let value = json!({ "id": -1 });

        let compact = JsonSerializer::default();
        assert_eq!(compact.value_to_text(&value), r#"{"id":-1}"#);
        assert_eq!(compact.to_text(&value).unwrap(), r#"{"id":-1}"#);

        let pretty = JsonSerializer::new(SerializerSettings { pretty: true });
        assert_eq!(pretty.value_to_text(&value), "{\n  \"id\": -1\n}");
        assert_eq!(pretty.to_text(&value).unwrap(), pretty.value_to_text(&value));
    }
}
