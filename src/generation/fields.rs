use serde::{Deserialize, Deserializer, Serialize};

use crate::perception::types::ElementDescriptor;

/// Where a field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Config,
    Faker,
    Llm,
}

impl FieldSource {
    /// Accepts the canonical names plus the older spellings models still
    /// emit ("config file", "generated").
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "config" | "config file" | "config_file" | "configuration" => Some(FieldSource::Config),
            "faker" => Some(FieldSource::Faker),
            "llm" | "generated" | "model" | "ai" => Some(FieldSource::Llm),
            _ => None,
        }
    }

    /// Values from these sources are kept as the model returned them.
    pub fn is_trusted(self) -> bool {
        matches!(self, FieldSource::Config | FieldSource::Llm)
    }
}

/// One field the decision model wants populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldPlanEntry {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default)]
    pub field_name: String,
    #[serde(default = "default_input_type")]
    pub input_type: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(
        default,
        deserialize_with = "lenient_source",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<FieldSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faker_function: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ElementDescriptor>,
    /// Anything else the model attached, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FieldPlanEntry {
    /// Null and empty-string values count as missing.
    pub fn has_value(&self) -> bool {
        match &self.value {
            serde_json::Value::Null => false,
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

fn default_input_type() -> String {
    "text".to_string()
}

/// Models return ids as strings or bare numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Unknown sources are dropped; the resolver assigns one.
fn lenient_source<'de, D>(deserializer: D) -> Result<Option<FieldSource>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(|raw| {
        let parsed = FieldSource::parse(raw);
        if parsed.is_none() {
            tracing::debug!(source = %raw, "unrecognised field source");
        }
        parsed
    }))
}
