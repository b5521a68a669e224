use crate::generation::fields::{FieldPlanEntry, FieldSource};
use crate::generation::generators::GeneratorRegistry;
use crate::perception::types::ElementMap;

/// Value used when nothing better is available.
pub const PLACEHOLDER_VALUE: &str = "N/A";

/// Fills in field values from the model's plan.
///
/// Per field, first match wins:
/// 1. `config` / `llm` sources keep their value.
/// 2. An allow-listed `faker_function` is called; `source` becomes `faker`.
///    A failing generator falls through.
/// 3. The placeholder value with `source = llm`.
///
/// Independently, a field whose `id` names a known element gets that
/// element's descriptor as `metadata`.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    generators: GeneratorRegistry,
}

impl FieldResolver {
    pub fn new(generators: GeneratorRegistry) -> Self {
        Self { generators }
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    pub fn resolve(
        &self,
        mut entry: FieldPlanEntry,
        elements: &ElementMap,
        config: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> FieldPlanEntry {
        if !self.keep_trusted(&mut entry, config) && !self.try_generate(&mut entry) {
            entry.value = serde_json::Value::String(PLACEHOLDER_VALUE.to_string());
            entry.source = Some(FieldSource::Llm);
        }

        if let Some(descriptor) = entry.id.as_ref().and_then(|id| elements.get(id)) {
            entry.metadata = Some(descriptor.clone());
        }
        entry
    }

    pub fn resolve_all(
        &self,
        entries: Vec<FieldPlanEntry>,
        elements: &ElementMap,
        config: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Vec<FieldPlanEntry> {
        entries
            .into_iter()
            .map(|entry| self.resolve(entry, elements, config))
            .collect()
    }

    fn keep_trusted(
        &self,
        entry: &mut FieldPlanEntry,
        config: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> bool {
        let Some(source) = entry.source.filter(|s| s.is_trusted()) else {
            return false;
        };
        if !entry.has_value() {
            // config-sourced fields may leave the lookup to us
            let from_config = (source == FieldSource::Config)
                .then(|| config.and_then(|c| config_lookup(c, &entry.field_name)))
                .flatten();
            entry.value = from_config.unwrap_or_else(|| {
                tracing::debug!(field = %entry.field_name, ?source, "trusted field has no value");
                serde_json::Value::String(PLACEHOLDER_VALUE.to_string())
            });
        }
        true
    }

    fn try_generate(&self, entry: &mut FieldPlanEntry) -> bool {
        let Some(function) = entry.faker_function.as_deref() else {
            return false;
        };
        match self.generators.generate(function) {
            Some(Ok(value)) => {
                entry.value = serde_json::Value::String(value);
                entry.source = Some(FieldSource::Faker);
                true
            }
            Some(Err(e)) => {
                tracing::warn!(field = %entry.field_name, generator = %function, error = %e, "generator failed");
                false
            }
            None => {
                tracing::debug!(field = %entry.field_name, generator = %function, "generator not allow-listed");
                false
            }
        }
    }
}

/// Case-insensitive, separator-insensitive key match ("First Name" ~ "first_name").
fn config_lookup(
    config: &serde_json::Map<String, serde_json::Value>,
    field_name: &str,
) -> Option<serde_json::Value> {
    let wanted = squash(field_name);
    if wanted.is_empty() {
        return None;
    }
    config
        .iter()
        .find(|(k, _)| squash(k) == wanted)
        .map(|(_, v)| v.clone())
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EuporieError;
    use crate::perception::types::ElementDescriptor;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> FieldPlanEntry {
        serde_json::from_value(value).unwrap()
    }

    fn elements() -> ElementMap {
        let mut map = ElementMap::new();
        for i in 1..=3 {
            map.insert(
                i.to_string(),
                ElementDescriptor {
                    element_type: "EditText".into(),
                    bounds: format!("[0,{}][100,{}]", i * 100, i * 100 + 50),
                    ..Default::default()
                },
            );
        }
        map
    }

    fn resolver() -> FieldResolver {
        FieldResolver::new(GeneratorRegistry::restricted_to(&["email", "name"]))
    }

    #[test]
    fn config_source_is_kept_even_with_generator() {
        let resolved = resolver().resolve(
            entry(json!({
                "field_name": "email",
                "value": "qa@corp.test",
                "source": "config",
                "faker_function": "email"
            })),
            &ElementMap::new(),
            None,
        );
        assert_eq!(resolved.value, json!("qa@corp.test"));
        assert_eq!(resolved.source, Some(FieldSource::Config));
    }

    #[test]
    fn llm_source_is_kept() {
        let resolved = resolver().resolve(
            entry(json!({"field_name": "nickname", "value": "Ace", "source": "llm"})),
            &ElementMap::new(),
            None,
        );
        assert_eq!(resolved.value, json!("Ace"));
        assert_eq!(resolved.source, Some(FieldSource::Llm));
    }

    #[test]
    fn allow_listed_generator_is_invoked() {
        let resolved = resolver().resolve(
            entry(json!({"field_name": "email", "faker_function": "email"})),
            &ElementMap::new(),
            None,
        );
        assert_eq!(resolved.source, Some(FieldSource::Faker));
        assert!(resolved.value.as_str().unwrap().contains('@'));
    }

    #[test]
    fn unknown_generator_falls_back_to_placeholder() {
        let resolved = resolver().resolve(
            entry(json!({"field_name": "iban", "faker_function": "iban", "source": "faker"})),
            &ElementMap::new(),
            None,
        );
        assert_eq!(resolved.value, json!(PLACEHOLDER_VALUE));
        assert_eq!(resolved.source, Some(FieldSource::Llm));
    }

    #[test]
    fn failing_generator_falls_back_to_placeholder() {
        fn broken(_: &mut dyn rand::RngCore) -> crate::errors::EuporieResult<String> {
            Err(EuporieError::Generator("boom".into()))
        }
        let resolver = FieldResolver::new(GeneratorRegistry::empty().with("broken", broken));
        let resolved = resolver.resolve(
            entry(json!({"field_name": "x", "faker_function": "broken"})),
            &ElementMap::new(),
            None,
        );
        assert_eq!(resolved.value, json!(PLACEHOLDER_VALUE));
        assert_eq!(resolved.source, Some(FieldSource::Llm));
    }

    #[test]
    fn metadata_is_joined_by_id() {
        let map = elements();
        let resolved = resolver().resolve(
            entry(json!({"id": "3", "field_name": "city", "value": "Oslo", "source": "llm"})),
            &map,
            None,
        );
        assert_eq!(resolved.metadata.as_ref(), Some(&map["3"]));
        assert_eq!(
            serde_json::to_value(&resolved).unwrap()["metadata"]["bounds"],
            json!("[0,300][100,350]")
        );
    }

    #[test]
    fn unknown_id_adds_no_metadata() {
        let resolved = resolver().resolve(
            entry(json!({"id": "9", "field_name": "city", "value": "Oslo", "source": "llm"})),
            &elements(),
            None,
        );
        assert!(resolved.metadata.is_none());
        let value = serde_json::to_value(&resolved).unwrap();
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn config_field_without_value_reads_config() {
        let config = json!({"First Name": "Grace", "country": "NO"});
        let resolved = resolver().resolve(
            entry(json!({"field_name": "first_name", "source": "config file"})),
            &ElementMap::new(),
            config.as_object(),
        );
        assert_eq!(resolved.value, json!("Grace"));
        assert_eq!(resolved.source, Some(FieldSource::Config));
    }

    #[test]
    fn resolve_all_keeps_order() {
        let resolved = resolver().resolve_all(
            vec![
                entry(json!({"field_name": "a", "value": "1", "source": "llm"})),
                entry(json!({"field_name": "b"})),
            ],
            &ElementMap::new(),
            None,
        );
        let names: Vec<&str> = resolved.iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(resolved[1].value, json!(PLACEHOLDER_VALUE));
    }
}
