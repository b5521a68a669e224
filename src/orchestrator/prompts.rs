//! Message construction for the decision model.
use crate::llm::types::{ChatMessage, ContentPart};
use crate::perception::types::{ElementOrigin, Extraction};

const SYSTEM_TEMPLATE: &str = "\
You are Euporie, an agent that prepares test data for mobile application screens.

First decide whether the current screen needs any data entered (text fields, \
search boxes, forms). Base the decision on the screenshot and/or element list \
you are given. Screens without input fields never need data.

Reply with a single JSON object and nothing else.

When no data is needed:
{\"data_generation_required\": false, \"reason\": \"<short explanation>\"}

When data is needed:
{\"data_generation_required\": true, \"fields\": [
  {\"id\": \"<element id from the element list, if known>\",
   \"field_name\": \"<label of the field>\",
   \"input_type\": \"text | number | date | email | password | phone\",
   \"value\": \"<value, when you supply it>\",
   \"source\": \"config | faker | llm\",
   \"faker_function\": \"<generator name, when source is faker>\"}
]}

Rules:
- Use source \"config\" with the configured value when the configuration data \
contains a value for the field.
- Otherwise prefer source \"faker\" and name one of the available generators; \
leave value empty, it is filled in for you.
- Use source \"llm\" and write the value yourself only when no generator fits.
- Element ids refer to the numbered boxes on the screenshot and the keys of the \
element list. Only use ids that exist.
- Identical screens must get identical decisions.

Available generators: {generators}";

pub fn system_prompt(generators: &[&str]) -> String {
    let list = if generators.is_empty() {
        "(none)".to_string()
    } else {
        generators.join(", ")
    };
    SYSTEM_TEMPLATE.replace("{generators}", &list)
}

pub fn config_message(config: &serde_json::Map<String, serde_json::Value>) -> ChatMessage {
    let pretty = serde_json::to_string_pretty(config).unwrap_or_else(|_| "{}".to_string());
    ChatMessage::user(format!("Configuration data for field generation: {pretty}"))
}

/// Textual dump of the canonical elements, worded by where they came from.
pub fn elements_message(extraction: &Extraction) -> ChatMessage {
    let dump = serde_json::to_string_pretty(&extraction.elements).unwrap_or_else(|_| "{}".to_string());
    let text = match extraction.origin {
        ElementOrigin::ActionableElements => {
            format!("These are the actionable elements of that screen: {dump}")
        }
        ElementOrigin::Hierarchy => format!("This is the xml source of that screen: {dump}"),
    };
    ChatMessage::user(text)
}

pub fn screenshot_message(mime: &str, base64: &str, annotated: bool) -> ChatMessage {
    let caption = if annotated {
        "This is the screenshot of the current screen. Every input element is boxed and labelled with its element id."
    } else {
        "This is the screenshot of the current screen"
    };
    ChatMessage::user_parts(vec![
        ContentPart::text(caption),
        ContentPart::image_base64(mime, base64),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::types::{ElementDescriptor, ElementMap};

    fn extraction(origin: ElementOrigin) -> Extraction {
        let mut elements = ElementMap::new();
        elements.insert("1".into(), ElementDescriptor::default());
        Extraction {
            elements,
            frame: None,
            origin,
        }
    }

    #[test]
    fn system_prompt_lists_generators() {
        let prompt = system_prompt(&["email", "name"]);
        assert!(prompt.ends_with("Available generators: email, name"));
        assert!(system_prompt(&[]).ends_with("(none)"));
    }

    #[test]
    fn wording_follows_origin() {
        let xml = elements_message(&extraction(ElementOrigin::Hierarchy)).text();
        assert!(xml.starts_with("This is the xml source of that screen"));
        let list = elements_message(&extraction(ElementOrigin::ActionableElements)).text();
        assert!(list.starts_with("These are the actionable elements of that screen"));
        assert!(list.contains("\"1\""));
    }

    #[test]
    fn config_is_pretty_printed() {
        let config = serde_json::json!({"email": "qa@corp.test"});
        let msg = config_message(config.as_object().unwrap());
        assert!(msg.text().contains("\"email\": \"qa@corp.test\""));
    }
}
