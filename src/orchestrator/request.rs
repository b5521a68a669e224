use serde::{Deserialize, Serialize};

use crate::perception::element_list::ElementEntry;
use crate::perception::extractor::ScreenSource;

/// One screen to evaluate, as the caller sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokeRequest {
    /// Inline screenshot, base64 (optionally as a `data:` URL).
    pub image: Option<String>,
    /// Screenshot location: `http(s)://` URL or file path.
    pub image_url: Option<String>,
    /// Hierarchy markup, URL, or file path.
    pub xml: Option<String>,
    pub xml_url: Option<String>,
    pub actionable_elements: Option<Vec<ElementEntry>>,
    pub config_data: Option<serde_json::Map<String, serde_json::Value>>,
    pub request_id: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl InvokeRequest {
    /// Element sources in precedence order: element list, inline XML, XML URL.
    pub fn element_sources(&self) -> Vec<ScreenSource> {
        let mut sources = Vec::new();
        if let Some(list) = self.actionable_elements.as_ref().filter(|l| !l.is_empty()) {
            sources.push(ScreenSource::Elements(list.clone()));
        }
        if let Some(xml) = non_blank(&self.xml) {
            sources.push(ScreenSource::Hierarchy(xml.to_string()));
        }
        if let Some(url) = non_blank(&self.xml_url) {
            sources.push(ScreenSource::Hierarchy(url.to_string()));
        }
        sources
    }

    pub fn inline_image(&self) -> Option<&str> {
        non_blank(&self.image)
    }

    pub fn image_location(&self) -> Option<&str> {
        non_blank(&self.image_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_sources_follow_precedence() {
        let request: InvokeRequest = serde_json::from_value(serde_json::json!({
            "xml": "<hierarchy/>",
            "xml_url": "https://example.test/screen.xml",
            "actionable_elements": [{"className": "android.widget.EditText"}]
        }))
        .unwrap();
        let sources = request.element_sources();
        assert_eq!(sources.len(), 3);
        assert!(matches!(sources[0], ScreenSource::Elements(_)));
        assert!(matches!(&sources[1], ScreenSource::Hierarchy(x) if x == "<hierarchy/>"));
        assert!(matches!(&sources[2], ScreenSource::Hierarchy(x) if x.starts_with("https://")));
    }

    #[test]
    fn blank_inputs_are_absent() {
        let request = InvokeRequest {
            image: Some("  ".into()),
            xml: Some(String::new()),
            actionable_elements: Some(Vec::new()),
            ..Default::default()
        };
        assert!(request.element_sources().is_empty());
        assert!(request.inline_image().is_none());
    }
}
