/// Element extraction: resolves a screen source, sniffs which platform it
/// came from, and hands it to the matching per-platform extractor.
use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::{EuporieError, EuporieResult};
use crate::perception::element_list::{self, ElementEntry};
use crate::perception::types::{ElementOrigin, Extraction, ExtractionPolicy};
use crate::perception::{android, ios};

/// One element of a hierarchy dump, flattened out of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    pub tag: String,
    pub attrs: HashMap<String, String>,
}

impl XmlNode {
    fn from_start(start: &BytesStart<'_>) -> EuporieResult<Self> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = HashMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| {
                EuporieError::Extraction(format!("bad attribute on <{tag}>: {e}"))
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attrs.insert(key, value);
        }
        Ok(Self { tag, attrs })
    }

    /// Attribute value, or `""` when absent.
    pub fn attr(&self, key: &str) -> &str {
        self.attrs.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }
}

/// Flatten a hierarchy document into its elements, in document order.
pub fn parse_nodes(markup: &str) -> EuporieResult<Vec<XmlNode>> {
    let mut reader = Reader::from_str(markup);
    let mut nodes = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => nodes.push(XmlNode::from_start(&e)?),
            Event::Eof => break,
            _ => {}
        }
    }
    if nodes.is_empty() {
        return Err(EuporieError::Extraction(
            "hierarchy document contains no elements".into(),
        ));
    }
    Ok(nodes)
}

/// A screen description after platform sniffing.
#[derive(Debug, Clone)]
pub enum ScreenDocument {
    Android(Vec<XmlNode>),
    Ios(Vec<XmlNode>),
    ElementList(Vec<ElementEntry>),
}

impl ScreenDocument {
    /// Parse hierarchy markup and decide which platform produced it.
    pub fn from_markup(markup: &str) -> EuporieResult<Self> {
        let nodes = parse_nodes(markup)?;
        if nodes.iter().any(|n| n.tag.contains(ios::TYPE_PREFIX)) {
            Ok(ScreenDocument::Ios(nodes))
        } else {
            Ok(ScreenDocument::Android(nodes))
        }
    }

    pub fn extract(&self, policy: ExtractionPolicy) -> Extraction {
        match self {
            ScreenDocument::Android(nodes) => android::extract(nodes, policy),
            ScreenDocument::Ios(nodes) => ios::extract(nodes, policy),
            ScreenDocument::ElementList(entries) => element_list::extract(entries),
        }
    }
}

/// Where the screen's elements come from.
#[derive(Debug, Clone)]
pub enum ScreenSource {
    /// Inline markup, an `http(s)://` URL, or a file path.
    Hierarchy(String),
    /// Elements the caller already extracted from its own accessibility walk.
    Elements(Vec<ElementEntry>),
}

impl ScreenSource {
    pub fn origin(&self) -> ElementOrigin {
        match self {
            ScreenSource::Hierarchy(_) => ElementOrigin::Hierarchy,
            ScreenSource::Elements(_) => ElementOrigin::ActionableElements,
        }
    }
}

/// Parse markup that is already in memory.
pub fn extract_markup(markup: &str, policy: ExtractionPolicy) -> EuporieResult<Extraction> {
    Ok(ScreenDocument::from_markup(markup)?.extract(policy))
}

pub struct ElementExtractor {
    client: reqwest::Client,
    policy: ExtractionPolicy,
}

impl ElementExtractor {
    pub fn new(client: reqwest::Client, policy: ExtractionPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn extract(&self, source: &ScreenSource) -> EuporieResult<Extraction> {
        let document = match source {
            ScreenSource::Hierarchy(input) => {
                let markup = self.load_markup(input).await?;
                ScreenDocument::from_markup(&markup)?
            }
            ScreenSource::Elements(entries) => ScreenDocument::ElementList(entries.clone()),
        };
        let extraction = document.extract(self.policy);
        tracing::debug!(
            count = extraction.elements.len(),
            origin = ?extraction.origin,
            frame = ?extraction.frame,
            "elements extracted"
        );
        Ok(extraction)
    }

    /// Like [`extract`](Self::extract), but a failure is logged and reported
    /// as an empty extraction.
    pub async fn extract_or_empty(&self, source: &ScreenSource) -> Extraction {
        match self.extract(source).await {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::warn!(error = %e, "element extraction failed; continuing without elements");
                Extraction::empty(source.origin())
            }
        }
    }

    /// URL first, then an existing file, else the input is the markup itself.
    async fn load_markup(&self, input: &str) -> EuporieResult<String> {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            tracing::debug!(url = %trimmed, "fetching hierarchy");
            let response = self.client.get(trimmed).send().await?.error_for_status()?;
            return Ok(response.text().await?);
        }
        if !trimmed.starts_with('<') && Path::new(trimmed).is_file() {
            tracing::debug!(path = %trimmed, "reading hierarchy file");
            return Ok(tokio::fs::read_to_string(trimmed).await?);
        }
        Ok(input.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANDROID: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<hierarchy rotation="0" width="1080" height="1920">
  <android.widget.FrameLayout bounds="[0,0][1080,1920]" clickable="false">
    <android.widget.EditText text="" resource-id="com.app:id/email" clickable="true" enabled="true" bounds="[10,20][110,70]"/>
  </android.widget.FrameLayout>
</hierarchy>"#;

    const IOS: &str = r#"<AppiumAUT>
  <XCUIElementTypeApplication name="Demo" x="0" y="0" width="390" height="844">
    <XCUIElementTypeTextField name="email" x="20" y="100" width="350" height="44" enabled="true" visible="true"/>
  </XCUIElementTypeApplication>
</AppiumAUT>"#;

    #[test]
    fn parse_nodes_keeps_document_order() {
        let nodes = parse_nodes(ANDROID).unwrap();
        let tags: Vec<&str> = nodes.iter().map(|n| n.tag.as_str()).collect();
        assert_eq!(
            tags,
            ["hierarchy", "android.widget.FrameLayout", "android.widget.EditText"]
        );
        assert_eq!(nodes[2].attr("resource-id"), "com.app:id/email");
        assert_eq!(nodes[2].attr("missing"), "");
    }

    #[test]
    fn parse_nodes_unescapes_attributes() {
        let nodes = parse_nodes(r#"<a text="Terms &amp; Conditions"/>"#).unwrap();
        assert_eq!(nodes[0].attr("text"), "Terms & Conditions");
    }

    #[test]
    fn mismatched_markup_is_an_error() {
        assert!(parse_nodes("<a><b></a>").is_err());
        assert!(parse_nodes("definitely not xml").is_err());
    }

    #[test]
    fn platform_is_sniffed_from_tags() {
        assert!(matches!(
            ScreenDocument::from_markup(ANDROID).unwrap(),
            ScreenDocument::Android(_)
        ));
        assert!(matches!(
            ScreenDocument::from_markup(IOS).unwrap(),
            ScreenDocument::Ios(_)
        ));
    }

    #[tokio::test]
    async fn inline_and_file_sources_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.xml");
        std::fs::write(&path, ANDROID).unwrap();

        let extractor = ElementExtractor::new(reqwest::Client::new(), ExtractionPolicy::default());
        let inline = extractor
            .extract(&ScreenSource::Hierarchy(ANDROID.to_string()))
            .await
            .unwrap();
        let from_file = extractor
            .extract(&ScreenSource::Hierarchy(path.display().to_string()))
            .await
            .unwrap();
        assert_eq!(inline, from_file);
        assert_eq!(inline.elements.len(), 1);
    }

    #[tokio::test]
    async fn failures_degrade_to_empty() {
        let extractor = ElementExtractor::new(reqwest::Client::new(), ExtractionPolicy::default());
        let extraction = extractor
            .extract_or_empty(&ScreenSource::Hierarchy("<a><b></a>".into()))
            .await;
        assert!(extraction.is_empty());
        assert_eq!(extraction.origin, ElementOrigin::Hierarchy);
    }
}
