use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;

use crate::config::{AnnotationConfig, AppConfig};
use crate::errors::{EuporieError, EuporieResult};
use crate::generation::generators::GeneratorRegistry;
use crate::generation::resolver::FieldResolver;
use crate::llm::provider::LlmProvider;
use crate::llm::registry::ProviderRegistry;
use crate::llm::types::{CallConfig, ChatMessage};
use crate::orchestrator::prompts;
use crate::orchestrator::request::InvokeRequest;
use crate::orchestrator::response::{parse_decision, Decision, InvokeResponse};
use crate::perception::annotator::{decode_base64_image, mime_type, ImageAnnotator, Scaling};
use crate::perception::extractor::ElementExtractor;
use crate::perception::types::{ElementMap, Extraction};

/// A decoded screenshot.
struct ScreenImage {
    bytes: Vec<u8>,
    mime: &'static str,
}

impl ScreenImage {
    fn new(bytes: Vec<u8>) -> Self {
        let mime = mime_type(&bytes);
        Self { bytes, mime }
    }

    fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Runs one screen through extraction, annotation, the decision model and
/// field resolution.
pub struct Orchestrator {
    client: reqwest::Client,
    extractor: ElementExtractor,
    annotator: ImageAnnotator,
    resolver: FieldResolver,
    provider: Arc<dyn LlmProvider>,
    call: CallConfig,
    annotation: AnnotationConfig,
}

impl Orchestrator {
    /// Build from config, using the active provider from `[llm]`.
    pub fn from_config(config: &AppConfig) -> EuporieResult<Self> {
        let client = reqwest::Client::new();
        let registry = ProviderRegistry::from_config(&config.llm, &client);
        let (provider, call) = registry.active_call()?;
        Ok(Self::build(config, client, provider, call))
    }

    /// Build with an explicit decision provider.
    pub fn with_provider(config: &AppConfig, provider: Arc<dyn LlmProvider>, call: CallConfig) -> Self {
        Self::build(config, reqwest::Client::new(), provider, call)
    }

    fn build(
        config: &AppConfig,
        client: reqwest::Client,
        provider: Arc<dyn LlmProvider>,
        call: CallConfig,
    ) -> Self {
        let generators = GeneratorRegistry::from_config(&config.generators);
        if generators.is_empty() {
            tracing::warn!("no usable generators; every faker field will get the placeholder");
        }
        let debug_store = config.annotation.debug_store();
        if let Some(store) = &debug_store {
            tracing::debug!(dir = %store.dir().display(), "annotated screenshots will be saved");
        }
        tracing::debug!(
            provider = provider.name(),
            generators = generators.len(),
            policy = ?config.extraction.policy,
            "orchestrator ready"
        );
        Self {
            extractor: ElementExtractor::new(client.clone(), config.extraction.policy),
            annotator: ImageAnnotator::new(debug_store),
            resolver: FieldResolver::new(generators),
            client,
            provider,
            call,
            annotation: config.annotation.clone(),
        }
    }

    pub async fn invoke(&self, request: InvokeRequest) -> EuporieResult<InvokeResponse> {
        let request_id = request
            .request_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::info!(request_id = %request_id, "request received");

        let image = self.load_image(&request).await?;
        let extraction = self.extract_elements(&request).await;

        if image.is_none() && extraction.is_none() {
            return Err(EuporieError::InvalidRequest(
                "no usable image or elements in request".into(),
            ));
        }

        let mut messages = vec![ChatMessage::system(prompts::system_prompt(
            &self.resolver.generators().names(),
        ))];
        if let Some(config) = &request.config_data {
            messages.push(prompts::config_message(config));
        }
        messages.extend(self.screen_messages(image.as_ref(), extraction.as_ref()));

        let reply = self.provider.chat(messages, &self.call).await?;
        let decision = parse_decision(&reply.content)?;
        let decision = self.resolve(decision, extraction.as_ref(), request.config_data.as_ref());

        tracing::info!(
            request_id = %request_id,
            required = decision.data_generation_required,
            fields = decision.fields.as_ref().map_or(0, Vec::len),
            "request complete"
        );
        Ok(InvokeResponse::success(request_id, decision))
    }

    /// Inline base64 first (must decode), then `image_url` (failure means no image).
    async fn load_image(&self, request: &InvokeRequest) -> EuporieResult<Option<ScreenImage>> {
        if let Some(inline) = request.inline_image() {
            let bytes = decode_base64_image(inline).map_err(|e| {
                EuporieError::InvalidRequest(format!("image is not valid base64: {e}"))
            })?;
            if bytes.is_empty() {
                return Err(EuporieError::InvalidRequest("image is empty".into()));
            }
            return Ok(Some(ScreenImage::new(bytes)));
        }

        let Some(location) = request.image_location() else {
            return Ok(None);
        };
        match self.fetch_image(location).await {
            Ok(bytes) if !bytes.is_empty() => Ok(Some(ScreenImage::new(bytes))),
            Ok(_) => {
                tracing::warn!(location = %location, "image location returned no data");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "could not load image");
                Ok(None)
            }
        }
    }

    async fn fetch_image(&self, location: &str) -> EuporieResult<Vec<u8>> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let response = self.client.get(location).send().await?.error_for_status()?;
            return Ok(response.bytes().await?.to_vec());
        }
        Ok(tokio::fs::read(Path::new(location)).await?)
    }

    /// First source in precedence order that yields elements.
    async fn extract_elements(&self, request: &InvokeRequest) -> Option<Extraction> {
        for source in request.element_sources() {
            let extraction = self.extractor.extract_or_empty(&source).await;
            if !extraction.is_empty() {
                return Some(extraction);
            }
            tracing::debug!(origin = ?source.origin(), "element source yielded nothing");
        }
        None
    }

    fn screen_messages(
        &self,
        image: Option<&ScreenImage>,
        extraction: Option<&Extraction>,
    ) -> Vec<ChatMessage> {
        match (image, extraction) {
            (Some(image), Some(extraction)) => {
                let screenshot = self.annotated_screenshot(image, extraction);
                vec![screenshot, prompts::elements_message(extraction)]
            }
            (Some(image), None) => {
                vec![prompts::screenshot_message(image.mime, &image.to_base64(), false)]
            }
            (None, Some(extraction)) => vec![prompts::elements_message(extraction)],
            (None, None) => Vec::new(),
        }
    }

    fn annotated_screenshot(&self, image: &ScreenImage, extraction: &Extraction) -> ChatMessage {
        if !self.annotation.enabled {
            return prompts::screenshot_message(image.mime, &image.to_base64(), false);
        }
        let scaling = Scaling::choose(self.annotation.rescale, extraction.frame);
        match self
            .annotator
            .annotate_bytes(&image.bytes, &extraction.elements, scaling)
        {
            Ok(jpeg_b64) => prompts::screenshot_message("image/jpeg", &jpeg_b64, true),
            Err(e) => {
                tracing::warn!(error = %e, "annotation failed; sending original screenshot");
                prompts::screenshot_message(image.mime, &image.to_base64(), false)
            }
        }
    }

    fn resolve(
        &self,
        mut decision: Decision,
        extraction: Option<&Extraction>,
        config: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Decision {
        let Some(fields) = decision.fields.take() else {
            return decision;
        };
        let none = ElementMap::new();
        let elements = extraction.map_or(&none, |e| &e.elements);
        decision.fields = Some(self.resolver.resolve_all(fields, elements, config));
        decision
    }
}
