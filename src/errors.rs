use thiserror::Error;

#[derive(Debug, Error)]
pub enum EuporieError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("Generator error: {0}")]
    Generator(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("Malformed decision: {0}")]
    MalformedDecision(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl EuporieError {
    /// Errors caused by the caller's request rather than by the service or
    /// one of its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(self, EuporieError::InvalidRequest(_) | EuporieError::Base64(_))
    }
}

impl serde::Serialize for EuporieError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type EuporieResult<T> = Result<T, EuporieError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        assert!(EuporieError::InvalidRequest("no input".into()).is_client_error());
        assert!(!EuporieError::MalformedDecision("bad".into()).is_client_error());
        assert!(!EuporieError::Extraction("bad".into()).is_client_error());
    }

    #[test]
    fn serializes_as_message() {
        let err = EuporieError::MalformedDecision("missing 'fields'".into());
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!("Malformed decision: missing 'fields'")
        );
    }
}
