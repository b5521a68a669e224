//! Turning the decision model's reply into a validated [`Decision`].
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{EuporieError, EuporieResult};
use crate::generation::fields::FieldPlanEntry;

/// The model's verdict for one screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub data_generation_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldPlanEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Successful reply to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub status: String,
    pub request_id: String,
    pub agent_response: Decision,
}

impl InvokeResponse {
    pub fn success(request_id: String, agent_response: Decision) -> Self {
        Self {
            status: "success".to_string(),
            request_id,
            agent_response,
        }
    }
}

/// Failed reply to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub status: String,
    pub request_id: Option<String>,
    /// `client` when the request itself was at fault, else `server`.
    pub kind: String,
    pub detail: String,
}

impl ErrorReply {
    pub fn from_error(err: &EuporieError, request_id: Option<String>) -> Self {
        Self {
            status: "error".to_string(),
            request_id,
            kind: if err.is_client_error() { "client" } else { "server" }.to_string(),
            detail: err.to_string(),
        }
    }
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
    })
}

/// Contents of the first fenced block, or the trimmed text when unfenced.
pub fn strip_code_fences(raw: &str) -> &str {
    match fence_regex().captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw.trim(),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Rewrite Python-style `True` / `False` / `None` outside string literals
/// as JSON `true` / `false` / `null`.
pub fn normalize_booleans(raw: &str) -> String {
    const LITERALS: [(&str, &str); 3] = [("True", "true"), ("False", "false"), ("None", "null")];

    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut prev_word = false;
    let mut i = 0;

    while i < raw.len() {
        let rest = &raw[i..];
        let Some(c) = rest.chars().next() else { break };

        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            i += c.len_utf8();
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if !prev_word {
            let literal = LITERALS
                .iter()
                .find(|(lit, _)| rest.starts_with(lit) && !rest[lit.len()..].starts_with(is_word_char));
            if let Some((lit, json)) = literal {
                out.push_str(json);
                i += lit.len();
                prev_word = true;
                continue;
            }
        }

        prev_word = is_word_char(c);
        out.push(c);
        i += c.len_utf8();
    }
    out
}

fn required_flag(value: &serde_json::Value) -> EuporieResult<bool> {
    match value {
        serde_json::Value::Bool(b) => Ok(*b),
        serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => Ok(true),
            "no" | "false" => Ok(false),
            other => Err(EuporieError::MalformedDecision(format!(
                "'data_generation_required' must be a boolean, got \"{other}\""
            ))),
        },
        other => Err(EuporieError::MalformedDecision(format!(
            "'data_generation_required' must be a boolean, got {other}"
        ))),
    }
}

/// Clean, parse and validate a raw model reply.
///
/// Fields are returned unresolved; filling values is the resolver's job.
pub fn parse_decision(raw: &str) -> EuporieResult<Decision> {
    let cleaned = normalize_booleans(strip_code_fences(raw));
    let value: serde_json::Value = serde_json::from_str(&cleaned).map_err(|e| {
        EuporieError::MalformedDecision(format!("reply is not JSON ({e}). Content: {raw}"))
    })?;
    let object = value
        .as_object()
        .ok_or_else(|| EuporieError::MalformedDecision("reply is not a JSON object".into()))?;

    let flag = object.get("data_generation_required").ok_or_else(|| {
        EuporieError::MalformedDecision("missing 'data_generation_required' field".into())
    })?;
    let required = required_flag(flag)?;

    if !required {
        let reason = object
            .get("reason")
            .and_then(|r| r.as_str())
            .unwrap_or_default()
            .to_string();
        return Ok(Decision {
            data_generation_required: false,
            fields: None,
            reason: Some(reason),
        });
    }

    let fields = object
        .get("fields")
        .filter(|f| f.is_array())
        .ok_or_else(|| {
            EuporieError::MalformedDecision("'fields' array missing for data generation".into())
        })?;
    let fields: Vec<FieldPlanEntry> = serde_json::from_value(fields.clone())
        .map_err(|e| EuporieError::MalformedDecision(format!("invalid field entry: {e}")))?;

    Ok(Decision {
        data_generation_required: true,
        fields: Some(fields),
        reason: None,
    })
}
