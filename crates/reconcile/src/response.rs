//! Compiler response model.
//!
//! The compiler answers with one record per theme:
//!
//! ```json
//! {
//!   "themeName": "olivero",
//!   "template": "{\"twig\":\"<div>...</div>\",\"metadata\":{\"filename\":\"...\"}}",
//!   "error": null
//! }
//! ```
//!
//! `template` is usually a JSON document encoded as a string, but an inline
//! object is accepted too. A compile error may be reported on the record or
//! inside the template document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ReconcileError;

/// Compiled template text plus the metadata describing where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompiledTemplate {
    pub twig: String,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// One per-theme entry of a compiler response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledResponse {
    pub theme_name: String,
    pub template: CompiledTemplate,
    #[serde(default)]
    pub error: Option<String>,
}

impl CompiledResponse {
    pub fn new(theme_name: impl Into<String>, twig: impl Into<String>) -> Self {
        Self {
            theme_name: theme_name.into(),
            template: CompiledTemplate {
                twig: twig.into(),
                metadata: None,
            },
            error: None,
        }
    }

    pub fn failed(theme_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            theme_name: theme_name.into(),
            template: CompiledTemplate::default(),
            error: Some(error.into()),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.template.metadata = Some(metadata);
        self
    }

    /// The error text, when the compiler reported a non-empty one.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|msg| !msg.trim().is_empty())
    }

    /// Decodes one wire record. Records without `themeName` or `template`
    /// are not template results and yield `Ok(None)`.
    pub fn from_wire(record: &Value) -> Result<Option<Self>, ReconcileError> {
        let Some(record) = record.as_object() else {
            return Err(ReconcileError::Decode(format!(
                "expected response record object, got {}",
                kind_of(record)
            )));
        };

        let (Some(theme), Some(raw_template)) = (record.get("themeName"), record.get("template"))
        else {
            return Ok(None);
        };
        let Some(theme_name) = theme.as_str() else {
            return Err(ReconcileError::Decode(format!(
                "themeName must be a string, got {}",
                kind_of(theme)
            )));
        };

        let decoded;
        let template = match raw_template {
            Value::String(encoded) => {
                decoded = serde_json::from_str::<Value>(encoded).map_err(|err| {
                    ReconcileError::Decode(format!("template for theme {theme_name}: {err}"))
                })?;
                &decoded
            }
            other => other,
        };
        let Some(template) = template.as_object() else {
            return Err(ReconcileError::Decode(format!(
                "template for theme {theme_name} must be an object, got {}",
                kind_of(template)
            )));
        };

        let error = record
            .get("error")
            .and_then(Value::as_str)
            .filter(|msg| !msg.trim().is_empty())
            .or_else(|| template.get("error").and_then(Value::as_str))
            .map(str::to_string);

        let twig = match template.get("twig") {
            Some(Value::String(twig)) => twig.clone(),
            None | Some(Value::Null) if error.is_some() => String::new(),
            None | Some(Value::Null) => {
                return Err(ReconcileError::Decode(format!(
                    "template for theme {theme_name} has no twig"
                )))
            }
            Some(other) => {
                return Err(ReconcileError::Decode(format!(
                    "twig for theme {theme_name} must be a string, got {}",
                    kind_of(other)
                )))
            }
        };

        let metadata = template.get("metadata").and_then(Value::as_object).cloned();

        Ok(Some(Self {
            theme_name: theme_name.to_string(),
            template: CompiledTemplate { twig, metadata },
            error,
        }))
    }
}

/// Decodes a whole compiler payload: either an array of records or an object
/// carrying them under `data`.
pub fn decode_responses(payload: &Value) -> Result<Vec<CompiledResponse>, ReconcileError> {
    let records = match payload {
        Value::Array(records) => records,
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(ReconcileError::Decode(
                    "response object has no data array".into(),
                ))
            }
        },
        other => {
            return Err(ReconcileError::Decode(format!(
                "expected response array, got {}",
                kind_of(other)
            )))
        }
    };

    let mut responses = Vec::with_capacity(records.len());
    for record in records {
        if let Some(response) = CompiledResponse::from_wire(record)? {
            responses.push(response);
        }
    }
    Ok(responses)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
