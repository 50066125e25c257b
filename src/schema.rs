use jsonschema::validator_for;
use serde_json::Value;

/// Maximum characters of a chat message.
pub const MAX_CHAT_MESSAGE_CHARS: usize = 2000;

/// Shape of a `POST /chat` body (draft 2020-12).
pub const CHAT_REQUEST_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["message"],
  "properties": {
    "message": { "type": "string", "minLength": 1, "maxLength": 2000 }
  }
}"#;

#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    #[error("Schema parse error: {0}")]
    SchemaParse(#[from] serde_json::Error),
    #[error("Schema compile error: {0}")]
    SchemaCompile(String),
    #[error("Instance validation failed: {0}")]
    ValidationFailed(String),
}

/// Validate a JSON instance against a JSON Schema (draft 2020-12).
/// Returns Ok(()) if valid, Err otherwise.
pub fn validate_json(schema_str: &str, instance_str: &str) -> Result<(), SchemaValidationError> {
    let instance_json: Value = serde_json::from_str(instance_str)?;
    validate_value(schema_str, &instance_json)
}

/// Same as [`validate_json`] for an already-parsed instance.
pub fn validate_value(schema_str: &str, instance: &Value) -> Result<(), SchemaValidationError> {
    let schema_json: Value = serde_json::from_str(schema_str)?;

    let validator = validator_for(&schema_json)
        .map_err(|e| SchemaValidationError::SchemaCompile(e.to_string()))?;

    let first = validator.iter_errors(instance).next().map(|e| e.to_string());
    match first {
        None => Ok(()),
        Some(message) => Err(SchemaValidationError::ValidationFailed(message)),
    }
}

/// Validate a chat body and return its trimmed message.
///
/// A message that is blank after trimming is rejected.
pub fn validate_chat_request(body: &Value) -> Result<String, SchemaValidationError> {
    validate_value(CHAT_REQUEST_SCHEMA, body)?;
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim();
    if message.is_empty() {
        return Err(SchemaValidationError::ValidationFailed("message is blank".into()));
    }
    Ok(message.to_string())
}
