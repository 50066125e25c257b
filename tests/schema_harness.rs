use mcp_host_harness::schema::{validate_json, CHAT_REQUEST_SCHEMA};

#[test]
fn json_schema_harness_validates_instance() {
    let schema = r#"{
      "$schema": "https://json-schema.org/draft/2020-12/schema",
      "type": "object",
      "required": ["raw"],
      "properties": {
        "raw": {
          "type": "object",
          "required": ["error"],
          "properties": {
            "error": {
              "type": "object",
              "required": ["code", "message"],
              "properties": {
                "code": { "type": "integer" },
                "message": { "type": "string", "minLength": 1 }
              }
            }
          }
        }
      }
    }"#;

    let instance = r#"{
      "raw": {
        "error": { "code": -32600, "message": "method is required" }
      }
    }"#;

    validate_json(schema, instance).expect("schema validation failed");
}

#[test]
fn chat_schema_accepts_and_rejects() {
    validate_json(CHAT_REQUEST_SCHEMA, r#"{"message": "hello"}"#).expect("valid chat body");
    assert!(validate_json(CHAT_REQUEST_SCHEMA, r#"{"message": 42}"#).is_err());
    assert!(validate_json(CHAT_REQUEST_SCHEMA, r#"{}"#).is_err());
    assert!(validate_json(CHAT_REQUEST_SCHEMA, "not json").is_err());
}
