//! Pulls the `/predict` operation out of an OpenAPI document so it can be
//! handed to the code generator as the API schema.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;

pub const PREDICT_PATH: &str = "/predict";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictEndpoint {
    pub path: String,
    pub method: String,
    #[serde(rename = "operationId")]
    pub operation_id: Option<String>,
    /// Trimmed operation description, empty when absent
    pub summary: String,
    pub tags: Vec<String>,
    /// `{}` when the operation declares no body
    #[serde(rename = "requestBody")]
    pub request_body: Value,
    /// Status codes in key order of the parsed document
    pub responses: Vec<String>,
}

/// Find `paths["/predict"]` and describe its operation.
///
/// A `post` entry wins; otherwise the last method in key order is used.
pub fn extract_predict_endpoint(doc: &Value) -> Option<PredictEndpoint> {
    let methods = doc.get("paths")?.get(PREDICT_PATH)?.as_object()?;

    let (method, operation) = methods
        .get("post")
        .map(|op| ("post", op))
        .or_else(|| methods.iter().next_back().map(|(m, op)| (m.as_str(), op)))?;

    let tags = operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let responses = operation
        .get("responses")
        .and_then(Value::as_object)
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default();

    Some(PredictEndpoint {
        path: PREDICT_PATH.to_string(),
        method: method.to_uppercase(),
        operation_id: operation
            .get("operationId")
            .and_then(Value::as_str)
            .map(String::from),
        summary: operation
            .get("description")
            .and_then(Value::as_str)
            .map(|d| d.trim().to_string())
            .unwrap_or_default(),
        tags,
        request_body: operation
            .get("requestBody")
            .cloned()
            .unwrap_or_else(|| json!({})),
        responses,
    })
}

/// Read an OpenAPI JSON file and render the schema text used in prompts.
pub fn load_api_schema(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read OpenAPI document: {}", path.display()))?;
    let doc: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let endpoint = extract_predict_endpoint(&doc).with_context(|| {
        format!(
            "No {} operation found in {}",
            PREDICT_PATH,
            path.display()
        )
    })?;

    Ok(serde_json::to_string_pretty(
        &json!({ "predict_endpoint": endpoint }),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Value {
        json!({
            "openapi": "3.0.2",
            "paths": {
                "/health": { "get": { "operationId": "health" } },
                "/predict": {
                    "post": {
                        "tags": ["inference"],
                        "operationId": "predict_predict_post",
                        "description": "  Run the model on uploaded files.\n",
                        "requestBody": {
                            "content": {
                                "multipart/form-data": {
                                    "schema": { "$ref": "#/components/schemas/Body_predict" }
                                }
                            },
                            "required": true
                        },
                        "responses": {
                            "200": { "description": "Successful Response" },
                            "422": { "description": "Validation Error" }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn extracts_post_operation() {
        let endpoint = extract_predict_endpoint(&sample_doc()).unwrap();

        assert_eq!(endpoint.path, "/predict");
        assert_eq!(endpoint.method, "POST");
        assert_eq!(endpoint.operation_id.as_deref(), Some("predict_predict_post"));
        assert_eq!(endpoint.summary, "Run the model on uploaded files.");
        assert_eq!(endpoint.tags, vec!["inference"]);
        assert_eq!(endpoint.responses, vec!["200", "422"]);
        assert_eq!(endpoint.request_body["required"], true);
    }

    #[test]
    fn falls_back_to_last_method() {
        let doc = json!({"paths": {"/predict": {
            "get": {"responses": {"200": {}}},
            "put": {"responses": {"201": {}}}
        }}});
        let endpoint = extract_predict_endpoint(&doc).unwrap();

        assert_eq!(endpoint.method, "PUT");
        assert!(endpoint.operation_id.is_none());
        assert!(endpoint.tags.is_empty());
        assert_eq!(endpoint.responses, vec!["201"]);
    }

    #[test]
    fn missing_fields_get_empty_defaults() {
        let doc = json!({"paths": {"/predict": {"post": {}}}});
        let value = serde_json::to_value(extract_predict_endpoint(&doc).unwrap()).unwrap();

        assert_eq!(value["summary"], "");
        assert_eq!(value["requestBody"], json!({}));
        assert_eq!(value["responses"], json!([]));
        assert!(value["operationId"].is_null());
    }

    #[test]
    fn missing_predict_path() {
        assert!(extract_predict_endpoint(&json!({"paths": {"/other": {}}})).is_none());
        assert!(extract_predict_endpoint(&json!({})).is_none());
        assert!(extract_predict_endpoint(&json!({"paths": {"/predict": {}}})).is_none());
    }

    #[test]
    fn schema_uses_original_field_names() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("openapi.json");
        std::fs::write(&path, sample_doc().to_string()).unwrap();

        let schema = load_api_schema(&path).unwrap();
        let parsed: Value = serde_json::from_str(&schema).unwrap();

        let endpoint = &parsed["predict_endpoint"];
        assert_eq!(endpoint["operationId"], "predict_predict_post");
        assert!(endpoint["requestBody"]["content"].is_object());
    }

    #[test]
    fn unreadable_documents_are_errors() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_api_schema(&tmp.path().join("missing.json")).is_err());

        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_api_schema(&path).is_err());

        std::fs::write(&path, r#"{"paths": {}}"#).unwrap();
        let err = load_api_schema(&path).unwrap_err();
        assert!(err.to_string().contains("/predict"));
    }
}
