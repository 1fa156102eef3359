//! Prompt templates for requirements analysis and UI code generation.
//!
//! The wording is configuration, not logic; only the substitution points
//! matter to the rest of the crate.

use super::Framework;
use super::task::TaskKind;

/// Inference API the generated UI is wired against.
#[derive(Debug, Clone)]
pub struct ApiContext {
    pub endpoint: String,
    /// JSON description of the predict endpoint (see `openapi`)
    pub schema: String,
    pub request_sample: String,
    pub response_sample: String,
}

impl ApiContext {
    /// Context for `endpoint` using the bundled multimodal classification samples.
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            schema: DEFAULT_API_SCHEMA.trim().to_string(),
            request_sample: DEFAULT_REQUEST_SAMPLE.trim().to_string(),
            response_sample: DEFAULT_RESPONSE_SAMPLE.trim().to_string(),
        }
    }
}

/// Prefix attached to a previous run's error text before it is fed back.
pub const ERROR_FEEDBACK_PREFIX: &str = "Previous execution errors that need to be fixed:";

pub fn analysis_prompt(task: &str, kind: Option<TaskKind>) -> String {
    let kind_hint = match kind {
        Some(k) => format!(
            "\nThe task is of kind {} and takes these input types: {}.\n",
            k.name(),
            k.inputs_label()
        ),
        None => String::new(),
    };

    format!(
        r#"You are an expert at analyzing machine learning tasks and determining what web interface components are needed.

Based on the following ML task description: {task}
{kind_hint}
Please analyze and determine:
1. What input components are needed (e.g., upload button, textbox, microphone, etc.)
2. What output components are needed (e.g., label, image, audio, plot, etc.)
3. Any special processing requirements
4. What the mock model function should return for demonstration purposes

Format your response clearly with sections for Inputs, Outputs, Processing, and MockFunction."#
    )
}

pub fn codegen_prompt(
    framework: Framework,
    analysis: &str,
    api: &ApiContext,
    error_log: &str,
) -> String {
    let error_section = if error_log.trim().is_empty() {
        String::new()
    } else {
        format!("{}\n{}\n", ERROR_FEEDBACK_PREFIX, error_log.trim())
    };

    let api_section = format!(
        "API ENDPOINT: {}\nAPI SCHEMA: {}\nAPI REQUEST SAMPLE:\n{}\nAPI RESPONSE SAMPLE:\n{}",
        api.endpoint, api.schema, api.request_sample, api.response_sample
    );

    match framework {
        Framework::Gradio => format!(
            r#"You are an expert at generating Gradio code based on requirements analysis.

Previous analysis: {analysis}

{api_section}

{error_section}
Generate a complete, runnable Gradio app in a single Python file. Follow these guidelines:
1. Use the latest gradio library with the Blocks API (not Interface)
2. Use gr.Blocks() as the main container
3. Call the API endpoint above for predictions; fall back to a mock model function if it is unreachable
4. Make the UI clean and user-friendly with proper layout components
5. Handle edge cases and provide helpful error messages
6. Include necessary imports
7. The code should be executable directly
8. Use the following structure:
   with gr.Blocks() as demo:
       # Add components here
       ...
   demo.launch()

Return only the Python code without any explanations or markdown formatting."#
        ),
        Framework::Streamlit => format!(
            r#"You are an expert Streamlit developer specializing in clean, modern interfaces for machine learning APIs.

Requirements analysis: {analysis}

{api_section}

{error_section}
Generate a complete, production-ready Streamlit app in a single Python file:
- Upload inputs with st.file_uploader and validate file types; preview tabular data with st.dataframe, images with st.image, JSON with st.json.
- Use st.columns([1, 1], gap="large") when there are two inputs, with a full-width Predict button below.
- On Predict, validate inputs, call the API endpoint above with requests, and show st.spinner while waiting.
- Render results with st.dataframe and st.column_config formatting; merge inputs with the response where it helps.
- Keep files and results in st.session_state and offer a reset option.
- Wrap uploads, API calls and parsing in try/except and report with st.error / st.success.
- Use only current APIs: st.rerun, st.cache_data, st.cache_resource. Avoid st.experimental_*, st.beta_* and st.cache.

Return only the Python code without any explanations or markdown formatting."#
        ),
    }
}

/// Prompt for a single self-contained HTML page that visualizes the API's
/// inputs and outputs. The reply is written as-is, never launched.
pub fn page_prompt(api: &ApiContext, requirement: &str) -> String {
    format!(
        r#"Create a clean, modern HTML page that visualizes the input and output data of a machine learning API. Inputs (images, tabular data, text) and the matching outputs (predictions, labels, confidence scores) should be laid out in cards or rows so each output sits next to the input it belongs to.

API ENDPOINT: {endpoint}
API SCHEMA: {schema}
API REQUEST SAMPLE:
{request}
API RESPONSE SAMPLE:
{response}

The page should include:
1. A header with a title, the API endpoint and a connection status indicator.
2. An input section: drag-and-drop uploads with thumbnails for images, a sortable and filterable table for CSV data, validation feedback for file type and size, and a summary of what was loaded.
3. An output section: predictions aligned with their inputs, confidence shown as progress bars or color-coded badges, a collapsible JSON viewer and simple charts for numeric outputs.
4. Interaction: a Predict button with a loading state that calls the endpoint above, copy-to-clipboard for request and response data, and CSV/JSON export of results.
5. A responsive, accessible layout: mobile first, high contrast, keyboard navigation and ARIA attributes.
6. Clear error messages for invalid files and network failures.

Requirements:
- Return raw HTML without markdown or code fences.
- Put all CSS and JavaScript inline so the page is self-contained.
- Handle a variable number of inputs and outputs.

User requirement: {requirement}"#,
        endpoint = api.endpoint,
        schema = api.schema,
        request = api.request_sample,
        response = api.response_sample,
    )
}

const DEFAULT_API_SCHEMA: &str = r#"
{
  "predict_endpoint": {
    "path": "/predict",
    "method": "POST",
    "operationId": "MultimodalClassificationService__predict",
    "summary": "",
    "tags": ["Service APIs"],
    "requestBody": {
      "content": {
        "multipart/form-data": {
          "schema": {
            "type": "object",
            "title": "Input",
            "required": ["image_zip", "labels_csv"],
            "properties": {
              "image_zip": {
                "description": "A ZIP file containing all the images for multimodal classification task.",
                "format": "binary",
                "title": "Image Zip",
                "type": "string"
              },
              "labels_csv": {
                "description": "A csv file for multimodal classification task.",
                "format": "binary",
                "title": "Labels Csv",
                "type": "string"
              }
            }
          }
        }
      }
    },
    "responses": ["200", "400", "404", "500"]
  }
}
"#;

const DEFAULT_REQUEST_SAMPLE: &str = r#"
curl -X 'POST' \
  'http://127.0.0.1:8000/predict' \
  -H 'accept: application/json' \
  -H 'Content-Type: multipart/form-data' \
  -F 'image_zip=@super_small_image.zip;type=application/x-zip-compressed' \
  -F 'labels_csv=@super_small_data.csv;type=text/csv'
"#;

const DEFAULT_RESPONSE_SAMPLE: &str = r#"
{
    "status": "success",
    "infer_time": 0.5484125036746264,
    "predictions": [
        {"key": 0, "class": 0, "confidence": 0.94629967212677},
        {"key": 1, "class": 1, "confidence": 0.6092917323112488}
    ]
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_is_valid_json() {
        let api = ApiContext::with_endpoint("http://localhost:9000");
        let schema: serde_json::Value = serde_json::from_str(&api.schema).unwrap();
        assert_eq!(schema["predict_endpoint"]["path"], "/predict");
        assert!(api.request_sample.starts_with("curl"));
    }

    #[test]
    fn analysis_prompt_mentions_task_and_kind() {
        let prompt = analysis_prompt(
            "classify pet photos",
            Some(TaskKind::ImageClassification),
        );
        assert!(prompt.contains("classify pet photos"));
        assert!(prompt.contains("IMAGE_CLASSIFICATION"));
        assert!(prompt.contains("input types: image"));

        let bare = analysis_prompt("classify pet photos", None);
        assert!(!bare.contains("input types"));
    }

    #[test]
    fn codegen_prompt_feeds_back_errors() {
        let api = ApiContext::with_endpoint("http://localhost:9000");

        let clean = codegen_prompt(Framework::Gradio, "Inputs: image", &api, "");
        assert!(!clean.contains(ERROR_FEEDBACK_PREFIX));
        assert!(clean.contains("http://localhost:9000"));
        assert!(clean.contains("gr.Blocks()"));

        let retry = codegen_prompt(
            Framework::Gradio,
            "Inputs: image",
            &api,
            "ModuleNotFoundError: No module named 'gradio'",
        );
        assert!(retry.contains(ERROR_FEEDBACK_PREFIX));
        assert!(retry.contains("No module named 'gradio'"));
    }

    #[test]
    fn page_prompt_carries_api_context() {
        let api = ApiContext::with_endpoint("http://localhost:9000");
        let prompt = page_prompt(&api, "show one row per uploaded image");

        assert!(prompt.contains("API ENDPOINT: http://localhost:9000"));
        assert!(prompt.contains("MultimodalClassificationService__predict"));
        assert!(prompt.contains("inline"));
        assert!(prompt.ends_with("User requirement: show one row per uploaded image"));
    }

    #[test]
    fn streamlit_prompt_targets_streamlit() {
        let api = ApiContext::with_endpoint("http://localhost:9000");
        let prompt = codegen_prompt(Framework::Streamlit, "Inputs: csv", &api, "");
        assert!(prompt.contains("st.file_uploader"));
        assert!(!prompt.contains("gr.Blocks"));
    }
}
