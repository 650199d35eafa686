//! WASM entry points for browser use.

use wasm_bindgen::prelude::*;

use crate::config::ValidatorConfig;
use crate::error::ValidatorError;
use crate::model::ValidationError;
use crate::validate::Validator;

/// Load a workflow document JSON and validate all of its expressions as one
/// batch with the default configuration.
#[wasm_bindgen]
pub fn validate_document(json: &str) -> JsValue {
    let result = validate_document_inner(json, ValidatorConfig::default());
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

/// Same as `validate_document`, with a `ValidatorConfig` JSON.
#[wasm_bindgen]
pub fn validate_document_with_config(json: &str, config_json: &str) -> JsValue {
    let result = match ValidatorConfig::from_json(config_json) {
        Ok(config) => validate_document_inner(json, config),
        Err(e) => ValidateResult::Errors {
            errors: vec![ErrorDto::from(e)],
        },
    };
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn validate_document_inner(json: &str, config: ValidatorConfig) -> ValidateResult {
    // 1. Load the document against the validator's core module
    let validator = Validator::flow().with_config(config);
    let workflow = match crate::parse::load(json, validator.language().core_module()) {
        Ok(w) => w,
        Err(errors) => {
            return ValidateResult::Errors {
                errors: errors.into_iter().map(ErrorDto::from).collect(),
            };
        }
    };

    // 2. Validate the whole document as one batch
    let validator = validator.with_loader(workflow.loader());
    let mut scope = workflow.scope();
    let expressions = scope.len();
    match validator.validate(workflow.root(), Some(&mut scope)) {
        Ok(errors) => ValidateResult::Ok {
            expressions,
            errors: errors.into_iter().map(ExpressionErrorDto::from).collect(),
        },
        Err(e) => ValidateResult::Errors {
            errors: vec![ErrorDto::from(e)],
        },
    }
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: String,
    phase: String,
    message: String,
    node_id: Option<String>,
}

impl From<ValidatorError> for ErrorDto {
    fn from(e: ValidatorError) -> Self {
        let (code, phase) = match e.code() {
            Some(code) => (code, "Document"),
            None => ("V001", "Validate"),
        };
        ErrorDto {
            code: code.to_string(),
            phase: phase.to_string(),
            node_id: e.node_id().map(str::to_string),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpressionErrorDto {
    message: String,
    is_warning: bool,
    activity_id: Option<String>,
    expression_id: Option<String>,
}

impl From<ValidationError> for ExpressionErrorDto {
    fn from(e: ValidationError) -> Self {
        ExpressionErrorDto {
            activity_id: e.activity_id().map(str::to_string),
            message: e.message,
            is_warning: e.is_warning,
            expression_id: e.expression_id,
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
enum ValidateResult {
    /// Validation ran; `errors` are expression problems, possibly none.
    Ok {
        expressions: usize,
        errors: Vec<ExpressionErrorDto>,
    },
    /// The document could not be validated at all.
    Errors { errors: Vec<ErrorDto> },
}
