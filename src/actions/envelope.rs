use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;

use super::DispatchError;

pub const MESSAGE_VERSION: &str = "1.0";

fn default_message_version() -> String {
    MESSAGE_VERSION.to_string()
}

fn default_http_method() -> String {
    "GET".to_string()
}

/// Inbound action invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[serde(default = "default_message_version")]
    pub message_version: String,
    #[serde(default)]
    pub action_group: String,
    pub api_path: String,
    #[serde(default = "default_http_method")]
    pub http_method: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub value: String,
}

impl ActionRequest {
    pub fn new(api_path: &str, parameters: &[(&str, &str)]) -> Self {
        Self {
            message_version: default_message_version(),
            action_group: String::new(),
            api_path: api_path.to_string(),
            http_method: default_http_method(),
            parameters: parameters
                .iter()
                .map(|(name, value)| Parameter {
                    name: name.to_string(),
                    kind: Some("string".to_string()),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    /// Parameters keyed by name; unnamed entries are dropped and later duplicates win
    pub fn parameter_map(&self) -> HashMap<String, String> {
        self.parameters
            .iter()
            .filter(|p| !p.name.is_empty())
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub message_version: String,
    pub response: ResponseDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetails {
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
    pub http_status_code: u16,
    pub response_body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(rename = "application/json")]
    pub application_json: JsonBody,
}

/// The body is carried as an encoded JSON string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonBody {
    pub body: String,
}

/// Request fields echoed back in every response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EchoFields {
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
}

impl From<&ActionRequest> for EchoFields {
    fn from(request: &ActionRequest) -> Self {
        Self {
            action_group: request.action_group.clone(),
            api_path: request.api_path.clone(),
            http_method: request.http_method.clone(),
        }
    }
}

impl EchoFields {
    /// Best-effort extraction from an event that failed to parse
    pub fn from_raw(event: &Value) -> Self {
        let text = |key: &str| {
            event
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let http_method = text("httpMethod");
        Self {
            action_group: text("actionGroup"),
            api_path: text("apiPath"),
            http_method: if http_method.is_empty() {
                default_http_method()
            } else {
                http_method
            },
        }
    }
}

impl ActionResponse {
    pub fn new(echo: EchoFields, status_code: u16, body: &Value) -> Self {
        Self {
            message_version: MESSAGE_VERSION.to_string(),
            response: ResponseDetails {
                action_group: echo.action_group,
                api_path: echo.api_path,
                http_method: echo.http_method,
                http_status_code: status_code,
                response_body: ResponseBody {
                    application_json: JsonBody {
                        body: body.to_string(),
                    },
                },
            },
        }
    }

    pub fn from_error(echo: EchoFields, error: &DispatchError) -> Self {
        let message = match error {
            DispatchError::InvalidRequest(_) => error.to_string(),
            _ => format!("Internal error: {}", error),
        };
        let body = json!({
            "success": false,
            "error": message,
            "error_type": error.kind(),
        });
        Self::new(echo, error.status_code(), &body)
    }

    pub fn status_code(&self) -> u16 {
        self.response.http_status_code
    }

    /// Decode the embedded body string
    pub fn body(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.response.response_body.application_json.body)
    }
}
