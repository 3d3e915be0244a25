use thiserror::Error;

/// Failures that escape an action and turn into an error envelope
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The inbound event could not be parsed into a request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Graph query failed: {0:#}")]
    Graph(anyhow::Error),

    #[error("Failed to encode response: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Action panicked: {0}")]
    Panic(String),
}

impl DispatchError {
    /// Label reported as `error_type` in the response body
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::InvalidRequest(_) => "InvalidRequest",
            DispatchError::Graph(_) => "GraphQueryError",
            DispatchError::Encoding(_) => "EncodingError",
            DispatchError::Panic(_) => "Panic",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::InvalidRequest(_) => 400,
            _ => 500,
        }
    }
}
