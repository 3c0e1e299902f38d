use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Transport error on {method} {path}: {message}")]
    Transport {
        method: &'static str,
        path: String,
        message: String,
    },

    #[error("Unexpected status {status} on {method} {path}: {body}")]
    UnexpectedStatus {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Type coercion failed: {0}")]
    TypeCoercion(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Kind '{kind}' has no attribute '{attribute}'")]
    UnknownAttribute { kind: String, attribute: String },

    #[error("Class registration for '{collection}' failed: {reason}")]
    Registration { collection: String, reason: String },

    #[error("{operation} aborted after {completed} record(s): {source}")]
    BatchAborted {
        operation: &'static str,
        completed: usize,
        #[source]
        source: Box<AdapterError>,
    },

    #[error("Record of kind '{0}' has no identifier")]
    MissingIdentifier(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AdapterError {
    pub(crate) fn status(method: &'static str, path: &str, status: u16, body: &str) -> Self {
        Self::UnexpectedStatus {
            method,
            path: path.to_string(),
            status,
            body: body.to_string(),
        }
    }

    /// True for failures that came from talking to the store rather than
    /// from translating the request.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::UnexpectedStatus { .. } => true,
            Self::BatchAborted { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
