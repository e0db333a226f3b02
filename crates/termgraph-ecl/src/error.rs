use termgraph_store::GraphError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EclError {
    /// Paging contract broken by the remote side.
    #[error("protocol error resolving `{expression}`: {message}")]
    Protocol { expression: String, message: String },

    #[error("remote query failed for `{expression}`: {message}")]
    Remote { expression: String, message: String },

    #[error("invalid expression `{expression}`: {message}")]
    Invalid { expression: String, message: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl EclError {
    pub fn protocol(expression: &str, message: impl Into<String>) -> Self {
        EclError::Protocol {
            expression: expression.to_string(),
            message: message.into(),
        }
    }

    pub fn remote(expression: &str, message: impl Into<String>) -> Self {
        EclError::Remote {
            expression: expression.to_string(),
            message: message.into(),
        }
    }
}
