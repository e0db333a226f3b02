use thiserror::Error;

use crate::ConceptId;

/// Failure converting between an OWL axiom and relationships.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("axiom conversion failed for concept {concept}: {reason}")]
pub struct ConversionError {
    pub concept: ConceptId,
    pub expression: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("malformed identifier `{id}`: {reason}")]
    MalformedIdentifier { id: String, reason: String },

    #[error("invalid concrete value `{value}`: {reason}")]
    InvalidConcreteValue { value: String, reason: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("cannot query descendants of inactive concept {0}")]
    InactiveConceptQuery(ConceptId),

    #[error("hierarchy depth limit {limit} exceeded at concept {concept} (cycle or malformed graph)")]
    DepthExceeded { concept: ConceptId, limit: usize },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("duplicate {kind}: {kept} and {duplicate}")]
    DuplicateComponent {
        kind: &'static str,
        kept: String,
        duplicate: String,
    },
}

impl GraphError {
    pub fn concept_not_found(id: ConceptId) -> Self {
        GraphError::NotFound {
            kind: "concept",
            id: id.to_string(),
        }
    }
}
