//! Owning-concept resolution for arbitrary component ids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifier::{partition_of, Partition};
use crate::{ConceptId, GraphError, GraphStore};

/// A component together with what is needed to find its owning concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentRef {
    Concept(ConceptId),
    Description { id: u64, concept_id: ConceptId },
    Relationship { id: u64, source_id: ConceptId },
    RefsetMember { id: Uuid, referenced: Box<ComponentRef> },
}

impl ComponentRef {
    pub fn owning_concept(&self) -> ConceptId {
        match self {
            ComponentRef::Concept(id) => *id,
            ComponentRef::Description { concept_id, .. } => *concept_id,
            ComponentRef::Relationship { source_id, .. } => *source_id,
            ComponentRef::RefsetMember { referenced, .. } => referenced.owning_concept(),
        }
    }
}

impl GraphStore {
    /// Resolve a numeric id or member UUID to a component reference.
    pub fn component_ref(&self, id: &str) -> Result<ComponentRef, GraphError> {
        let id = id.trim();
        if let Ok(uuid) = Uuid::parse_str(id) {
            let referenced = self.member_referenced_component(uuid).ok_or(GraphError::NotFound {
                kind: "refset member",
                id: id.to_string(),
            })?;
            return Ok(ComponentRef::RefsetMember {
                id: uuid,
                referenced: Box::new(self.component_ref(&referenced.to_string())?),
            });
        }

        let numeric: u64 = id.parse().map_err(|_| GraphError::MalformedIdentifier {
            id: id.to_string(),
            reason: "neither a component id nor a member UUID".to_string(),
        })?;
        match partition_of(numeric) {
            Some(Partition::Description) => self
                .description_owner(numeric)
                .map(|concept_id| ComponentRef::Description {
                    id: numeric,
                    concept_id,
                })
                .ok_or(GraphError::NotFound {
                    kind: "description",
                    id: id.to_string(),
                }),
            Some(Partition::Relationship) => self
                .relationship_owner(numeric)
                .map(|source_id| ComponentRef::Relationship {
                    id: numeric,
                    source_id,
                })
                .ok_or(GraphError::NotFound {
                    kind: "relationship",
                    id: id.to_string(),
                }),
            _ => self.get_checked(numeric).map(|c| ComponentRef::Concept(c.id)),
        }
    }

    /// Owning concept of any component id.
    pub fn owning_concept(&self, id: &str) -> Result<ConceptId, GraphError> {
        self.component_ref(id).map(|r| r.owning_concept())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_owner_resolves_through_referenced_component() {
        let description = ComponentRef::Description {
            id: 101013,
            concept_id: 100005,
        };
        let member = ComponentRef::RefsetMember {
            id: Uuid::nil(),
            referenced: Box::new(ComponentRef::RefsetMember {
                id: Uuid::nil(),
                referenced: Box::new(description),
            }),
        };
        assert_eq!(member.owning_concept(), 100005);
    }
}
