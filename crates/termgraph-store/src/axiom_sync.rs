//! Axiom <-> relationship synchronisation.
//!
//! A class axiom is stored twice: as its RF2 entry (the OWL string) and as
//! stated relationships on the concept, each carrying the entry's id. When
//! an entry is replaced the relationships are re-derived, group ids are
//! realigned with the concept's existing groups, and the difference is
//! applied.

use std::collections::{BTreeMap, BTreeSet};
use termgraph_owl::{
    parse_axiom, render_class_axiom, AxiomRepresentation, OwlAxiom, OwlError, OwlGroups,
    OwlRelationship, OwlTarget, PropertyAxiom,
};
use tracing::debug;
use uuid::Uuid;

use crate::model::*;
use crate::{ConceptId, ConversionError, GraphError, GraphStore};

/// One (type, target) statement inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Statement {
    pub type_id: ConceptId,
    pub target: RelationshipTarget,
}

pub type RelationshipsByGroup = BTreeMap<u32, Vec<Statement>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertedAxiom {
    Class {
        groups: RelationshipsByGroup,
        is_gci: bool,
        definition_status: DefinitionStatus,
    },
    Property(PropertyAxiom),
}

/// What reconciliation changed on the concept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub added: usize,
    pub removed: usize,
}

fn conversion_error(concept: ConceptId, expression: &str, reason: impl ToString) -> ConversionError {
    ConversionError {
        concept,
        expression: expression.to_string(),
        reason: reason.to_string(),
    }
}

/// Convert an OWL axiom string for `concept` into grouped statements.
///
/// The axiom is a GCI when `concept` is its right-hand side. An axiom whose
/// named concept is not `concept` at all is rejected.
pub fn axiom_to_relationships(concept: ConceptId, owl_expression: &str) -> Result<ConvertedAxiom, ConversionError> {
    let parsed = parse_axiom(owl_expression).map_err(|e| conversion_error(concept, owl_expression, e))?;
    let rep = match parsed {
        OwlAxiom::Class(rep) => rep,
        OwlAxiom::Property(p) => return Ok(ConvertedAxiom::Property(p)),
    };

    let is_gci = if rep.left_hand_concept == Some(concept) {
        false
    } else if rep.right_hand_concept == Some(concept) {
        true
    } else {
        return Err(conversion_error(
            concept,
            owl_expression,
            format!(
                "axiom names concept {:?}/{:?}, not the referenced component",
                rep.left_hand_concept, rep.right_hand_concept
            ),
        ));
    };

    let groups = rep
        .relationships_by_group()
        .iter()
        .map(|(g, rels)| (*g, rels.iter().cloned().map(Statement::from).collect()))
        .collect();
    let definition_status = if rep.primitive || is_gci {
        DefinitionStatus::Primitive
    } else {
        DefinitionStatus::FullyDefined
    };
    Ok(ConvertedAxiom::Class {
        groups,
        is_gci,
        definition_status,
    })
}

/// Render the active relationships of an ordinary axiom back to OWL.
pub fn relationships_to_axiom(
    concept: ConceptId,
    definition_status: DefinitionStatus,
    relationships: &[Relationship],
) -> Result<String, ConversionError> {
    let rep = AxiomRepresentation::named(
        concept,
        definition_status.is_primitive(),
        to_owl_groups(relationships),
    );
    render_class_axiom(&rep).map_err(|e| owl_failure(concept, e))
}

/// Render a stored axiom, GCI or not.
pub fn axiom_to_owl(axiom: &Axiom) -> Result<String, ConversionError> {
    if !axiom.is_gci {
        return relationships_to_axiom(axiom.concept_id, axiom.definition_status, &axiom.relationships);
    }
    let rep = AxiomRepresentation::gci(axiom.concept_id, to_owl_groups(&axiom.relationships));
    render_class_axiom(&rep).map_err(|e| owl_failure(axiom.concept_id, e))
}

fn owl_failure(concept: ConceptId, err: OwlError) -> ConversionError {
    conversion_error(concept, "", err)
}

fn to_owl_groups(relationships: &[Relationship]) -> OwlGroups {
    let mut groups = OwlGroups::new();
    for rel in relationships.iter().filter(|r| r.is_active()) {
        let target = match &rel.target {
            RelationshipTarget::Concept(id) => OwlTarget::Concept(*id),
            RelationshipTarget::Value(v) => OwlTarget::Value(v.clone().into()),
        };
        groups.entry(rel.group).or_default().push(OwlRelationship {
            type_id: rel.type_id,
            target,
        });
    }
    groups
}

impl From<OwlRelationship> for Statement {
    fn from(rel: OwlRelationship) -> Self {
        let target = match rel.target {
            OwlTarget::Concept(id) => RelationshipTarget::Concept(id),
            OwlTarget::Value(v) => RelationshipTarget::Value(v.into()),
        };
        Statement {
            type_id: rel.type_id,
            target,
        }
    }
}

/// Give derived groups stable ids.
///
/// A derived group whose statement set equals an existing group exactly
/// takes that group's id. Any other group gets the lowest id that is
/// neither `occupied` nor already handed out. Group 0 is never renumbered.
pub fn align_groups(
    existing: &BTreeMap<u32, BTreeSet<(ConceptId, RelationshipTarget)>>,
    occupied: &BTreeSet<u32>,
    derived: RelationshipsByGroup,
) -> RelationshipsByGroup {
    let mut aligned = RelationshipsByGroup::new();
    let mut pending = Vec::new();
    let mut claimed: BTreeSet<u32> = BTreeSet::new();

    for (group, statements) in derived {
        if group == 0 {
            aligned.insert(0, statements);
            continue;
        }
        let set: BTreeSet<(ConceptId, RelationshipTarget)> = statements
            .iter()
            .map(|s| (s.type_id, s.target.clone()))
            .collect();
        let reuse = existing
            .iter()
            .find(|(id, members)| **members == set && !claimed.contains(*id))
            .map(|(id, _)| *id);
        match reuse {
            Some(id) => {
                claimed.insert(id);
                aligned.insert(id, statements);
            }
            None => pending.push(statements),
        }
    }

    let mut next = 1u32;
    for statements in pending {
        while occupied.contains(&next) || claimed.contains(&next) {
            next += 1;
        }
        claimed.insert(next);
        aligned.insert(next, statements);
    }
    aligned
}

type StatementKey = (ConceptId, RelationshipTarget, u32);

fn key(rel: &Relationship) -> StatementKey {
    (rel.type_id, rel.target.clone(), rel.group)
}

/// Apply a converted axiom entry to the store.
///
/// Relationships previously derived from this entry and no longer derived
/// are removed outright, bypassing published-state checks; new ones are
/// added as stated relationships pointing back at the entry. An inactive
/// entry keeps none of its relationships on the concept. GCI relationships
/// live only on the stored axiom.
pub fn reconcile_axiom(
    store: &mut GraphStore,
    entry: AxiomEntry,
    converted: ConvertedAxiom,
) -> Result<ReconcileOutcome, GraphError> {
    let (groups, is_gci, definition_status) = match converted {
        ConvertedAxiom::Class {
            groups,
            is_gci,
            definition_status,
        } => (groups, is_gci, definition_status),
        ConvertedAxiom::Property(parsed) => {
            store.put_property_axiom(PropertyAxiomRecord {
                entry,
                parsed: Some(parsed),
            });
            return Ok(ReconcileOutcome::default());
        }
    };

    let concept_id = entry.referenced_component_id;
    let entry_id = entry.id;
    store.get_or_create(concept_id)?;
    store.index_axiom_entry(entry_id, concept_id);

    let derived_meta = ComponentMeta {
        effective_time: entry.meta.effective_time,
        active: true,
        module_id: entry.meta.module_id,
        released: entry.meta.released,
        ..ComponentMeta::default()
    };

    let (existing, occupied, old) = {
        let concept = store.get_checked(concept_id)?;
        let occupied: BTreeSet<u32> = concept
            .active_relationships(CharacteristicType::Stated)
            .filter(|r| r.group != 0 && r.axiom_entry_id != Some(entry_id))
            .map(|r| r.group)
            .collect();
        let old: Vec<Relationship> = concept.relationships_from_axiom(entry_id).cloned().collect();
        (concept.stated_groups(), occupied, old)
    };

    let aligned = if is_gci {
        groups
    } else {
        align_groups(&existing, &occupied, groups)
    };
    let derived: Vec<Relationship> = aligned
        .into_iter()
        .flat_map(|(group, statements)| {
            let meta = derived_meta.clone();
            statements.into_iter().map(move |s| {
                Relationship::from_axiom(concept_id, s.type_id, s.target, group, entry_id, meta.clone())
            })
        })
        .collect();

    let keep_on_concept = entry.meta.active && !is_gci;
    let wanted: BTreeSet<StatementKey> = if keep_on_concept {
        derived.iter().map(key).collect()
    } else {
        BTreeSet::new()
    };
    let held: BTreeSet<StatementKey> = old.iter().map(key).collect();

    let removed = store.remove_relationships(concept_id, |r| {
        r.axiom_entry_id == Some(entry_id) && (!r.is_active() || !wanted.contains(&key(r)))
    })?;
    let mut added = 0;
    if keep_on_concept {
        for rel in derived.iter().filter(|r| !held.contains(&key(r))) {
            store.put_relationship(rel.clone())?;
            added += 1;
        }
    }

    let axiom = Axiom {
        id: Some(entry_id),
        concept_id,
        active: entry.meta.active,
        module_id: entry.meta.module_id,
        definition_status,
        relationships: derived,
        is_gci,
    };
    let concept = store
        .get_mut(concept_id)
        .ok_or_else(|| GraphError::concept_not_found(concept_id))?;
    if is_gci {
        concept.class_axioms.remove(&entry_id);
        concept.gci_axioms.insert(entry_id, axiom);
    } else {
        concept.gci_axioms.remove(&entry_id);
        concept.class_axioms.insert(entry_id, axiom);
    }
    concept.axiom_entries.insert(entry_id, entry);

    let outcome = ReconcileOutcome {
        added,
        removed: removed.len(),
    };
    debug!(
        concept = concept_id,
        axiom = %entry_id,
        added = outcome.added,
        removed = outcome.removed,
        "axiom reconciled"
    );
    Ok(outcome)
}

/// Convert and apply in one step.
pub fn apply_axiom_entry(store: &mut GraphStore, entry: AxiomEntry) -> Result<ReconcileOutcome, GraphError> {
    let converted = axiom_to_relationships(entry.referenced_component_id, &entry.owl_expression)?;
    reconcile_axiom(store, entry, converted)
}

/// Entry ids of the class axioms currently asserting `source IS-A target`.
pub fn axioms_asserting(store: &GraphStore, source: ConceptId, target: ConceptId) -> Vec<Uuid> {
    store
        .get(source)
        .map(|c| {
            c.active_relationships(CharacteristicType::Stated)
                .filter(|r| r.is_is_a() && r.target_concept() == Some(target))
                .filter_map(|r| r.axiom_entry_id)
                .collect()
        })
        .unwrap_or_default()
}
