//! The graph store: an arena of concepts keyed by id plus the index tables
//! (component ownership, association targets, term lookups) derived from it.

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::identifier::{partition_of, validate_sctid, IdentifierPolicy, Partition};
use crate::model::*;
use crate::wellknown;
use crate::{CharacteristicType, ConceptId, ConceptSet, GraphError};

pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Header column naming the target of a historical association member.
pub const ASSOCIATION_TARGET_FIELD: &str = "targetComponentId";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub identifier_policy: IdentifierPolicy,
    pub verify_check_digit: bool,
    pub max_depth: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            identifier_policy: IdentifierPolicy::Lenient,
            verify_check_digit: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

pub struct GraphStore {
    concepts: AHashMap<ConceptId, Concept>,
    description_owner: AHashMap<u64, ConceptId>,
    relationship_owner: AHashMap<u64, ConceptId>,
    /// Concept-held refset members.
    member_owner: AHashMap<Uuid, (ConceptId, MemberKind)>,
    /// Every member UUID (language, axiom and concept-held) to its referenced component.
    member_referenced: AHashMap<Uuid, u64>,
    /// Association target -> (holding concept, member id).
    association_targets: AHashMap<ConceptId, BTreeSet<(ConceptId, Uuid)>>,
    alternate_owner: AHashMap<(ConceptId, String), ConceptId>,
    property_axioms: BTreeMap<Uuid, PropertyAxiomRecord>,
    module_dependencies: BTreeMap<Uuid, RefsetMember>,
    duplicate_pairs: Vec<DuplicatePair>,
    fsn_index: RwLock<Option<Arc<AHashMap<String, ConceptId>>>>,
    preferred_terms: RwLock<AHashMap<ConceptId, Arc<AHashMap<ConceptId, String>>>>,
    settings: StoreSettings,
    generation: u64,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(StoreSettings::default())
    }
}

impl GraphStore {
    pub fn new(settings: StoreSettings) -> Self {
        let mut store = Self {
            concepts: AHashMap::new(),
            description_owner: AHashMap::new(),
            relationship_owner: AHashMap::new(),
            member_owner: AHashMap::new(),
            member_referenced: AHashMap::new(),
            association_targets: AHashMap::new(),
            alternate_owner: AHashMap::new(),
            property_axioms: BTreeMap::new(),
            module_dependencies: BTreeMap::new(),
            duplicate_pairs: Vec::new(),
            fsn_index: RwLock::new(None),
            preferred_terms: RwLock::new(AHashMap::new()),
            settings,
            generation: 0,
        };
        store.seed();
        store
    }

    fn seed(&mut self) {
        for (id, fsn) in wellknown::SEEDED {
            self.concepts.insert(id, Concept::with_fsn(id, fsn));
        }
    }

    /// Drop everything and start again from the seeded concepts.
    pub fn reset(&mut self) {
        let settings = self.settings.clone();
        let generation = self.generation + 1;
        *self = Self::new(settings);
        self.generation = generation;
        debug!(generation, "graph store reset");
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn max_depth(&self) -> usize {
        self.settings.max_depth
    }

    /// Incremented by every reset; lets dependent caches detect staleness.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ------------------------------------------------------------------------
    // Identifiers
    // ------------------------------------------------------------------------

    /// Validate an identifier column under the configured policy.
    pub fn resolve_identifier(&self, raw: &str, partition: Partition) -> Result<u64, GraphError> {
        let raw = raw.trim();
        match validate_sctid(raw, Some(partition), self.settings.verify_check_digit) {
            Ok(id) => Ok(id),
            Err(err) => match self.settings.identifier_policy {
                IdentifierPolicy::Strict => Err(err),
                IdentifierPolicy::Lenient => {
                    let id = raw.parse::<u64>().map_err(|_| err.clone())?;
                    warn!(identifier = raw, error = %err, "accepting malformed identifier");
                    Ok(id)
                }
            },
        }
    }

    // ------------------------------------------------------------------------
    // Concepts
    // ------------------------------------------------------------------------

    /// Look up a concept, creating an empty one on first reference.
    pub fn get_or_create(&mut self, id: ConceptId) -> Result<&mut Concept, GraphError> {
        if !self.concepts.contains_key(&id) {
            self.resolve_identifier(&id.to_string(), Partition::Concept)?;
        }
        Ok(self.concepts.entry(id).or_insert_with(|| Concept::new(id)))
    }

    pub fn get(&self, id: ConceptId) -> Option<&Concept> {
        self.concepts.get(&id)
    }

    pub fn get_mut(&mut self, id: ConceptId) -> Option<&mut Concept> {
        self.concepts.get_mut(&id)
    }

    pub fn get_checked(&self, id: ConceptId) -> Result<&Concept, GraphError> {
        self.concepts
            .get(&id)
            .ok_or_else(|| GraphError::concept_not_found(id))
    }

    pub fn contains(&self, id: ConceptId) -> bool {
        self.concepts.contains_key(&id)
    }

    pub fn all_concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    pub fn concept_ids(&self) -> ConceptSet {
        self.concepts.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Insert a fully built concept, indexing its components and adjacency.
    pub fn register(&mut self, concept: Concept) -> Result<Option<Concept>, GraphError> {
        let previous = self.remove(concept.id);
        let id = concept.id;
        let is_a: Vec<(ConceptId, CharacteristicType)> = concept
            .relationships
            .iter()
            .filter(|r| r.is_active() && r.is_is_a())
            .filter_map(|r| r.target_concept().map(|t| (t, r.characteristic_type)))
            .collect();

        for desc_id in concept.descriptions.keys() {
            self.description_owner.insert(*desc_id, id);
        }
        for rel_id in concept.relationships.iter().filter_map(|r| r.id) {
            self.relationship_owner.insert(rel_id, id);
        }
        for entry in concept.axiom_entries.values() {
            self.member_referenced.insert(entry.id, id);
        }
        for kind in [
            MemberKind::Association,
            MemberKind::InactivationIndicator,
            MemberKind::Annotation,
        ] {
            for member in concept.members(kind).values() {
                self.index_member(id, kind, member);
            }
        }
        for key in concept.alternate_identifiers.keys() {
            self.alternate_owner.insert(key.clone(), id);
        }
        let mut concept = concept;
        concept.parents.clear();
        concept.children.clear();
        self.concepts.insert(id, concept);
        for (target, ct) in is_a {
            self.sync_is_a_adjacency(id, target, ct)?;
        }
        // Children held by other concepts are re-linked from their own relationships.
        if let Some(prev) = &previous {
            for (ct, children) in &prev.children {
                for child in children {
                    self.sync_is_a_adjacency(*child, id, *ct)?;
                }
            }
        }
        self.invalidate_term_indexes();
        Ok(previous)
    }

    /// Remove a concept and every index entry that points into it.
    pub fn remove(&mut self, id: ConceptId) -> Option<Concept> {
        let concept = self.concepts.remove(&id)?;
        for (ct, parents) in &concept.parents {
            for parent in parents {
                if let Some(p) = self.concepts.get_mut(parent) {
                    if let Some(children) = p.children.get_mut(ct) {
                        children.remove(&id);
                    }
                }
            }
        }
        for (ct, children) in &concept.children {
            for child in children {
                if let Some(c) = self.concepts.get_mut(child) {
                    if let Some(parents) = c.parents.get_mut(ct) {
                        parents.remove(&id);
                    }
                }
            }
        }
        self.description_owner.retain(|_, owner| *owner != id);
        self.relationship_owner.retain(|_, owner| *owner != id);
        let member_referenced = &mut self.member_referenced;
        self.member_owner.retain(|member, (owner, _)| {
            if *owner == id {
                member_referenced.remove(member);
            }
            *owner != id
        });
        self.association_targets.retain(|_, targets| {
            targets.retain(|(owner, _)| *owner != id);
            !targets.is_empty()
        });
        self.alternate_owner.retain(|_, owner| *owner != id);
        let language = concept.descriptions.values().flat_map(|d| d.language_members.keys());
        for member in concept.axiom_entries.keys().chain(language) {
            self.member_referenced.remove(member);
        }
        self.invalidate_term_indexes();
        Some(concept)
    }

    /// Keep IS-A adjacency in line with the concept's active relationships.
    ///
    /// The link is present exactly when at least one active IS-A with this
    /// (source, target, characteristic type) remains, whichever axiom or RF2
    /// row it came from.
    pub fn sync_is_a_adjacency(
        &mut self,
        source: ConceptId,
        target: ConceptId,
        ct: CharacteristicType,
    ) -> Result<(), GraphError> {
        let justified = self.concepts.get(&source).is_some_and(|c| {
            c.relationships.iter().any(|r| {
                r.is_active()
                    && r.is_is_a()
                    && r.characteristic_type == ct
                    && r.target_concept() == Some(target)
            })
        });

        if justified {
            self.get_or_create(target)?
                .children
                .entry(ct)
                .or_default()
                .insert(source);
            self.get_or_create(source)?
                .parents
                .entry(ct)
                .or_default()
                .insert(target);
        } else {
            if let Some(parents) = self.concepts.get_mut(&source).and_then(|c| c.parents.get_mut(&ct)) {
                parents.remove(&target);
            }
            if let Some(children) = self.concepts.get_mut(&target).and_then(|c| c.children.get_mut(&ct)) {
                children.remove(&source);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Descriptions
    // ------------------------------------------------------------------------

    pub fn description_owner(&self, id: u64) -> Option<ConceptId> {
        self.description_owner.get(&id).copied()
    }

    pub fn description(&self, id: u64) -> Option<&Description> {
        let owner = self.description_owner.get(&id)?;
        self.concepts.get(owner)?.descriptions.get(&id)
    }

    /// Mutable access; term indexes are invalidated.
    pub fn description_mut(&mut self, id: u64) -> Option<&mut Description> {
        self.invalidate_term_indexes();
        let owner = *self.description_owner.get(&id)?;
        self.concepts.get_mut(&owner)?.descriptions.get_mut(&id)
    }

    pub fn put_description(&mut self, description: Description) -> Result<(), GraphError> {
        let id = description.id;
        let concept_id = description.concept_id;
        if let Some(old_owner) = self.description_owner.get(&id).copied() {
            if old_owner != concept_id {
                if let Some(old) = self.concepts.get_mut(&old_owner) {
                    old.descriptions.remove(&id);
                }
            }
        }
        let concept = self.get_or_create(concept_id)?;
        if description.is_fsn() && description.meta.active {
            concept.fsn = description.term.clone();
        }
        concept.descriptions.insert(id, description);
        self.description_owner.insert(id, concept_id);
        self.invalidate_term_indexes();
        Ok(())
    }

    /// Language refset member by UUID, found through its description.
    pub fn language_member(&self, id: Uuid) -> Option<&LangRefsetEntry> {
        let description_id = self.member_referenced.get(&id)?;
        self.description(*description_id)?.language_members.get(&id)
    }

    pub fn index_language_member(&mut self, id: Uuid, description_id: u64) {
        self.member_referenced.insert(id, description_id);
    }

    pub fn record_duplicate_pair(&mut self, pair: DuplicatePair) {
        self.duplicate_pairs.push(pair);
    }

    /// Language refset conflicts left for the caller to reconcile.
    pub fn duplicate_pairs(&self) -> &[DuplicatePair] {
        &self.duplicate_pairs
    }

    // ------------------------------------------------------------------------
    // Relationships
    // ------------------------------------------------------------------------

    pub fn relationship_owner(&self, id: u64) -> Option<ConceptId> {
        self.relationship_owner.get(&id).copied()
    }

    pub fn relationship(&self, id: u64) -> Option<&Relationship> {
        let owner = self.relationship_owner.get(&id)?;
        self.concepts.get(owner)?.relationship(id)
    }

    /// Insert or replace a relationship (replacement is by RF2 id when it
    /// has one) and update IS-A adjacency for both old and new versions.
    pub fn put_relationship(&mut self, relationship: Relationship) -> Result<(), GraphError> {
        let source = relationship.source_id;
        let mut touched: Vec<(ConceptId, ConceptId, CharacteristicType)> = Vec::new();

        if let Some(rel_id) = relationship.id {
            if let Some(old_owner) = self.relationship_owner.get(&rel_id).copied() {
                if let Some(owner) = self.concepts.get_mut(&old_owner) {
                    if let Some(pos) = owner.relationships.iter().position(|r| r.id == Some(rel_id)) {
                        let old = owner.relationships.remove(pos);
                        if let Some(t) = old.target_concept().filter(|_| old.is_is_a()) {
                            touched.push((old_owner, t, old.characteristic_type));
                        }
                    }
                }
            }
            self.relationship_owner.insert(rel_id, source);
        }
        if let Some(t) = relationship.target_concept().filter(|_| relationship.is_is_a()) {
            touched.push((source, t, relationship.characteristic_type));
        }

        self.get_or_create(source)?.relationships.push(relationship);
        for (s, t, ct) in touched {
            self.sync_is_a_adjacency(s, t, ct)?;
        }
        Ok(())
    }

    /// Remove the matching relationships from a concept, regardless of
    /// published state, and return them.
    pub fn remove_relationships(
        &mut self,
        source: ConceptId,
        predicate: impl Fn(&Relationship) -> bool,
    ) -> Result<Vec<Relationship>, GraphError> {
        let Some(concept) = self.concepts.get_mut(&source) else {
            return Ok(Vec::new());
        };
        let mut removed = Vec::new();
        concept.relationships.retain(|r| {
            if predicate(r) {
                removed.push(r.clone());
                false
            } else {
                true
            }
        });
        for rel in &removed {
            if let Some(id) = rel.id {
                self.relationship_owner.remove(&id);
            }
            if let Some(t) = rel.target_concept().filter(|_| rel.is_is_a()) {
                self.sync_is_a_adjacency(source, t, rel.characteristic_type)?;
            }
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------------
    // Reference set members
    // ------------------------------------------------------------------------

    /// Owning concept for a referenced component id. Concepts are created on
    /// first reference; descriptions and relationships must already exist.
    pub fn owner_of_referenced(&mut self, referenced: u64) -> Result<ConceptId, GraphError> {
        match partition_of(referenced) {
            Some(Partition::Description) => self.description_owner(referenced).ok_or(GraphError::NotFound {
                kind: "description",
                id: referenced.to_string(),
            }),
            Some(Partition::Relationship) => {
                self.relationship_owner(referenced).ok_or(GraphError::NotFound {
                    kind: "relationship",
                    id: referenced.to_string(),
                })
            }
            _ => {
                self.get_or_create(referenced)?;
                Ok(referenced)
            }
        }
    }

    pub fn member(&self, kind: MemberKind, id: Uuid) -> Option<&RefsetMember> {
        let (owner, held_kind) = self.member_owner.get(&id)?;
        if *held_kind != kind {
            return None;
        }
        self.concepts.get(owner)?.members(kind).get(&id)
    }

    pub fn put_member(&mut self, kind: MemberKind, member: RefsetMember) -> Result<(), GraphError> {
        let owner = self.owner_of_referenced(member.referenced_component_id)?;
        if let Some((old_owner, old_kind)) = self.member_owner.get(&member.id).copied() {
            if let Some(concept) = self.concepts.get_mut(&old_owner) {
                concept.members_mut(old_kind).remove(&member.id);
            }
            self.association_targets.retain(|_, targets| {
                targets.remove(&(old_owner, member.id));
                !targets.is_empty()
            });
        }
        self.index_member(owner, kind, &member);
        self.get_or_create(owner)?
            .members_mut(kind)
            .insert(member.id, member);
        Ok(())
    }

    fn index_member(&mut self, owner: ConceptId, kind: MemberKind, member: &RefsetMember) {
        self.member_owner.insert(member.id, (owner, kind));
        self.member_referenced
            .insert(member.id, member.referenced_component_id);
        if kind == MemberKind::Association {
            if let Some(target) = member
                .field(ASSOCIATION_TARGET_FIELD)
                .and_then(|t| t.trim().parse::<ConceptId>().ok())
            {
                self.association_targets
                    .entry(target)
                    .or_default()
                    .insert((owner, member.id));
            }
        }
    }

    /// Active historical association members pointing at `target`.
    pub fn associations_targeting(&self, target: ConceptId) -> Vec<&RefsetMember> {
        let Some(sources) = self.association_targets.get(&target) else {
            return Vec::new();
        };
        sources
            .iter()
            .filter_map(|(owner, id)| self.concepts.get(owner)?.associations.get(id))
            .filter(|m| m.meta.active)
            .collect()
    }

    pub(crate) fn index_axiom_entry(&mut self, id: Uuid, concept: ConceptId) {
        self.member_referenced.insert(id, concept);
    }

    pub fn axiom_entry(&self, id: Uuid) -> Option<&AxiomEntry> {
        let concept = self.member_referenced.get(&id)?;
        self.concepts.get(concept)?.axiom_entries.get(&id)
    }

    pub(crate) fn member_referenced_component(&self, id: Uuid) -> Option<u64> {
        self.member_referenced.get(&id).copied()
    }

    pub fn put_property_axiom(&mut self, record: PropertyAxiomRecord) {
        self.property_axioms.insert(record.entry.id, record);
    }

    pub fn property_axiom(&self, id: Uuid) -> Option<&PropertyAxiomRecord> {
        self.property_axioms.get(&id)
    }

    pub fn property_axioms(&self) -> impl Iterator<Item = &PropertyAxiomRecord> {
        self.property_axioms.values()
    }

    pub fn put_module_dependency(&mut self, member: RefsetMember) {
        self.module_dependencies.insert(member.id, member);
    }

    pub fn module_dependency(&self, id: Uuid) -> Option<&RefsetMember> {
        self.module_dependencies.get(&id)
    }

    pub fn module_dependencies(&self) -> impl Iterator<Item = &RefsetMember> {
        self.module_dependencies.values()
    }

    pub fn alternate_identifier(&self, scheme: ConceptId, value: &str) -> Option<&AlternateIdentifier> {
        let key = (scheme, value.to_string());
        let owner = self.alternate_owner.get(&key)?;
        self.concepts.get(owner)?.alternate_identifiers.get(&key)
    }

    pub fn put_alternate_identifier(&mut self, alternate: AlternateIdentifier) -> Result<(), GraphError> {
        let owner = self.owner_of_referenced(alternate.referenced_component_id)?;
        let key = (
            alternate.identifier_scheme_id,
            alternate.alternate_identifier.clone(),
        );
        if let Some(old_owner) = self.alternate_owner.get(&key).copied() {
            if let Some(concept) = self.concepts.get_mut(&old_owner) {
                concept.alternate_identifiers.remove(&key);
            }
        }
        self.alternate_owner.insert(key.clone(), owner);
        self.get_or_create(owner)?
            .alternate_identifiers
            .insert(key, alternate);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Term indexes (built lazily, dropped on any description change)
    // ------------------------------------------------------------------------

    pub fn invalidate_term_indexes(&self) {
        *self.fsn_index.write() = None;
        self.preferred_terms.write().clear();
    }

    /// Concept whose active FSN is exactly `term`.
    pub fn fsn_lookup(&self, term: &str) -> Option<ConceptId> {
        let cached = self.fsn_index.read().clone();
        let index = match cached {
            Some(index) => index,
            None => {
                let built = Arc::new(self.build_fsn_index());
                *self.fsn_index.write() = Some(built.clone());
                built
            }
        };
        index.get(term).copied()
    }

    fn build_fsn_index(&self) -> AHashMap<String, ConceptId> {
        let mut index = AHashMap::with_capacity(self.concepts.len());
        for concept in self.concepts.values() {
            let mut found = false;
            for desc in concept.descriptions.values() {
                if desc.meta.active && desc.is_fsn() {
                    index.insert(desc.term.clone(), concept.id);
                    found = true;
                }
            }
            if !found && !concept.fsn.is_empty() {
                index.insert(concept.fsn.clone(), concept.id);
            }
        }
        index
    }

    /// Preferred synonym of `concept` in a language refset.
    pub fn preferred_term(&self, concept: ConceptId, lang_refset: ConceptId) -> Option<String> {
        let cached = self.preferred_terms.read().get(&lang_refset).cloned();
        let index = match cached {
            Some(index) => index,
            None => {
                let built = Arc::new(self.build_preferred_term_index(lang_refset));
                self.preferred_terms
                    .write()
                    .insert(lang_refset, built.clone());
                built
            }
        };
        index.get(&concept).cloned()
    }

    fn build_preferred_term_index(&self, lang_refset: ConceptId) -> AHashMap<ConceptId, String> {
        self.concepts
            .values()
            .filter_map(|concept| {
                concept
                    .descriptions
                    .values()
                    .find(|d| d.type_id == wellknown::SYNONYM && d.is_preferred_in(lang_refset))
                    .map(|d| (concept.id, d.term.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{sctid_for, IdentifierPolicy};

    fn is_a(id: u64, source: ConceptId, target: ConceptId, active: bool) -> Relationship {
        Relationship {
            id: Some(id),
            source_id: source,
            type_id: wellknown::IS_A,
            target: RelationshipTarget::Concept(target),
            group: 0,
            characteristic_type: CharacteristicType::Inferred,
            modifier_id: wellknown::EXISTENTIAL_MODIFIER,
            meta: ComponentMeta::new(None, active, 0),
            axiom_entry_id: None,
        }
    }

    #[test]
    fn new_store_is_seeded() {
        let store = GraphStore::default();
        assert!(store.contains(wellknown::ROOT_CONCEPT));
        assert!(store.contains(wellknown::IS_A));
        assert_eq!(store.len(), wellknown::SEEDED.len());
    }

    #[test]
    fn reset_reseeds_and_bumps_generation() {
        let mut store = GraphStore::default();
        store.get_or_create(100005).unwrap();
        store.reset();
        assert!(store.get(100005).is_none());
        assert!(store.contains(wellknown::ROOT_CONCEPT));
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn strict_policy_rejects_malformed_ids() {
        let mut store = GraphStore::new(StoreSettings {
            identifier_policy: IdentifierPolicy::Strict,
            ..StoreSettings::default()
        });
        assert!(matches!(
            store.get_or_create(12),
            Err(GraphError::MalformedIdentifier { .. })
        ));
        let lenient = GraphStore::default();
        assert_eq!(lenient.resolve_identifier("12", Partition::Concept).unwrap(), 12);
    }

    #[test]
    fn check_digit_policy() {
        let good = sctid_for(77, Partition::Concept);
        let mut store = GraphStore::new(StoreSettings {
            identifier_policy: IdentifierPolicy::Strict,
            verify_check_digit: true,
            ..StoreSettings::default()
        });
        assert!(store.get_or_create(good).is_ok());
        assert!(store.get_or_create(good + 1).is_err());
    }

    #[test]
    fn get_checked_reports_not_found() {
        let store = GraphStore::default();
        assert_eq!(
            store.get_checked(100005).unwrap_err(),
            GraphError::concept_not_found(100005)
        );
    }

    #[test]
    fn relationship_replacement_updates_adjacency() {
        let mut store = GraphStore::default();
        store.put_relationship(is_a(1000021, 100005, 200009, true)).unwrap();
        let ct = CharacteristicType::Inferred;
        assert!(store.get(100005).unwrap().parents(ct).contains(&200009));
        assert!(store.get(200009).unwrap().children(ct).contains(&100005));

        store.put_relationship(is_a(1000021, 100005, 200009, false)).unwrap();
        assert!(store.get(100005).unwrap().parents(ct).is_empty());
        assert!(store.get(200009).unwrap().children(ct).is_empty());
        assert_eq!(store.relationship_owner(1000021), Some(100005));
    }

    #[test]
    fn adjacency_survives_while_another_relationship_justifies_it() {
        let mut store = GraphStore::default();
        let ct = CharacteristicType::Inferred;
        store.put_relationship(is_a(1000021, 100005, 200009, true)).unwrap();
        store.put_relationship(is_a(2000025, 100005, 200009, true)).unwrap();
        store.put_relationship(is_a(1000021, 100005, 200009, false)).unwrap();
        assert!(store.get(100005).unwrap().parents(ct).contains(&200009));
        store.put_relationship(is_a(2000025, 100005, 200009, false)).unwrap();
        assert!(!store.get(100005).unwrap().parents(ct).contains(&200009));
    }

    #[test]
    fn remove_unlinks_neighbours() {
        let mut store = GraphStore::default();
        store.put_relationship(is_a(1000021, 100005, 200009, true)).unwrap();
        store.remove(100005);
        assert!(store.get(200009).unwrap().children(CharacteristicType::Inferred).is_empty());
        assert_eq!(store.relationship_owner(1000021), None);
    }

    #[test]
    fn remove_purges_member_indexes() {
        let mut store = GraphStore::default();
        let association = Uuid::from_u128(1);
        let language = Uuid::from_u128(2);
        store
            .put_member(
                MemberKind::Association,
                RefsetMember {
                    id: association,
                    meta: ComponentMeta::new(None, true, 0),
                    refset_id: 900000000000527005,
                    referenced_component_id: 100005,
                    fields: vec![(ASSOCIATION_TARGET_FIELD.to_string(), "200009".to_string())],
                },
            )
            .unwrap();
        store
            .put_description(Description {
                id: 101013,
                concept_id: 100005,
                language_code: "en".to_string(),
                type_id: wellknown::SYNONYM,
                term: "Widget".to_string(),
                case_significance_id: 0,
                meta: ComponentMeta::new(None, true, 0),
                language_members: BTreeMap::from([(
                    language,
                    LangRefsetEntry {
                        id: language,
                        meta: ComponentMeta::new(None, true, 0),
                        refset_id: wellknown::US_ENGLISH_LANG_REFSET,
                        description_id: 101013,
                        acceptability_id: wellknown::PREFERRED,
                    },
                )]),
                acceptability: BTreeMap::new(),
            })
            .unwrap();
        store.index_language_member(language, 101013);
        assert_eq!(store.associations_targeting(200009).len(), 1);
        assert_eq!(store.member_referenced_component(language), Some(101013));

        store.remove(100005);
        assert_eq!(store.member_referenced_component(association), None);
        assert_eq!(store.member_referenced_component(language), None);
        assert!(store.member_owner.is_empty());
        assert!(!store.association_targets.contains_key(&200009));
        assert!(store.associations_targeting(200009).is_empty());
    }

    #[test]
    fn register_indexes_components() {
        let mut store = GraphStore::default();
        let mut concept = Concept::new(100005);
        concept.relationships.push(is_a(1000021, 100005, wellknown::ROOT_CONCEPT, true));
        concept.descriptions.insert(
            101013,
            Description {
                id: 101013,
                concept_id: 100005,
                language_code: "en".to_string(),
                type_id: wellknown::FSN,
                term: "Widget (thing)".to_string(),
                case_significance_id: 0,
                meta: ComponentMeta::new(None, true, 0),
                language_members: BTreeMap::new(),
                acceptability: BTreeMap::new(),
            },
        );
        store.register(concept).unwrap();
        assert_eq!(store.description_owner(101013), Some(100005));
        assert_eq!(store.fsn_lookup("Widget (thing)"), Some(100005));
        assert!(store
            .get(wellknown::ROOT_CONCEPT)
            .unwrap()
            .children(CharacteristicType::Inferred)
            .contains(&100005));
    }

    #[test]
    fn term_indexes_are_rebuilt_after_changes() {
        let mut store = GraphStore::default();
        let fsn = Description {
            id: 101013,
            concept_id: 100005,
            language_code: "en".to_string(),
            type_id: wellknown::FSN,
            term: "Widget (thing)".to_string(),
            case_significance_id: 0,
            meta: ComponentMeta::new(None, true, 0),
            language_members: BTreeMap::new(),
            acceptability: BTreeMap::new(),
        };
        store.put_description(fsn.clone()).unwrap();
        assert_eq!(store.fsn_lookup("Widget (thing)"), Some(100005));

        store
            .put_description(Description {
                term: "Gadget (thing)".to_string(),
                ..fsn
            })
            .unwrap();
        assert_eq!(store.fsn_lookup("Widget (thing)"), None);
        assert_eq!(store.fsn_lookup("Gadget (thing)"), Some(100005));
        assert_eq!(store.get(100005).unwrap().fsn, "Gadget (thing)");
    }
}
