//! Entities held by the graph store.
//!
//! Entities refer to each other by id only. Adjacency and ownership are
//! index tables resolved through the store.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use termgraph_owl::OwlValue;
use uuid::Uuid;

use crate::wellknown;
use crate::{ConceptId, EffectiveTime, GraphError};

// ============================================================================
// Enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CharacteristicType {
    Stated,
    Inferred,
    Additional,
    Qualifying,
}

impl CharacteristicType {
    pub const ALL: [CharacteristicType; 4] = [
        CharacteristicType::Stated,
        CharacteristicType::Inferred,
        CharacteristicType::Additional,
        CharacteristicType::Qualifying,
    ];

    pub fn sctid(self) -> ConceptId {
        match self {
            CharacteristicType::Stated => wellknown::STATED_RELATIONSHIP,
            CharacteristicType::Inferred => wellknown::INFERRED_RELATIONSHIP,
            CharacteristicType::Additional => wellknown::ADDITIONAL_RELATIONSHIP,
            CharacteristicType::Qualifying => wellknown::QUALIFYING_RELATIONSHIP,
        }
    }

    pub fn from_sctid(id: ConceptId) -> Option<Self> {
        Self::ALL.into_iter().find(|ct| ct.sctid() == id)
    }
}

impl fmt::Display for CharacteristicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CharacteristicType::Stated => "STATED",
            CharacteristicType::Inferred => "INFERRED",
            CharacteristicType::Additional => "ADDITIONAL",
            CharacteristicType::Qualifying => "QUALIFYING",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DefinitionStatus {
    #[default]
    Primitive,
    FullyDefined,
}

impl DefinitionStatus {
    pub fn sctid(self) -> ConceptId {
        match self {
            DefinitionStatus::Primitive => wellknown::PRIMITIVE,
            DefinitionStatus::FullyDefined => wellknown::FULLY_DEFINED,
        }
    }

    pub fn from_sctid(id: ConceptId) -> Option<Self> {
        match id {
            wellknown::PRIMITIVE => Some(DefinitionStatus::Primitive),
            wellknown::FULLY_DEFINED => Some(DefinitionStatus::FullyDefined),
            _ => None,
        }
    }

    pub fn is_primitive(self) -> bool {
        self == DefinitionStatus::Primitive
    }
}

// ============================================================================
// Shared component state
// ============================================================================

/// Versioning state shared by every RF2 component.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentMeta {
    /// `None` until published.
    pub effective_time: Option<EffectiveTime>,
    pub active: bool,
    pub module_id: ConceptId,
    /// Set once, by the first load that supplies a value.
    pub released: Option<bool>,
    pub dirty: bool,
    /// A no-change delta reverted the effective time; the superseded value
    /// should be recovered later.
    pub recover_effective_time: bool,
}

impl ComponentMeta {
    pub fn new(effective_time: Option<EffectiveTime>, active: bool, module_id: ConceptId) -> Self {
        Self {
            effective_time,
            active,
            module_id,
            ..Self::default()
        }
    }

    pub fn is_released(&self) -> bool {
        self.released == Some(true)
    }
}

// ============================================================================
// Relationships
// ============================================================================

/// A concrete value as carried by a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConcreteValue {
    Decimal(String),
    Integer(i64),
    String(String),
}

impl ConcreteValue {
    /// Parse an RF2 `value` column: `#` prefix for numbers (a decimal point
    /// makes it DECIMAL), double quotes for strings.
    pub fn from_rf2(raw: &str) -> Result<Self, GraphError> {
        let invalid = |reason: &str| GraphError::InvalidConcreteValue {
            value: raw.to_string(),
            reason: reason.to_string(),
        };
        if let Some(number) = raw.strip_prefix('#') {
            if number.contains('.') {
                let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
                let whole = whole.strip_prefix('-').unwrap_or(whole);
                let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
                if digits(whole) && digits(frac) {
                    return Ok(ConcreteValue::Decimal(number.to_string()));
                }
                return Err(invalid("invalid decimal value"));
            }
            return number
                .parse::<i64>()
                .map(ConcreteValue::Integer)
                .map_err(|_| invalid("invalid integer value"));
        }
        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            return Ok(ConcreteValue::String(raw[1..raw.len() - 1].to_string()));
        }
        Err(invalid("concrete value must start with `#` or be quoted"))
    }

    pub fn to_rf2(&self) -> String {
        match self {
            ConcreteValue::Decimal(d) => format!("#{d}"),
            ConcreteValue::Integer(i) => format!("#{i}"),
            ConcreteValue::String(s) => format!("\"{s}\""),
        }
    }
}

impl From<OwlValue> for ConcreteValue {
    fn from(value: OwlValue) -> Self {
        match value {
            OwlValue::Decimal(d) => ConcreteValue::Decimal(d),
            OwlValue::Integer(i) => ConcreteValue::Integer(i),
            OwlValue::String(s) => ConcreteValue::String(s),
        }
    }
}

impl From<ConcreteValue> for OwlValue {
    fn from(value: ConcreteValue) -> Self {
        match value {
            ConcreteValue::Decimal(d) => OwlValue::Decimal(d),
            ConcreteValue::Integer(i) => OwlValue::Integer(i),
            ConcreteValue::String(s) => OwlValue::String(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationshipTarget {
    Concept(ConceptId),
    Value(ConcreteValue),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Absent when the relationship was derived from an axiom.
    pub id: Option<u64>,
    pub source_id: ConceptId,
    pub type_id: ConceptId,
    pub target: RelationshipTarget,
    /// 0 = ungrouped.
    pub group: u32,
    pub characteristic_type: CharacteristicType,
    pub modifier_id: ConceptId,
    pub meta: ComponentMeta,
    /// Axiom entry this relationship was derived from.
    pub axiom_entry_id: Option<Uuid>,
}

impl Relationship {
    /// A stated relationship derived from an axiom entry.
    pub fn from_axiom(
        source_id: ConceptId,
        type_id: ConceptId,
        target: RelationshipTarget,
        group: u32,
        axiom_entry_id: Uuid,
        meta: ComponentMeta,
    ) -> Self {
        Self {
            id: None,
            source_id,
            type_id,
            target,
            group,
            characteristic_type: CharacteristicType::Stated,
            modifier_id: wellknown::EXISTENTIAL_MODIFIER,
            meta,
            axiom_entry_id: Some(axiom_entry_id),
        }
    }

    pub fn target_concept(&self) -> Option<ConceptId> {
        match self.target {
            RelationshipTarget::Concept(id) => Some(id),
            RelationshipTarget::Value(_) => None,
        }
    }

    pub fn is_is_a(&self) -> bool {
        self.type_id == wellknown::IS_A && self.target_concept().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.meta.active
    }

    /// Same (type, target, group) statement.
    pub fn same_statement(&self, other: &Relationship) -> bool {
        self.type_id == other.type_id && self.target == other.target && self.group == other.group
    }
}

// ============================================================================
// Descriptions and reference set members
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangRefsetEntry {
    pub id: Uuid,
    pub meta: ComponentMeta,
    pub refset_id: ConceptId,
    pub description_id: u64,
    pub acceptability_id: ConceptId,
}

impl LangRefsetEntry {
    pub fn is_preferred(&self) -> bool {
        self.meta.active && self.acceptability_id == wellknown::PREFERRED
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub id: u64,
    pub concept_id: ConceptId,
    pub language_code: String,
    pub type_id: ConceptId,
    pub term: String,
    pub case_significance_id: ConceptId,
    pub meta: ComponentMeta,
    /// Every language refset member seen for this description.
    pub language_members: BTreeMap<Uuid, LangRefsetEntry>,
    /// Language refset -> member currently deciding acceptability.
    pub acceptability: BTreeMap<ConceptId, Uuid>,
}

impl Description {
    pub fn is_fsn(&self) -> bool {
        self.type_id == wellknown::FSN
    }

    /// Acceptability entry in effect for a language refset.
    pub fn acceptability_in(&self, refset_id: ConceptId) -> Option<&LangRefsetEntry> {
        self.acceptability
            .get(&refset_id)
            .and_then(|uuid| self.language_members.get(uuid))
    }

    pub fn is_preferred_in(&self, refset_id: ConceptId) -> bool {
        self.meta.active && self.acceptability_in(refset_id).is_some_and(|e| e.is_preferred())
    }
}

/// A generic reference set member. Trailing refset-specific columns are kept
/// by header name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefsetMember {
    pub id: Uuid,
    pub meta: ComponentMeta,
    pub refset_id: ConceptId,
    pub referenced_component_id: u64,
    pub fields: Vec<(String, String)>,
}

impl RefsetMember {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Kind of refset member held on a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Association,
    InactivationIndicator,
    Annotation,
}

/// A language refset conflict left for callers to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub description_id: u64,
    pub refset_id: ConceptId,
    pub kept: Uuid,
    pub duplicate: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateIdentifier {
    pub alternate_identifier: String,
    pub meta: ComponentMeta,
    pub identifier_scheme_id: ConceptId,
    pub referenced_component_id: u64,
}

// ============================================================================
// Axioms
// ============================================================================

/// An OWL axiom refset row as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxiomEntry {
    pub id: Uuid,
    pub meta: ComponentMeta,
    pub refset_id: ConceptId,
    pub referenced_component_id: ConceptId,
    pub owl_expression: String,
}

/// Structured view of a class axiom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axiom {
    /// Absent until first persisted.
    pub id: Option<Uuid>,
    pub concept_id: ConceptId,
    pub active: bool,
    pub module_id: ConceptId,
    pub definition_status: DefinitionStatus,
    pub relationships: Vec<Relationship>,
    pub is_gci: bool,
}

/// Object/data property axiom kept outside the class hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyAxiomRecord {
    pub entry: AxiomEntry,
    /// `None` when the expression could not be parsed at all.
    pub parsed: Option<termgraph_owl::PropertyAxiom>,
}

// ============================================================================
// Concept
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    /// Empty until an FSN description is loaded.
    pub fsn: String,
    pub definition_status: DefinitionStatus,
    pub meta: ComponentMeta,
    pub parents: BTreeMap<CharacteristicType, BTreeSet<ConceptId>>,
    pub children: BTreeMap<CharacteristicType, BTreeSet<ConceptId>>,
    pub relationships: Vec<Relationship>,
    pub descriptions: BTreeMap<u64, Description>,
    pub axiom_entries: BTreeMap<Uuid, AxiomEntry>,
    pub class_axioms: BTreeMap<Uuid, Axiom>,
    pub gci_axioms: BTreeMap<Uuid, Axiom>,
    pub associations: BTreeMap<Uuid, RefsetMember>,
    pub inactivation_indicators: BTreeMap<Uuid, RefsetMember>,
    pub annotations: BTreeMap<Uuid, RefsetMember>,
    pub alternate_identifiers: BTreeMap<(ConceptId, String), AlternateIdentifier>,
}

static NO_IDS: BTreeSet<ConceptId> = BTreeSet::new();

impl Concept {
    pub fn new(id: ConceptId) -> Self {
        Self {
            id,
            meta: ComponentMeta {
                active: true,
                ..ComponentMeta::default()
            },
            ..Self::default()
        }
    }

    pub fn with_fsn(id: ConceptId, fsn: impl Into<String>) -> Self {
        Self {
            fsn: fsn.into(),
            ..Self::new(id)
        }
    }

    pub fn is_active(&self) -> bool {
        self.meta.active
    }

    pub fn parents(&self, ct: CharacteristicType) -> &BTreeSet<ConceptId> {
        self.parents.get(&ct).unwrap_or(&NO_IDS)
    }

    pub fn children(&self, ct: CharacteristicType) -> &BTreeSet<ConceptId> {
        self.children.get(&ct).unwrap_or(&NO_IDS)
    }

    pub fn active_relationships(&self, ct: CharacteristicType) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(move |r| r.is_active() && r.characteristic_type == ct)
    }

    /// Relationships currently attributed to one axiom entry.
    pub fn relationships_from_axiom(&self, entry: Uuid) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(move |r| r.axiom_entry_id == Some(entry))
    }

    pub fn relationship(&self, id: u64) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == Some(id))
    }

    pub fn members(&self, kind: MemberKind) -> &BTreeMap<Uuid, RefsetMember> {
        match kind {
            MemberKind::Association => &self.associations,
            MemberKind::InactivationIndicator => &self.inactivation_indicators,
            MemberKind::Annotation => &self.annotations,
        }
    }

    pub fn members_mut(&mut self, kind: MemberKind) -> &mut BTreeMap<Uuid, RefsetMember> {
        match kind {
            MemberKind::Association => &mut self.associations,
            MemberKind::InactivationIndicator => &mut self.inactivation_indicators,
            MemberKind::Annotation => &mut self.annotations,
        }
    }

    /// Stated group ids currently in use, excluding group 0.
    pub fn stated_groups(&self) -> BTreeMap<u32, BTreeSet<(ConceptId, RelationshipTarget)>> {
        let mut groups: BTreeMap<u32, BTreeSet<(ConceptId, RelationshipTarget)>> = BTreeMap::new();
        for rel in self.active_relationships(CharacteristicType::Stated) {
            if rel.group != 0 {
                groups
                    .entry(rel.group)
                    .or_default()
                    .insert((rel.type_id, rel.target.clone()));
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_values_follow_rf2_prefixes() {
        assert_eq!(
            ConcreteValue::from_rf2("#12.5").unwrap(),
            ConcreteValue::Decimal("12.5".to_string())
        );
        assert_eq!(ConcreteValue::from_rf2("#250").unwrap(), ConcreteValue::Integer(250));
        assert_eq!(
            ConcreteValue::from_rf2("\"tablet\"").unwrap(),
            ConcreteValue::String("tablet".to_string())
        );
        assert!(matches!(
            ConcreteValue::from_rf2("#1.x"),
            Err(GraphError::InvalidConcreteValue { .. })
        ));
        assert!(ConcreteValue::from_rf2("250").is_err());
        assert_eq!(ConcreteValue::Decimal("0.5".to_string()).to_rf2(), "#0.5");
    }

    #[test]
    fn characteristic_types_map_to_metadata_ids() {
        for ct in CharacteristicType::ALL {
            assert_eq!(CharacteristicType::from_sctid(ct.sctid()), Some(ct));
        }
        assert_eq!(CharacteristicType::from_sctid(1), None);
    }

    #[test]
    fn new_concepts_are_active_with_empty_adjacency() {
        let c = Concept::new(100005);
        assert!(c.is_active());
        assert!(c.parents(CharacteristicType::Stated).is_empty());
        assert!(c.fsn.is_empty());
    }
}
