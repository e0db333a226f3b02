//! OWL axiom conversion for terminology class axioms.
//!
//! Terminology releases publish logical definitions as OWL 2 functional-syntax
//! strings (one per axiom refset member). This crate converts between that
//! surface and a grouped-relationship view:
//!
//! ```text
//! SubClassOf(:100005 ObjectIntersectionOf(:200009
//!     ObjectSomeValuesFrom(:609096000 ObjectSomeValuesFrom(:363698007 :39057004))))
//!
//!   => left_hand_concept = 100005
//!      group 0: 116680003 -> 200009
//!      group 1: 363698007 -> 39057004
//! ```
//!
//! Only the fragment used by terminology releases is supported:
//! `SubClassOf`, `EquivalentClasses`, `ObjectIntersectionOf`,
//! `ObjectSomeValuesFrom`, `DataHasValue`, and the property axioms
//! (`SubObjectPropertyOf`, `SubDataPropertyOf`, `TransitiveObjectProperty`,
//! `ReflexiveObjectProperty`, `ObjectPropertyChain`).
//!
//! Group numbers are not part of OWL. Parsing numbers role groups `1..n` in
//! order of appearance; callers that need stable numbering across
//! re-derivation realign them afterwards.

mod parser;
mod render;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub use parser::{is_class_axiom, parse_axiom};
pub use render::render_class_axiom;

/// `116680003 |Is a (attribute)|`
pub const IS_A: u64 = 116_680_003;
/// `609096000 |Role group (attribute)|`
pub const ROLE_GROUP: u64 = 609_096_000;
/// Namespace IRI used when identifiers are written as full IRIs.
pub const SNOMED_IRI_PREFIX: &str = "http://snomed.info/id/";

// ============================================================================
// Representation
// ============================================================================

/// Datatype tag carried by a concrete value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueType {
    Decimal,
    Integer,
    String,
}

impl ValueType {
    pub fn xsd_name(self) -> &'static str {
        match self {
            ValueType::Decimal => "xsd:decimal",
            ValueType::Integer => "xsd:integer",
            ValueType::String => "xsd:string",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xsd_name())
    }
}

/// A concrete (literal) value in the library's representation.
///
/// Decimals keep their lexical form so that `1.50` survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OwlValue {
    Decimal(String),
    Integer(i64),
    String(String),
}

impl OwlValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            OwlValue::Decimal(_) => ValueType::Decimal,
            OwlValue::Integer(_) => ValueType::Integer,
            OwlValue::String(_) => ValueType::String,
        }
    }

    /// Build a value from a lexical form and its declared datatype.
    pub fn from_lexical(value_type: ValueType, lexical: &str) -> Result<Self, OwlError> {
        let invalid = || OwlError::InvalidLiteral {
            value_type,
            lexical: lexical.to_string(),
        };
        match value_type {
            ValueType::Integer => lexical
                .trim_start_matches('+')
                .parse::<i64>()
                .map(OwlValue::Integer)
                .map_err(|_| invalid()),
            ValueType::Decimal => {
                let body = lexical.trim_start_matches(['+', '-']);
                let mut parts = body.splitn(2, '.');
                let whole = parts.next().unwrap_or("");
                let frac = parts.next().unwrap_or("0");
                let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
                if digits(whole) && digits(frac) {
                    Ok(OwlValue::Decimal(lexical.to_string()))
                } else {
                    Err(invalid())
                }
            }
            ValueType::String => Ok(OwlValue::String(lexical.to_string())),
        }
    }

    pub fn lexical(&self) -> String {
        match self {
            OwlValue::Decimal(s) | OwlValue::String(s) => s.clone(),
            OwlValue::Integer(i) => i.to_string(),
        }
    }
}

/// Right-hand side of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OwlTarget {
    Concept(u64),
    Value(OwlValue),
}

/// One attribute (or IS-A) statement inside a class expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwlRelationship {
    pub type_id: u64,
    pub target: OwlTarget,
}

impl OwlRelationship {
    pub fn is_a(parent: u64) -> Self {
        Self {
            type_id: IS_A,
            target: OwlTarget::Concept(parent),
        }
    }

    pub fn concept(type_id: u64, target: u64) -> Self {
        Self {
            type_id,
            target: OwlTarget::Concept(target),
        }
    }

    pub fn value(type_id: u64, value: OwlValue) -> Self {
        Self {
            type_id,
            target: OwlTarget::Value(value),
        }
    }
}

/// Relationships keyed by group number; group 0 holds ungrouped statements.
pub type OwlGroups = BTreeMap<u32, Vec<OwlRelationship>>;

/// A class axiom reduced to grouped relationships.
///
/// Exactly one side carries a named concept in the forms produced by
/// terminology releases. When the named concept is on the right the axiom is
/// a GCI (general concept inclusion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxiomRepresentation {
    /// `SubClassOf` is primitive, `EquivalentClasses` is not.
    pub primitive: bool,
    pub left_hand_concept: Option<u64>,
    pub left_hand_relationships: Option<OwlGroups>,
    pub right_hand_concept: Option<u64>,
    pub right_hand_relationships: Option<OwlGroups>,
}

impl AxiomRepresentation {
    /// Ordinary axiom for a named concept.
    pub fn named(concept: u64, primitive: bool, groups: OwlGroups) -> Self {
        Self {
            primitive,
            left_hand_concept: Some(concept),
            left_hand_relationships: None,
            right_hand_concept: None,
            right_hand_relationships: Some(groups),
        }
    }

    /// GCI axiom: the anonymous class expression implies `concept`.
    pub fn gci(concept: u64, groups: OwlGroups) -> Self {
        Self {
            primitive: true,
            left_hand_concept: None,
            left_hand_relationships: Some(groups),
            right_hand_concept: Some(concept),
            right_hand_relationships: None,
        }
    }

    pub fn is_gci(&self) -> bool {
        self.left_hand_concept.is_none() && self.right_hand_concept.is_some()
    }

    /// The named concept this axiom is about, whichever side it sits on.
    pub fn named_concept(&self) -> Option<u64> {
        self.left_hand_concept.or(self.right_hand_concept)
    }

    /// The grouped relationships of the anonymous side.
    pub fn relationships_by_group(&self) -> &OwlGroups {
        static EMPTY: OwlGroups = BTreeMap::new();
        self.right_hand_relationships
            .as_ref()
            .or(self.left_hand_relationships.as_ref())
            .unwrap_or(&EMPTY)
    }
}

/// Object/data property axioms. These never yield relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyAxiom {
    SubObjectPropertyOf { sub: u64, sup: u64 },
    SubDataPropertyOf { sub: u64, sup: u64 },
    TransitiveObjectProperty(u64),
    ReflexiveObjectProperty(u64),
    PropertyChain { chain: Vec<u64>, sup: u64 },
}

/// A parsed axiom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwlAxiom {
    Class(AxiomRepresentation),
    Property(PropertyAxiom),
}

/// Convert an OWL class axiom to its grouped-relationship representation.
pub fn expression_to_relationships(owl: &str) -> Result<AxiomRepresentation, OwlError> {
    match parse_axiom(owl)? {
        OwlAxiom::Class(rep) => Ok(rep),
        OwlAxiom::Property(_) => Err(OwlError::NotAClassAxiom {
            expression: owl.to_string(),
        }),
    }
}

/// Inverse of [`expression_to_relationships`] for an ordinary named-concept axiom.
pub fn relationships_to_expression(
    concept: u64,
    primitive: bool,
    groups: &OwlGroups,
) -> Result<String, OwlError> {
    render_class_axiom(&AxiomRepresentation::named(concept, primitive, groups.clone()))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwlError {
    #[error("unable to parse OWL expression `{expression}`: {message}")]
    Syntax { expression: String, message: String },
    #[error("unsupported OWL construct in `{expression}`: {message}")]
    Unsupported { expression: String, message: String },
    #[error("invalid {value_type} literal `{lexical}`")]
    InvalidLiteral {
        value_type: ValueType,
        lexical: String,
    },
    #[error("expression is a property axiom, not a class axiom: `{expression}`")]
    NotAClassAxiom { expression: String },
    #[error("cannot render an axiom for {concept} without relationships")]
    Empty { concept: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_literal_keeps_lexical_form() {
        let v = OwlValue::from_lexical(ValueType::Decimal, "1.50").unwrap();
        assert_eq!(v, OwlValue::Decimal("1.50".to_string()));
        assert_eq!(v.lexical(), "1.50");
    }

    #[test]
    fn invalid_literals_are_rejected() {
        assert!(OwlValue::from_lexical(ValueType::Integer, "1.5").is_err());
        assert!(OwlValue::from_lexical(ValueType::Decimal, "abc").is_err());
        assert!(OwlValue::from_lexical(ValueType::Decimal, "1.").is_err());
    }

    #[test]
    fn gci_detection_uses_side_of_named_concept() {
        let mut groups = OwlGroups::new();
        groups.insert(0, vec![OwlRelationship::is_a(200009)]);
        let named = AxiomRepresentation::named(100005, true, groups.clone());
        let gci = AxiomRepresentation::gci(100005, groups);
        assert!(!named.is_gci());
        assert!(gci.is_gci());
        assert_eq!(named.named_concept(), Some(100005));
        assert_eq!(gci.named_concept(), Some(100005));
        assert_eq!(gci.relationships_by_group().len(), 1);
    }
}
