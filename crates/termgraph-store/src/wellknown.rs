//! Metadata concept identifiers referenced by the loader and queries.

use crate::ConceptId;

pub const ROOT_CONCEPT: ConceptId = 138_875_005;
pub const IS_A: ConceptId = termgraph_owl::IS_A;
pub const CONCEPT_MODEL_ATTRIBUTE: ConceptId = 410_662_002;
pub const ROLE_GROUP: ConceptId = termgraph_owl::ROLE_GROUP;

pub const STATED_RELATIONSHIP: ConceptId = 900_000_000_000_010_007;
pub const INFERRED_RELATIONSHIP: ConceptId = 900_000_000_000_011_006;
pub const ADDITIONAL_RELATIONSHIP: ConceptId = 900_000_000_000_227_009;
pub const QUALIFYING_RELATIONSHIP: ConceptId = 900_000_000_000_225_001;

pub const PRIMITIVE: ConceptId = 900_000_000_000_074_008;
pub const FULLY_DEFINED: ConceptId = 900_000_000_000_073_002;

pub const FSN: ConceptId = 900_000_000_000_003_001;
pub const SYNONYM: ConceptId = 900_000_000_000_013_009;

pub const PREFERRED: ConceptId = 900_000_000_000_548_007;
pub const ACCEPTABLE: ConceptId = 900_000_000_000_549_004;

pub const US_ENGLISH_LANG_REFSET: ConceptId = 900_000_000_000_509_007;
pub const GB_ENGLISH_LANG_REFSET: ConceptId = 900_000_000_000_508_004;

pub const OWL_AXIOM_REFSET: ConceptId = 733_073_007;
pub const OWL_ONTOLOGY_REFSET: ConceptId = 762_103_008;

pub const EXISTENTIAL_MODIFIER: ConceptId = 900_000_000_000_451_002;

/// Concepts present in every freshly constructed or reset store.
pub const SEEDED: [(ConceptId, &str); 3] = [
    (ROOT_CONCEPT, "SNOMED CT Concept (SNOMED RT+CTV3)"),
    (IS_A, "Is a (attribute)"),
    (CONCEPT_MODEL_ATTRIBUTE, "Concept model attribute (attribute)"),
];
