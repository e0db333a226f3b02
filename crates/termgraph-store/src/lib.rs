//! Termgraph store: the in-memory concept graph.
//!
//! Concepts live in an arena keyed by numeric id. Everything else
//! (parent/child adjacency, component ownership, association targets, term
//! lookups) is an index table of ids maintained alongside it:
//!
//! - [`GraphStore`]: lookup-or-create storage plus the index tables
//! - [`axiom_sync`]: OWL axiom entries <-> stated relationships
//! - [`HierarchyCaches`]: memoised ancestor/descendant traversals
//! - [`TransitiveClosure`]: parallel, detached closure snapshots
//!
//! Concept sets are [`roaring::RoaringTreemap`]s so that unions and
//! intersections over large hierarchies stay cheap.

pub mod axiom_sync;
mod cache;
mod closure;
mod error;
mod hierarchy;
pub mod identifier;
pub mod model;
mod owner;
mod store;
mod time;
pub mod wellknown;

pub use cache::{HierarchyCache, HierarchyCaches, HierarchySet, Traversal};
pub use closure::{ClosureDelta, ClosureHistory, TransitiveClosure};
pub use error::{ConversionError, GraphError};
pub use identifier::{IdentifierPolicy, Partition};
pub use model::{
    AlternateIdentifier, Axiom, AxiomEntry, CharacteristicType, ComponentMeta, Concept,
    ConcreteValue, DefinitionStatus, Description, DuplicatePair, LangRefsetEntry, MemberKind,
    PropertyAxiomRecord, RefsetMember, Relationship, RelationshipTarget,
};
pub use owner::ComponentRef;
pub use store::{GraphStore, StoreSettings, ASSOCIATION_TARGET_FIELD, DEFAULT_MAX_DEPTH};
pub use time::EffectiveTime;

/// Numeric concept identifier.
pub type ConceptId = u64;

/// A set of concept ids.
pub type ConceptSet = roaring::RoaringTreemap;
