//! Transitive closure: a flat id -> ancestor/descendant index detached from
//! the live store.

use ahash::AHashMap;
use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::info;

use crate::{CharacteristicType, ConceptId, ConceptSet, GraphError, GraphStore};

/// Immutable snapshot of one closure generation.
#[derive(Debug, Clone, Default)]
pub struct TransitiveClosure {
    characteristic_type: Option<CharacteristicType>,
    ancestors: AHashMap<ConceptId, ConceptSet>,
    descendants: AHashMap<ConceptId, ConceptSet>,
}

/// Pairs (descendant, ancestor) that differ between two closures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureDelta {
    pub added: BTreeSet<(ConceptId, ConceptId)>,
    pub removed: BTreeSet<(ConceptId, ConceptId)>,
}

impl ClosureDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl TransitiveClosure {
    /// Compute the closure for every concept in parallel.
    ///
    /// Each worker owns the ancestor computation for its concepts; results
    /// meet only in the concurrent maps, where each key is written by
    /// exactly one concept (ancestors) or merged per key (descendants).
    pub fn generate(store: &GraphStore, ct: CharacteristicType) -> Result<Self, GraphError> {
        let started = Instant::now();
        let ids: Vec<ConceptId> = store.all_concepts().map(|c| c.id).collect();
        let ancestors: DashMap<ConceptId, ConceptSet> = DashMap::with_capacity(ids.len());
        let descendants: DashMap<ConceptId, ConceptSet> = DashMap::new();

        ids.par_iter().try_for_each(|&id| -> Result<(), GraphError> {
            let up = store.ancestors(id, ct)?;
            for ancestor in up.iter() {
                descendants.entry(ancestor).or_default().insert(id);
            }
            ancestors.insert(id, up);
            Ok(())
        })?;

        let closure = Self {
            characteristic_type: Some(ct),
            ancestors: ancestors.into_iter().collect(),
            descendants: descendants.into_iter().collect(),
        };
        info!(
            characteristic_type = %ct,
            concepts = closure.ancestors.len(),
            size = closure.size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "transitive closure generated"
        );
        Ok(closure)
    }

    pub fn characteristic_type(&self) -> Option<CharacteristicType> {
        self.characteristic_type
    }

    pub fn ancestors(&self, id: ConceptId) -> Option<&ConceptSet> {
        self.ancestors.get(&id)
    }

    pub fn descendants(&self, id: ConceptId) -> Option<&ConceptSet> {
        self.descendants.get(&id)
    }

    pub fn contains(&self, id: ConceptId) -> bool {
        self.ancestors.contains_key(&id)
    }

    pub fn is_descendant_of(&self, id: ConceptId, ancestor: ConceptId) -> bool {
        self.ancestors.get(&id).is_some_and(|a| a.contains(ancestor))
    }

    /// Sum of all descendant-set sizes.
    pub fn size(&self) -> u64 {
        self.descendants.values().map(|d| d.len()).sum()
    }

    /// Changes from `previous` to `self`.
    pub fn diff(&self, previous: &TransitiveClosure) -> ClosureDelta {
        let mut delta = ClosureDelta::default();
        for (id, current) in &self.ancestors {
            let before = previous.ancestors.get(id);
            for a in current.iter() {
                if !before.is_some_and(|b| b.contains(a)) {
                    delta.added.insert((*id, a));
                }
            }
        }
        for (id, before) in &previous.ancestors {
            let current = self.ancestors.get(id);
            for a in before.iter() {
                if !current.is_some_and(|c| c.contains(a)) {
                    delta.removed.insert((*id, a));
                }
            }
        }
        delta
    }
}

/// Current and previous closure generations. They are never merged.
#[derive(Debug, Default)]
pub struct ClosureHistory {
    current: Option<TransitiveClosure>,
    previous: Option<TransitiveClosure>,
}

impl ClosureHistory {
    /// Install a new generation, retaining the old one as previous.
    pub fn advance(&mut self, next: TransitiveClosure) {
        self.previous = self.current.replace(next);
    }

    pub fn current(&self) -> Option<&TransitiveClosure> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&TransitiveClosure> {
        self.previous.as_ref()
    }

    pub fn delta(&self) -> Option<ClosureDelta> {
        Some(self.current.as_ref()?.diff(self.previous.as_ref()?))
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.previous = None;
    }
}
