//! Memoised hierarchy traversals.
//!
//! Each cache memoises one traversal (ancestors or descendants, in one
//! characteristic-type view) per concept. Entries are immutable once
//! computed; callers asking for a mutable set get their own copy.

use ahash::AHashMap;
use parking_lot::RwLock;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

use crate::{CharacteristicType, ConceptId, ConceptSet, GraphError, GraphStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Traversal {
    Ancestors,
    Descendants,
}

/// Either a shared read-only view of a cached set or a private copy.
#[derive(Debug, Clone)]
pub enum HierarchySet {
    Shared(Arc<ConceptSet>),
    Owned(ConceptSet),
}

impl HierarchySet {
    pub fn into_owned(self) -> ConceptSet {
        match self {
            HierarchySet::Shared(set) => Arc::try_unwrap(set).unwrap_or_else(|shared| (*shared).clone()),
            HierarchySet::Owned(set) => set,
        }
    }
}

impl Deref for HierarchySet {
    type Target = ConceptSet;

    fn deref(&self) -> &ConceptSet {
        match self {
            HierarchySet::Shared(set) => set,
            HierarchySet::Owned(set) => set,
        }
    }
}

impl PartialEq for HierarchySet {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

pub struct HierarchyCache {
    traversal: Traversal,
    ct: CharacteristicType,
    entries: RwLock<AHashMap<ConceptId, Arc<ConceptSet>>>,
}

impl HierarchyCache {
    pub fn new(traversal: Traversal, ct: CharacteristicType) -> Self {
        Self {
            traversal,
            ct,
            entries: RwLock::new(AHashMap::new()),
        }
    }

    pub fn traversal(&self) -> Traversal {
        self.traversal
    }

    pub fn characteristic_type(&self) -> CharacteristicType {
        self.ct
    }

    /// Memoised traversal result. With `mutable` the caller gets a copy it
    /// may change freely.
    pub fn get(&self, store: &GraphStore, id: ConceptId, mutable: bool) -> Result<HierarchySet, GraphError> {
        let shared = self.lookup(store, id)?;
        Ok(if mutable {
            HierarchySet::Owned((*shared).clone())
        } else {
            HierarchySet::Shared(shared)
        })
    }

    /// As [`get`](Self::get), always a private copy that includes `id`.
    pub fn get_or_self(&self, store: &GraphStore, id: ConceptId) -> Result<ConceptSet, GraphError> {
        let mut set = (*self.lookup(store, id)?).clone();
        set.insert(id);
        Ok(set)
    }

    fn lookup(&self, store: &GraphStore, id: ConceptId) -> Result<Arc<ConceptSet>, GraphError> {
        if self.traversal == Traversal::Descendants {
            let concept = store.get_checked(id)?;
            if !concept.is_active() {
                return Err(GraphError::InactiveConceptQuery(id));
            }
        }
        if let Some(hit) = self.entries.read().get(&id).cloned() {
            return Ok(hit);
        }
        let computed = Arc::new(match self.traversal {
            Traversal::Ancestors => store.ancestors(id, self.ct)?,
            Traversal::Descendants => store.descendants(id, self.ct)?,
        });
        Ok(self
            .entries
            .write()
            .entry(id)
            .or_insert(computed)
            .clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Forget every entry. Nothing is recomputed until the next lookup.
    pub fn reset(&self) {
        self.entries.write().clear();
    }
}

/// The four caches: ancestors/descendants in stated and inferred views.
pub struct HierarchyCaches {
    ancestors_inferred: HierarchyCache,
    ancestors_stated: HierarchyCache,
    descendants_inferred: HierarchyCache,
    descendants_stated: HierarchyCache,
}

impl Default for HierarchyCaches {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyCaches {
    pub fn new() -> Self {
        Self {
            ancestors_inferred: HierarchyCache::new(Traversal::Ancestors, CharacteristicType::Inferred),
            ancestors_stated: HierarchyCache::new(Traversal::Ancestors, CharacteristicType::Stated),
            descendants_inferred: HierarchyCache::new(Traversal::Descendants, CharacteristicType::Inferred),
            descendants_stated: HierarchyCache::new(Traversal::Descendants, CharacteristicType::Stated),
        }
    }

    /// Any view other than stated reads the inferred hierarchy.
    pub fn ancestors(&self, ct: CharacteristicType) -> &HierarchyCache {
        match ct {
            CharacteristicType::Stated => &self.ancestors_stated,
            _ => &self.ancestors_inferred,
        }
    }

    pub fn descendants(&self, ct: CharacteristicType) -> &HierarchyCache {
        match ct {
            CharacteristicType::Stated => &self.descendants_stated,
            _ => &self.descendants_inferred,
        }
    }

    pub fn reset_all(&self) {
        for cache in [
            &self.ancestors_inferred,
            &self.ancestors_stated,
            &self.descendants_inferred,
            &self.descendants_stated,
        ] {
            cache.reset();
        }
        debug!("hierarchy caches reset");
    }
}
