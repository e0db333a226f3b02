//! Per-(branch, characteristic type) expression resolvers.

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use termgraph_store::wellknown::ROOT_CONCEPT;
use termgraph_store::{CharacteristicType, ConceptId, ConceptSet, GraphStore, HierarchyCaches};
use tracing::{debug, warn};

use crate::expr::{is_simple, normalize, split_top_level_or, LocalExpr};
use crate::{EclError, RemoteEclClient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EclSettings {
    /// The store must hold more concepts than this to answer locally.
    pub local_threshold: usize,
    pub page_size: usize,
}

impl Default for EclSettings {
    fn default() -> Self {
        Self {
            local_threshold: 100,
            page_size: 10_000,
        }
    }
}

/// What a resolution needs to read.
#[derive(Clone, Copy)]
pub struct EclContext<'a> {
    pub store: &'a GraphStore,
    pub caches: &'a HierarchyCaches,
    pub remote: &'a dyn RemoteEclClient,
}

#[derive(Debug, Clone)]
struct CachedExpansion {
    concepts: Arc<ConceptSet>,
    /// Store generation the entry was last checked against.
    generation: u64,
}

/// Expression resolver for one branch and characteristic type.
///
/// Cached expansions are shared as `Arc`s; callers wanting to modify a
/// result clone it first.
pub struct EclResolver {
    branch: String,
    characteristic_type: CharacteristicType,
    settings: EclSettings,
    cache: RwLock<AHashMap<String, CachedExpansion>>,
    /// Remote results the local store does not hold, with the remote FSN.
    placeholders: RwLock<AHashMap<ConceptId, Option<String>>>,
}

impl EclResolver {
    pub fn new(branch: impl Into<String>, characteristic_type: CharacteristicType, settings: EclSettings) -> Self {
        Self {
            branch: branch.into(),
            characteristic_type,
            settings,
            cache: RwLock::new(AHashMap::new()),
            placeholders: RwLock::new(AHashMap::new()),
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn characteristic_type(&self) -> CharacteristicType {
        self.characteristic_type
    }

    pub fn settings(&self) -> &EclSettings {
        &self.settings
    }

    /// Resolve an expression to the set of concept ids it selects.
    pub fn resolve(&self, ctx: &EclContext<'_>, expr: &str) -> Result<Arc<ConceptSet>, EclError> {
        let key = normalize(expr);
        if key.is_empty() {
            return Err(EclError::Invalid {
                expression: expr.to_string(),
                message: "empty expression".to_string(),
            });
        }
        if let Some(hit) = self.cache_hit(ctx.store, &key) {
            return Ok(hit);
        }

        let branches = split_top_level_or(&key);
        let resolved = if branches.len() > 1 {
            let mut union = ConceptSet::new();
            for branch in &branches {
                union |= &*self.resolve(ctx, branch)?;
            }
            union
        } else {
            match LocalExpr::parse(&key).filter(|_| self.serves_locally(ctx.store, &key)) {
                Some(local) => self.resolve_local(ctx, local)?,
                None => self.resolve_remote(ctx, &key)?,
            }
        };

        let resolved = Arc::new(resolved);
        if resolved.is_empty() {
            warn!(
                expression = %key,
                branch = %self.branch,
                characteristic_type = %self.characteristic_type,
                "ECL resolved to no concepts; not caching"
            );
        } else {
            self.cache.write().insert(
                key,
                CachedExpansion {
                    concepts: Arc::clone(&resolved),
                    generation: ctx.store.generation(),
                },
            );
        }
        Ok(resolved)
    }

    fn serves_locally(&self, store: &GraphStore, expr: &str) -> bool {
        is_simple(expr) && store.len() > self.settings.local_threshold
    }

    /// Cached expansion, refreshing placeholders when the store has been
    /// rebuilt since the entry was stored.
    fn cache_hit(&self, store: &GraphStore, key: &str) -> Option<Arc<ConceptSet>> {
        let hit = self.cache.read().get(key).cloned()?;
        if hit.generation != store.generation() {
            let refreshed = self.refresh_placeholders(store);
            if refreshed > 0 {
                debug!(expression = key, refreshed, "placeholders now held locally");
            }
            if let Some(entry) = self.cache.write().get_mut(key) {
                entry.generation = store.generation();
            }
        }
        Some(hit.concepts)
    }

    /// Drop placeholders the store now holds. Returns how many were dropped.
    pub fn refresh_placeholders(&self, store: &GraphStore) -> usize {
        let mut placeholders = self.placeholders.write();
        let before = placeholders.len();
        placeholders.retain(|id, _| !store.contains(*id));
        before - placeholders.len()
    }

    fn resolve_local(&self, ctx: &EclContext<'_>, expr: LocalExpr) -> Result<ConceptSet, EclError> {
        let ct = self.characteristic_type;
        let store = ctx.store;
        let set = match expr {
            LocalExpr::Any | LocalExpr::DescendantsOrSelf(ROOT_CONCEPT) => store.concept_ids(),
            LocalExpr::Concept(id) => {
                store.get_checked(id)?;
                let mut one = ConceptSet::new();
                one.insert(id);
                one
            }
            LocalExpr::Descendants(id) => ctx.caches.descendants(ct).get(store, id, false)?.into_owned(),
            LocalExpr::DescendantsOrSelf(id) => ctx.caches.descendants(ct).get_or_self(store, id)?,
            LocalExpr::Ancestors(id) => ctx.caches.ancestors(ct).get(store, id, false)?.into_owned(),
            LocalExpr::AncestorsOrSelf(id) => ctx.caches.ancestors(ct).get_or_self(store, id)?,
            LocalExpr::Children(id) => store.children(id, ct)?,
            LocalExpr::Parents(id) => store.parents(id, ct)?,
        };
        Ok(set)
    }

    /// Page through the remote expansion. Nothing is recorded unless every
    /// page arrives.
    fn resolve_remote(&self, ctx: &EclContext<'_>, expr: &str) -> Result<ConceptSet, EclError> {
        let mut concepts = ConceptSet::new();
        let mut missing: Vec<(ConceptId, Option<String>)> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut retrieved = 0usize;
        loop {
            let page = ctx.remote.query(
                expr,
                &self.branch,
                self.characteristic_type,
                cursor.as_deref(),
                self.settings.page_size,
            )?;
            debug!(
                expression = expr,
                branch = %self.branch,
                items = page.items.len(),
                total = page.total,
                "fetched ECL page"
            );
            let count = page.items.len();
            for item in page.items {
                if concepts.insert(item.id) && !ctx.store.contains(item.id) {
                    missing.push((item.id, item.fsn));
                }
            }
            retrieved += count;
            if retrieved >= page.total {
                break;
            }
            if count == 0 {
                return Err(EclError::protocol(
                    expr,
                    format!("empty page after {retrieved} of {} items", page.total),
                ));
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    return Err(EclError::protocol(
                        expr,
                        format!("missing cursor after {retrieved} of {} items", page.total),
                    ))
                }
            }
        }
        if !missing.is_empty() {
            self.placeholders.write().extend(missing);
        }
        Ok(concepts)
    }

    pub fn cached(&self, expr: &str) -> Option<Arc<ConceptSet>> {
        self.cache.read().get(&normalize(expr)).map(|e| Arc::clone(&e.concepts))
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn placeholder(&self, id: ConceptId) -> Option<Option<String>> {
        self.placeholders.read().get(&id).cloned()
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.read().len()
    }

    /// Forget all expansions and placeholders.
    pub fn reset(&self) {
        self.cache.write().clear();
        self.placeholders.write().clear();
    }
}

/// One resolver per (branch, characteristic type), created on first use.
#[derive(Default)]
pub struct EclResolvers {
    settings: EclSettings,
    resolvers: RwLock<AHashMap<(String, CharacteristicType), Arc<EclResolver>>>,
}

impl EclResolvers {
    pub fn new(settings: EclSettings) -> Self {
        Self {
            settings,
            resolvers: RwLock::new(AHashMap::new()),
        }
    }

    pub fn resolver(&self, branch: &str, characteristic_type: CharacteristicType) -> Arc<EclResolver> {
        let key = (branch.to_string(), characteristic_type);
        let existing = self.resolvers.read().get(&key).cloned();
        if let Some(existing) = existing {
            return existing;
        }
        self.resolvers
            .write()
            .entry(key)
            .or_insert_with(|| Arc::new(EclResolver::new(branch, characteristic_type, self.settings.clone())))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.resolvers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.read().is_empty()
    }

    pub fn reset_all(&self) {
        for resolver in self.resolvers.read().values() {
            resolver.reset();
        }
        debug!("ECL caches reset");
    }
}
