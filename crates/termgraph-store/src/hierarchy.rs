//! Hierarchy traversal over the live store.

use ahash::AHashMap;

use crate::{CharacteristicType, ConceptId, ConceptSet, GraphError, GraphStore};

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl GraphStore {
    pub fn parents(&self, id: ConceptId, ct: CharacteristicType) -> Result<ConceptSet, GraphError> {
        Ok(self.get_checked(id)?.parents(ct).iter().copied().collect())
    }

    pub fn children(&self, id: ConceptId, ct: CharacteristicType) -> Result<ConceptSet, GraphError> {
        Ok(self.get_checked(id)?.children(ct).iter().copied().collect())
    }

    /// All transitive parents of `id`, excluding `id` itself.
    pub fn ancestors(&self, id: ConceptId, ct: CharacteristicType) -> Result<ConceptSet, GraphError> {
        self.reach(id, ct, Direction::Up)
    }

    /// All transitive children of `id`, excluding `id` itself.
    pub fn descendants(&self, id: ConceptId, ct: CharacteristicType) -> Result<ConceptSet, GraphError> {
        self.reach(id, ct, Direction::Down)
    }

    pub fn ancestors_or_self(&self, id: ConceptId, ct: CharacteristicType) -> Result<ConceptSet, GraphError> {
        let mut set = self.ancestors(id, ct)?;
        set.insert(id);
        Ok(set)
    }

    pub fn descendants_or_self(&self, id: ConceptId, ct: CharacteristicType) -> Result<ConceptSet, GraphError> {
        let mut set = self.descendants(id, ct)?;
        set.insert(id);
        Ok(set)
    }

    /// Depth-first walk. Reaching the start again, or walking a path longer
    /// than the depth limit, means the hierarchy is cyclic or malformed.
    fn reach(&self, id: ConceptId, ct: CharacteristicType, direction: Direction) -> Result<ConceptSet, GraphError> {
        let limit = self.max_depth();
        self.get_checked(id)?;

        let mut seen = ConceptSet::new();
        let mut stack: Vec<(ConceptId, usize)> = vec![(id, 0)];
        while let Some((current, depth)) = stack.pop() {
            if depth > limit {
                return Err(GraphError::DepthExceeded { concept: current, limit });
            }
            let Some(concept) = self.get(current) else {
                continue;
            };
            let next = match direction {
                Direction::Up => concept.parents(ct),
                Direction::Down => concept.children(ct),
            };
            for &n in next {
                if n == id {
                    return Err(GraphError::DepthExceeded { concept: id, limit });
                }
                if seen.insert(n) {
                    stack.push((n, depth + 1));
                }
            }
        }
        Ok(seen)
    }

    /// Length of the longest IS-A path from `id` up to a top concept, added
    /// to the starting `depth`. Exceeding the configured limit fails.
    pub fn hierarchy_depth(&self, id: ConceptId, ct: CharacteristicType, depth: usize) -> Result<usize, GraphError> {
        let mut memo = AHashMap::new();
        self.height(id, ct, depth, &mut memo)
            .map(|height| depth + height)
    }

    fn height(
        &self,
        id: ConceptId,
        ct: CharacteristicType,
        depth: usize,
        memo: &mut AHashMap<ConceptId, usize>,
    ) -> Result<usize, GraphError> {
        let limit = self.max_depth();
        if depth > limit {
            return Err(GraphError::DepthExceeded { concept: id, limit });
        }
        if let Some(&h) = memo.get(&id) {
            return Ok(h);
        }
        let mut height = 0;
        for &parent in self.get_checked(id)?.parents(ct) {
            height = height.max(1 + self.height(parent, ct, depth + 1, memo)?);
        }
        memo.insert(id, height);
        Ok(height)
    }
}
