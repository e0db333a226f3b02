//! Effective-time merge rules shared by every RF2 component type.

use termgraph_store::{
    AlternateIdentifier, AxiomEntry, ComponentMeta, DefinitionStatus, Description,
    LangRefsetEntry, RefsetMember, Relationship,
};

use crate::{LoadOptions, LoadStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// No prior state; the row becomes the initial state.
    Initial,
    /// Older-or-equal than a released held value.
    Superseded,
    Apply,
}

/// Decide what an incoming row does to the held state.
///
/// A released held value is never overwritten by a row with an older or
/// equal effective time, except that an inactivation dated the same day as
/// the held active row wins.
pub fn decide(held: Option<&ComponentMeta>, incoming: &ComponentMeta) -> MergeDecision {
    let Some(held) = held else {
        return MergeDecision::Initial;
    };
    if held.is_released() {
        if let (Some(held_time), Some(incoming_time)) = (held.effective_time, incoming.effective_time) {
            if incoming_time < held_time {
                return MergeDecision::Superseded;
            }
            if incoming_time == held_time && !(held.active && !incoming.active) {
                return MergeDecision::Superseded;
            }
        }
    }
    MergeDecision::Apply
}

/// An RF2 component the merge rules can be applied to.
pub trait Rf2Component: Clone {
    fn meta(&self) -> &ComponentMeta;
    fn meta_mut(&mut self) -> &mut ComponentMeta;

    /// Field equality ignoring effective time and bookkeeping flags.
    fn same_content(&self, other: &Self) -> bool;

    /// Carry over state the row itself does not supply.
    fn absorb(&mut self, _held: &Self) {}
}

fn same_row_meta(a: &ComponentMeta, b: &ComponentMeta) -> bool {
    a.active == b.active && a.module_id == b.module_id
}

/// Merge an incoming row with the held state. Returns the state to store,
/// or `None` when the row is skipped.
pub fn merge<C: Rf2Component>(held: Option<&C>, mut incoming: C, options: &LoadOptions, stats: &mut LoadStats) -> Option<C> {
    match decide(held.map(|h| h.meta()), incoming.meta()) {
        MergeDecision::Initial => {
            incoming.meta_mut().released = options.released;
            stats.applied += 1;
            Some(incoming)
        }
        MergeDecision::Superseded => {
            stats.superseded += 1;
            None
        }
        MergeDecision::Apply => {
            let held = held?;
            if options.delta
                && options.detect_no_change_deltas
                && incoming.same_content(held)
                && incoming.meta().effective_time != held.meta().effective_time
            {
                // Republished without change: keep the prior effective time.
                let mut kept = held.clone();
                kept.meta_mut().dirty = true;
                kept.meta_mut().recover_effective_time = true;
                stats.no_change_deltas += 1;
                return Some(kept);
            }
            incoming.absorb(held);
            incoming.meta_mut().released = held.meta().released.or(options.released);
            stats.applied += 1;
            Some(incoming)
        }
    }
}

// ============================================================================
// Component impls
// ============================================================================

/// The RF2 columns of a concept row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptRow {
    pub meta: ComponentMeta,
    pub definition_status: DefinitionStatus,
}

impl Rf2Component for ConceptRow {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }
    fn same_content(&self, other: &Self) -> bool {
        same_row_meta(&self.meta, &other.meta) && self.definition_status == other.definition_status
    }
}

impl Rf2Component for Description {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }
    fn same_content(&self, other: &Self) -> bool {
        same_row_meta(&self.meta, &other.meta)
            && self.concept_id == other.concept_id
            && self.language_code == other.language_code
            && self.type_id == other.type_id
            && self.term == other.term
            && self.case_significance_id == other.case_significance_id
    }
    fn absorb(&mut self, held: &Self) {
        self.language_members = held.language_members.clone();
        self.acceptability = held.acceptability.clone();
    }
}

impl Rf2Component for Relationship {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }
    fn same_content(&self, other: &Self) -> bool {
        same_row_meta(&self.meta, &other.meta)
            && self.source_id == other.source_id
            && self.type_id == other.type_id
            && self.target == other.target
            && self.group == other.group
            && self.characteristic_type == other.characteristic_type
            && self.modifier_id == other.modifier_id
    }
    fn absorb(&mut self, held: &Self) {
        if self.axiom_entry_id.is_none() {
            self.axiom_entry_id = held.axiom_entry_id;
        }
    }
}

impl Rf2Component for AxiomEntry {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }
    fn same_content(&self, other: &Self) -> bool {
        same_row_meta(&self.meta, &other.meta)
            && self.refset_id == other.refset_id
            && self.referenced_component_id == other.referenced_component_id
            && self.owl_expression == other.owl_expression
    }
}

impl Rf2Component for LangRefsetEntry {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }
    fn same_content(&self, other: &Self) -> bool {
        same_row_meta(&self.meta, &other.meta)
            && self.refset_id == other.refset_id
            && self.description_id == other.description_id
            && self.acceptability_id == other.acceptability_id
    }
}

impl Rf2Component for RefsetMember {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }
    fn same_content(&self, other: &Self) -> bool {
        same_row_meta(&self.meta, &other.meta)
            && self.refset_id == other.refset_id
            && self.referenced_component_id == other.referenced_component_id
            && self.fields == other.fields
    }
}

impl Rf2Component for AlternateIdentifier {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }
    fn same_content(&self, other: &Self) -> bool {
        same_row_meta(&self.meta, &other.meta)
            && self.alternate_identifier == other.alternate_identifier
            && self.identifier_scheme_id == other.identifier_scheme_id
            && self.referenced_component_id == other.referenced_component_id
    }
}
