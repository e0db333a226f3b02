//! One entry point per RF2 file type.

use ahash::AHashSet;
use std::collections::BTreeMap;
use std::io::BufRead;
use termgraph_owl::{is_class_axiom, parse_axiom, OwlAxiom};
use termgraph_store::axiom_sync::{axiom_to_relationships, reconcile_axiom};
use termgraph_store::identifier::partition_of;
use termgraph_store::wellknown::OWL_AXIOM_REFSET;
use termgraph_store::{
    AlternateIdentifier, AxiomEntry, CharacteristicType, ComponentMeta, Concept, ConcreteValue,
    DefinitionStatus, Description, DuplicatePair, GraphStore, LangRefsetEntry, MemberKind,
    Partition, PropertyAxiomRecord, RefsetMember, Relationship, RelationshipTarget,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::merge::{merge, ConceptRow};
use crate::rows::read_rows;
use crate::{LoadError, LoadOptions, LoadStats, Rf2FileKind};

/// Applies RF2 streams to a store.
///
/// Files must be fed snapshot first, then deltas oldest to newest; merge
/// rules only look backwards in time. A failed file leaves the store
/// partially updated and the caller must discard it.
pub struct Rf2Loader<'s> {
    store: &'s mut GraphStore,
    options: LoadOptions,
    /// Language members seen in the language file being loaded.
    seen_language: AHashSet<Uuid>,
}

/// Held concept state, if a concept row has ever been applied.
fn concept_row(concept: &Concept) -> Option<ConceptRow> {
    let meta = &concept.meta;
    if meta.effective_time.is_none() && meta.released.is_none() && meta.module_id == 0 {
        return None;
    }
    Some(ConceptRow {
        meta: meta.clone(),
        definition_status: concept.definition_status,
    })
}

/// True when a refset row references a description or relationship the
/// store does not hold.
fn is_orphan(store: &GraphStore, referenced: u64) -> bool {
    match partition_of(referenced) {
        Some(Partition::Description) => store.description_owner(referenced).is_none(),
        Some(Partition::Relationship) => store.relationship_owner(referenced).is_none(),
        _ => false,
    }
}

/// Whether an incoming language member replaces the one currently deciding
/// acceptability for the same description and dialect.
fn incoming_wins(held: &ComponentMeta, incoming: &ComponentMeta) -> bool {
    match (held.effective_time, incoming.effective_time) {
        (Some(h), Some(i)) => i > h || (i == h && incoming.active),
        (_, None) => true,
        (None, Some(_)) => false,
    }
}

impl<'s> Rf2Loader<'s> {
    pub fn new(store: &'s mut GraphStore, options: LoadOptions) -> Self {
        Self {
            store,
            options,
            seen_language: AHashSet::new(),
        }
    }

    pub fn store(&self) -> &GraphStore {
        self.store
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Dispatch a stream to the entry point for its file kind.
    pub fn load<R: BufRead>(&mut self, kind: Rf2FileKind, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        match kind {
            Rf2FileKind::Concepts => self.load_concepts(file, reader),
            Rf2FileKind::Descriptions => self.load_descriptions(file, reader),
            Rf2FileKind::Relationships | Rf2FileKind::ConcreteRelationships => {
                self.load_relationships(file, reader)
            }
            Rf2FileKind::Axioms => self.load_axioms(file, reader),
            Rf2FileKind::Language => self.load_language_refset(file, reader),
            Rf2FileKind::InactivationIndicators => self.load_inactivation_indicators(file, reader),
            Rf2FileKind::Associations => self.load_historical_associations(file, reader),
            Rf2FileKind::Annotations => self.load_annotations(file, reader),
            Rf2FileKind::ModuleDependencies => self.load_module_dependencies(file, reader),
            Rf2FileKind::AlternateIdentifiers => self.load_alternate_identifiers(file, reader),
        }
    }

    fn finish(&self, file: &str, kind: &str, stats: LoadStats) -> LoadStats {
        info!(
            file,
            kind,
            rows = stats.rows,
            applied = stats.applied,
            superseded = stats.superseded,
            "RF2 file loaded"
        );
        stats
    }

    /// `id effectiveTime active moduleId definitionStatusId`
    pub fn load_concepts<R: BufRead>(&mut self, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        let mut stats = LoadStats::default();
        let Self { store, options, .. } = self;
        let rows = read_rows(file, reader, 5, |row| {
            let id = row.sctid(store, 0, Partition::Concept)?;
            let definition_status = DefinitionStatus::from_sctid(row.u64(4)?)
                .ok_or_else(|| row.invalid(4, "unknown definition status"))?;
            let incoming = ConceptRow {
                meta: row.meta()?,
                definition_status,
            };
            let held = store.get(id).and_then(concept_row);
            if let Some(merged) = merge(held.as_ref(), incoming, options, &mut stats) {
                let concept = store.get_or_create(id)?;
                concept.meta = merged.meta;
                concept.definition_status = merged.definition_status;
            }
            Ok(())
        })?;
        stats.rows = rows;
        Ok(self.finish(file, "concepts", stats))
    }

    /// `id effectiveTime active moduleId conceptId languageCode typeId term caseSignificanceId`
    pub fn load_descriptions<R: BufRead>(&mut self, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        let mut stats = LoadStats::default();
        let Self { store, options, .. } = self;
        let rows = read_rows(file, reader, 9, |row| {
            let id = row.sctid(store, 0, Partition::Description)?;
            let incoming = Description {
                id,
                concept_id: row.sctid(store, 4, Partition::Concept)?,
                language_code: row.str(5).to_string(),
                type_id: row.u64(6)?,
                term: row.str(7).to_string(),
                case_significance_id: row.u64(8)?,
                meta: row.meta()?,
                language_members: BTreeMap::new(),
                acceptability: BTreeMap::new(),
            };
            let held = store.description(id).cloned();
            if let Some(merged) = merge(held.as_ref(), incoming, options, &mut stats) {
                store.put_description(merged)?;
            }
            Ok(())
        })?;
        stats.rows = rows;
        Ok(self.finish(file, "descriptions", stats))
    }

    /// `id effectiveTime active moduleId sourceId destinationId|value
    /// relationshipGroup typeId characteristicTypeId modifierId`
    ///
    /// Stated, inferred and concrete-value files share this layout. A `#`
    /// or quoted target is a concrete value.
    pub fn load_relationships<R: BufRead>(&mut self, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        let mut stats = LoadStats::default();
        let Self { store, options, .. } = self;
        let rows = read_rows(file, reader, 10, |row| {
            let id = row.sctid(store, 0, Partition::Relationship)?;
            let raw_target = row.str(5);
            let target = if raw_target.starts_with('#') || raw_target.starts_with('"') {
                RelationshipTarget::Value(
                    ConcreteValue::from_rf2(raw_target).map_err(|e| row.invalid(5, e.to_string()))?,
                )
            } else {
                RelationshipTarget::Concept(row.sctid(store, 5, Partition::Concept)?)
            };
            let characteristic_type = CharacteristicType::from_sctid(row.u64(8)?)
                .ok_or_else(|| row.invalid(8, "unknown characteristic type"))?;
            let incoming = Relationship {
                id: Some(id),
                source_id: row.sctid(store, 4, Partition::Concept)?,
                type_id: row.sctid(store, 7, Partition::Concept)?,
                target,
                group: row.u32(6)?,
                characteristic_type,
                modifier_id: row.u64(9)?,
                meta: row.meta()?,
                axiom_entry_id: None,
            };
            let held = store.relationship(id).cloned();
            if let Some(merged) = merge(held.as_ref(), incoming, options, &mut stats) {
                store.put_relationship(merged)?;
            }
            Ok(())
        })?;
        stats.rows = rows;
        Ok(self.finish(file, "relationships", stats))
    }

    /// `id effectiveTime active moduleId refsetId referencedComponentId owlExpression`
    ///
    /// Only OWL axiom refset rows are processed. Class axioms are converted
    /// into stated relationships; everything else, parseable or not, goes to
    /// the property-axiom side table.
    pub fn load_axioms<R: BufRead>(&mut self, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        let mut stats = LoadStats::default();
        let Self { store, options, .. } = self;
        let rows = read_rows(file, reader, 7, |row| {
            let refset_id = row.u64(4)?;
            if refset_id != OWL_AXIOM_REFSET {
                stats.skipped += 1;
                return Ok(());
            }
            let id = row.uuid(0)?;
            let incoming = AxiomEntry {
                id,
                meta: row.meta()?,
                refset_id,
                referenced_component_id: row.sctid(store, 5, Partition::Concept)?,
                owl_expression: row.str(6).to_string(),
            };

            let held = store
                .axiom_entry(id)
                .or_else(|| store.property_axiom(id).map(|r| &r.entry))
                .cloned();
            if let Some(held) = &held {
                if let (Some(held_time), Some(incoming_time)) =
                    (held.meta.effective_time, incoming.meta.effective_time)
                {
                    if incoming_time < held_time {
                        warn!(
                            file,
                            line = row.line,
                            axiom = %id,
                            held = %held_time,
                            incoming = %incoming_time,
                            "ignoring axiom row older than the held version"
                        );
                        stats.ignored_older += 1;
                        return Ok(());
                    }
                }
            }

            let Some(merged) = merge(held.as_ref(), incoming, options, &mut stats) else {
                return Ok(());
            };
            if is_class_axiom(&merged.owl_expression) {
                let converted = axiom_to_relationships(merged.referenced_component_id, &merged.owl_expression)?;
                reconcile_axiom(store, merged, converted)?;
            } else {
                let parsed = match parse_axiom(&merged.owl_expression) {
                    Ok(OwlAxiom::Property(p)) => Some(p),
                    _ => None,
                };
                store.put_property_axiom(PropertyAxiomRecord {
                    entry: merged,
                    parsed,
                });
                stats.property_axioms += 1;
            }
            Ok(())
        })?;
        stats.rows = rows;
        Ok(self.finish(file, "axioms", stats))
    }

    /// `id effectiveTime active moduleId refsetId referencedComponentId acceptabilityId`
    ///
    /// Duplicate pairs are only recorded between members of the same file.
    pub fn load_language_refset<R: BufRead>(&mut self, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        let mut stats = LoadStats::default();
        self.seen_language.clear();
        let Self {
            store,
            options,
            seen_language,
        } = self;
        let rows = read_rows(file, reader, 7, |row| {
            let id = row.uuid(0)?;
            let incoming = LangRefsetEntry {
                id,
                meta: row.meta()?,
                refset_id: row.u64(4)?,
                description_id: row.sctid(store, 5, Partition::Description)?,
                acceptability_id: row.u64(6)?,
            };
            let description_id = incoming.description_id;
            let refset_id = incoming.refset_id;
            let Some(description) = store.description(description_id) else {
                debug!(file, line = row.line, description = description_id, "language row for unknown description");
                stats.orphans += 1;
                return Ok(());
            };
            let held = description.language_members.get(&id).cloned();
            let current = description.acceptability_in(refset_id).cloned();

            let Some(merged) = merge(held.as_ref(), incoming, options, &mut stats) else {
                return Ok(());
            };

            let mut duplicate = None;
            let take_over = match &current {
                None => true,
                Some(cur) if cur.id == id => true,
                Some(cur) => {
                    if options.delta && seen_language.contains(&cur.id) && (cur.meta.active || merged.meta.active) {
                        duplicate = Some(DuplicatePair {
                            description_id,
                            refset_id,
                            kept: cur.id,
                            duplicate: id,
                        });
                        false
                    } else {
                        incoming_wins(&cur.meta, &merged.meta)
                    }
                }
            };

            if let Some(description) = store.description_mut(description_id) {
                description.language_members.insert(id, merged);
                if take_over {
                    description.acceptability.insert(refset_id, id);
                }
            }
            store.index_language_member(id, description_id);
            seen_language.insert(id);

            if let Some(pair) = duplicate {
                warn!(
                    file,
                    line = row.line,
                    description = description_id,
                    refset = refset_id,
                    kept = %pair.kept,
                    duplicate = %pair.duplicate,
                    "duplicate language refset entries"
                );
                stats.duplicate_pairs += 1;
                store.record_duplicate_pair(pair);
            }
            Ok(())
        })?;
        stats.rows = rows;
        Ok(self.finish(file, "language refset", stats))
    }

    /// `id effectiveTime active moduleId refsetId referencedComponentId valueId`
    pub fn load_inactivation_indicators<R: BufRead>(&mut self, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        self.load_members(file, reader, MemberKind::InactivationIndicator)
    }

    /// `id effectiveTime active moduleId refsetId referencedComponentId targetComponentId`
    pub fn load_historical_associations<R: BufRead>(&mut self, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        self.load_members(file, reader, MemberKind::Association)
    }

    /// Annotation refsets; trailing columns are kept by header name.
    pub fn load_annotations<R: BufRead>(&mut self, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        self.load_members(file, reader, MemberKind::Annotation)
    }

    fn load_members<R: BufRead>(&mut self, file: &str, reader: R, kind: MemberKind) -> Result<LoadStats, LoadError> {
        let mut stats = LoadStats::default();
        let Self { store, options, .. } = self;
        let rows = read_rows(file, reader, 6, |row| {
            let incoming = RefsetMember {
                id: row.uuid(0)?,
                meta: row.meta()?,
                refset_id: row.u64(4)?,
                referenced_component_id: row.u64(5)?,
                fields: row.named_fields(6),
            };
            if is_orphan(store, incoming.referenced_component_id) {
                debug!(file, line = row.line, member = %incoming.id, "refset row for unknown component");
                stats.orphans += 1;
                return Ok(());
            }
            let held = store.member(kind, incoming.id).cloned();
            if let Some(merged) = merge(held.as_ref(), incoming, options, &mut stats) {
                store.put_member(kind, merged)?;
            }
            Ok(())
        })?;
        stats.rows = rows;
        Ok(self.finish(file, "refset members", stats))
    }

    /// `id effectiveTime active moduleId refsetId referencedComponentId
    /// sourceEffectiveTime targetEffectiveTime`
    pub fn load_module_dependencies<R: BufRead>(&mut self, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        let mut stats = LoadStats::default();
        let Self { store, options, .. } = self;
        let rows = read_rows(file, reader, 6, |row| {
            let incoming = RefsetMember {
                id: row.uuid(0)?,
                meta: row.meta()?,
                refset_id: row.u64(4)?,
                referenced_component_id: row.u64(5)?,
                fields: row.named_fields(6),
            };
            let held = store.module_dependency(incoming.id).cloned();
            if let Some(merged) = merge(held.as_ref(), incoming, options, &mut stats) {
                store.put_module_dependency(merged);
            }
            Ok(())
        })?;
        stats.rows = rows;
        Ok(self.finish(file, "module dependencies", stats))
    }

    /// `alternateIdentifier effectiveTime active moduleId identifierSchemeId referencedComponentId`
    pub fn load_alternate_identifiers<R: BufRead>(&mut self, file: &str, reader: R) -> Result<LoadStats, LoadError> {
        let mut stats = LoadStats::default();
        let Self { store, options, .. } = self;
        let rows = read_rows(file, reader, 6, |row| {
            let incoming = AlternateIdentifier {
                alternate_identifier: row.str(0).to_string(),
                meta: row.meta()?,
                identifier_scheme_id: row.u64(4)?,
                referenced_component_id: row.u64(5)?,
            };
            if is_orphan(store, incoming.referenced_component_id) {
                stats.orphans += 1;
                return Ok(());
            }
            let held = store
                .alternate_identifier(incoming.identifier_scheme_id, &incoming.alternate_identifier)
                .cloned();
            if let Some(merged) = merge(held.as_ref(), incoming, options, &mut stats) {
                store.put_alternate_identifier(merged)?;
            }
            Ok(())
        })?;
        stats.rows = rows;
        Ok(self.finish(file, "alternate identifiers", stats))
    }
}
