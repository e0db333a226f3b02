//! Integration tests for the complete termgraph pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - RF2 release → Loader → Graph store
//! - OWL axioms → Synchronizer → Stated hierarchy
//! - Session → Hierarchy caches / Closure / ECL
//!
//! Run with: cargo test --test integration_tests

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use termgraph_ecl::{ConceptRef, EclError, EclPage, RemoteEclClient};
use termgraph_ingest_rf2::{LoadOptions, Rf2Loader};
use termgraph_session::{Session, SessionConfig};
use termgraph_store::identifier::sctid_for;
use termgraph_store::wellknown::*;
use termgraph_store::{CharacteristicType, GraphError, GraphStore, Partition};

const MODULE: u64 = 900_000_000_000_207_008;

// ============================================================================
// Fixtures
// ============================================================================

const CONCEPT_HEADER: &[&str] = &["id", "effectiveTime", "active", "moduleId", "definitionStatusId"];
const RELATIONSHIP_HEADER: &[&str] = &[
    "id",
    "effectiveTime",
    "active",
    "moduleId",
    "sourceId",
    "destinationId",
    "relationshipGroup",
    "typeId",
    "characteristicTypeId",
    "modifierId",
];
const AXIOM_HEADER: &[&str] = &[
    "id",
    "effectiveTime",
    "active",
    "moduleId",
    "refsetId",
    "referencedComponentId",
    "owlExpression",
];

fn rf2(header: &[&str], rows: &[String]) -> String {
    let mut text = header.join("\t");
    text.push('\n');
    for row in rows {
        text.push_str(&row.replace('|', "\t"));
        text.push('\n');
    }
    text
}

fn write(dir: &Path, name: &str, contents: String) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

fn concept(i: u64) -> u64 {
    sctid_for(7_000 + i, Partition::Concept)
}

/// A release with `n` concepts under root, written as a snapshot.
fn wide_release(dir: &Path, n: u64) {
    let concepts = (0..n)
        .map(|i| format!("{}|20200101|1|{MODULE}|{PRIMITIVE}", concept(i)))
        .collect::<Vec<_>>();
    let relationships = (0..n)
        .map(|i| {
            let parent = if i < 5 { ROOT_CONCEPT } else { concept(i % 5) };
            format!(
                "{}|20200101|1|{MODULE}|{}|{parent}|0|{IS_A}|{INFERRED_RELATIONSHIP}|{EXISTENTIAL_MODIFIER}",
                sctid_for(7_000 + i, Partition::Relationship),
                concept(i)
            )
        })
        .collect::<Vec<_>>();
    let snapshot = dir.join("Snapshot").join("Terminology");
    write(&snapshot, "sct2_Concept_Snapshot_INT_20200131.txt", rf2(CONCEPT_HEADER, &concepts));
    write(
        &snapshot,
        "sct2_Relationship_Snapshot_INT_20200131.txt",
        rf2(RELATIONSHIP_HEADER, &relationships),
    );
}

#[derive(Default)]
struct CountingRemote {
    calls: parking_lot::Mutex<Vec<String>>,
}

impl RemoteEclClient for CountingRemote {
    fn query(
        &self,
        expression: &str,
        _branch: &str,
        _characteristic_type: CharacteristicType,
        _cursor: Option<&str>,
        _page_size: usize,
    ) -> Result<EclPage, EclError> {
        self.calls.lock().push(expression.to_string());
        Ok(EclPage {
            items: vec![ConceptRef {
                id: 22_298_006,
                fsn: Some("Myocardial infarction (disorder)".to_string()),
            }],
            total: 1,
            next_cursor: None,
        })
    }
}

// ============================================================================
// Scenario: older delta rows never overwrite released state
// ============================================================================

#[test]
fn test_older_delta_row_is_skipped() {
    let mut store = GraphStore::default();
    Rf2Loader::new(&mut store, LoadOptions::snapshot())
        .load_concepts(
            "snapshot",
            rf2(CONCEPT_HEADER, &[format!("100005|20200101|1|{MODULE}|{PRIMITIVE}")]).as_bytes(),
        )
        .unwrap();
    let stats = Rf2Loader::new(&mut store, LoadOptions::delta())
        .load_concepts(
            "delta",
            rf2(CONCEPT_HEADER, &[format!("100005|20190101|0|{MODULE}|{PRIMITIVE}")]).as_bytes(),
        )
        .unwrap();

    assert_eq!(stats.superseded, 1);
    let concept = store.get(100005).unwrap();
    assert!(concept.is_active());
    assert_eq!(concept.meta.effective_time.unwrap().to_string(), "20200101");
}

// ============================================================================
// Scenario: IS-A justified by two axioms survives losing one
// ============================================================================

#[test]
fn test_is_a_shared_by_two_axioms() {
    let u1 = "3a0c1f5e-8d7b-4f6a-9c2e-1b3d5f7a9c11";
    let u2 = "4b1d2a6f-9e8c-4a7b-8d3f-2c4e6a8b0d22";
    let axiom = |id: &str, et: &str, active: u8, owl: &str| {
        format!("{id}|{et}|{active}|{MODULE}|{OWL_AXIOM_REFSET}|100005|{owl}")
    };

    let mut store = GraphStore::default();
    Rf2Loader::new(&mut store, LoadOptions::snapshot())
        .load_axioms(
            "axioms",
            rf2(
                AXIOM_HEADER,
                &[
                    axiom(u1, "20200101", 1, "SubClassOf(:100005 :200009)"),
                    axiom(
                        u2,
                        "20200101",
                        1,
                        "SubClassOf(:100005 ObjectIntersectionOf(:200009 ObjectSomeValuesFrom(:609096000 ObjectSomeValuesFrom(:363698007 :39057004))))",
                    ),
                ],
            )
            .as_bytes(),
        )
        .unwrap();
    let stated = CharacteristicType::Stated;
    assert!(store.get(200009).unwrap().children(stated).contains(&100005));

    Rf2Loader::new(&mut store, LoadOptions::delta())
        .load_axioms(
            "axioms-delta",
            rf2(AXIOM_HEADER, &[axiom(u1, "20210101", 0, "SubClassOf(:100005 :200009)")]).as_bytes(),
        )
        .unwrap();

    assert!(store.get(100005).unwrap().parents(stated).contains(&200009));
    assert!(store.get(200009).unwrap().children(stated).contains(&100005));

    Rf2Loader::new(&mut store, LoadOptions::delta())
        .load_axioms(
            "axioms-delta-2",
            rf2(
                AXIOM_HEADER,
                &[axiom(u2, "20220101", 1, "SubClassOf(:100005 :300004)")],
            )
            .as_bytes(),
        )
        .unwrap();
    assert!(!store.get(100005).unwrap().parents(stated).contains(&200009));
    assert!(!store.get(200009).unwrap().children(stated).contains(&100005));
    assert!(store.get(100005).unwrap().parents(stated).contains(&300004));
}

// ============================================================================
// Scenario: root descendants answered locally
// ============================================================================

#[test]
fn test_root_descendants_without_remote_call() {
    let dir = tempdir().unwrap();
    wide_release(dir.path(), 110);
    let remote = Arc::new(CountingRemote::default());
    let session = Session::with_remote(SessionConfig::default(), remote.clone());
    session.load_release_dir(dir.path()).unwrap();

    let all = session
        .resolve_ecl(None, CharacteristicType::Inferred, "<<138875005")
        .unwrap();
    assert_eq!(*all, session.store().concept_ids());
    assert_eq!(all.len(), 113);
    assert!(remote.calls.lock().is_empty());
}

// ============================================================================
// Scenario: OR unions local and remote branches
// ============================================================================

#[test]
fn test_or_union_is_cached_under_combined_key() {
    let dir = tempdir().unwrap();
    wide_release(dir.path(), 110);
    let remote = Arc::new(CountingRemote::default());
    let session = Session::with_remote(SessionConfig::default(), remote.clone());
    session.load_release_dir(dir.path()).unwrap();

    let local = format!("< {}", concept(1));
    let expr = format!("{local} OR << 22298006 : 363698007 = << 80891009");
    let ct = CharacteristicType::Inferred;

    let union = session.resolve_ecl(None, ct, &expr).unwrap();
    let local_only = session.resolve_ecl(None, ct, &local).unwrap();
    assert_eq!(union.len(), local_only.len() + 1);
    assert!(union.contains(22_298_006));

    session.resolve_ecl(None, ct, &expr).unwrap();
    assert_eq!(remote.calls.lock().len(), 1);
}

// ============================================================================
// Scenario: older axiom rows are ignored and counted
// ============================================================================

#[test]
fn test_older_axiom_row_ignored() {
    let u1 = "5c2e3b7a-0f9d-4b8c-9e4a-3d5f7b9c1e33";
    let row = |et: &str, owl: &str| format!("{u1}|{et}|1|{MODULE}|{OWL_AXIOM_REFSET}|100005|{owl}");
    let dir = tempdir().unwrap();
    let snapshot = dir.path().join("Snapshot");
    let delta = dir.path().join("Delta");
    write(
        &snapshot,
        "sct2_sRefset_OWLExpressionSnapshot_INT_20230731.txt",
        rf2(AXIOM_HEADER, &[row("20230701", "SubClassOf(:100005 :200009)")]),
    );
    write(
        &delta,
        "sct2_sRefset_OWLExpressionDelta_INT_20230131.txt",
        rf2(AXIOM_HEADER, &[row("20230101", "SubClassOf(:100005 :300004)")]),
    );

    let session = Session::new(SessionConfig::default()).unwrap();
    let report = session.load_release_dir(dir.path()).unwrap();
    assert_eq!(report.totals.ignored_older, 1);

    let store = session.store();
    let entry = store
        .axiom_entry(uuid_of(u1))
        .expect("axiom entry held");
    assert_eq!(entry.meta.effective_time.unwrap().to_string(), "20230701");
    assert_eq!(entry.owl_expression, "SubClassOf(:100005 :200009)");
}

fn uuid_of(raw: &str) -> uuid::Uuid {
    termgraph_store::identifier::parse_member_id(raw).unwrap()
}

// ============================================================================
// Scenario: recursion guard
// ============================================================================

#[test]
fn test_hierarchy_depth_guard() {
    let store = GraphStore::default();
    assert_eq!(store.hierarchy_depth(ROOT_CONCEPT, CharacteristicType::Inferred, 0).unwrap(), 0);
    assert!(matches!(
        store.hierarchy_depth(ROOT_CONCEPT, CharacteristicType::Inferred, 1001),
        Err(GraphError::DepthExceeded { limit: 1000, .. })
    ));
}

#[test]
fn test_descendants_of_inactive_concept_rejected() {
    let dir = tempdir().unwrap();
    wide_release(dir.path(), 10);
    write(
        &dir.path().join("Delta"),
        "sct2_Concept_Delta_INT_20210131.txt",
        rf2(CONCEPT_HEADER, &[format!("{}|20210101|0|{MODULE}|{PRIMITIVE}", concept(3))]),
    );
    let session = Session::new(SessionConfig::default()).unwrap();
    session.load_release_dir(dir.path()).unwrap();
    assert!(matches!(
        session.descendants(concept(3), CharacteristicType::Inferred),
        Err(GraphError::InactiveConceptQuery(_))
    ));
    assert!(session.ancestors(concept(3), CharacteristicType::Inferred).is_ok());
}
