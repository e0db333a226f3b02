use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::VecDeque;
use termgraph_ecl::*;
use termgraph_store::identifier::sctid_for;
use termgraph_store::wellknown::{EXISTENTIAL_MODIFIER, IS_A, ROOT_CONCEPT};
use termgraph_store::*;

const CT: CharacteristicType = CharacteristicType::Inferred;

// ============================================================================
// Fixtures
// ============================================================================

fn concept(i: u64) -> ConceptId {
    sctid_for(5_000 + i, Partition::Concept)
}

fn is_a(i: u64, source: ConceptId, target: ConceptId) -> Relationship {
    Relationship {
        id: Some(sctid_for(5_000 + i, Partition::Relationship)),
        source_id: source,
        type_id: IS_A,
        target: RelationshipTarget::Concept(target),
        group: 0,
        characteristic_type: CT,
        modifier_id: EXISTENTIAL_MODIFIER,
        meta: ComponentMeta::new(None, true, 0),
        axiom_entry_id: None,
    }
}

/// `n` concepts: the first ten directly under root, the rest under
/// `concept(i % 10)`.
fn populated_store(n: u64) -> GraphStore {
    let mut store = GraphStore::default();
    for i in 0..n {
        let parent = if i < 10 { ROOT_CONCEPT } else { concept(i % 10) };
        store.put_relationship(is_a(i, concept(i), parent)).unwrap();
    }
    store
}

/// Scripted remote: pops one prepared page per call and records requests.
#[derive(Default)]
struct RecordingRemote {
    pages: Mutex<VecDeque<EclPage>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingRemote {
    fn with_pages(pages: Vec<EclPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().clone()
    }
}

impl RemoteEclClient for RecordingRemote {
    fn query(
        &self,
        expression: &str,
        _branch: &str,
        _characteristic_type: CharacteristicType,
        cursor: Option<&str>,
        _page_size: usize,
    ) -> Result<EclPage, EclError> {
        self.calls
            .lock()
            .push((expression.to_string(), cursor.map(str::to_string)));
        self.pages
            .lock()
            .pop_front()
            .ok_or_else(|| EclError::remote(expression, "no scripted page left"))
    }
}

fn page(ids: &[ConceptId], total: usize, next: Option<&str>) -> EclPage {
    EclPage {
        items: ids
            .iter()
            .map(|&id| ConceptRef {
                id,
                fsn: Some(format!("Remote {id}")),
            })
            .collect(),
        total,
        next_cursor: next.map(str::to_string),
    }
}

fn resolver() -> EclResolver {
    EclResolver::new("MAIN", CT, EclSettings::default())
}

// ============================================================================
// Local resolution
// ============================================================================

#[test]
fn root_descendants_or_self_is_every_concept_without_remote() {
    let store = populated_store(120);
    let caches = HierarchyCaches::new();
    let remote = RecordingRemote::default();
    let ctx = EclContext {
        store: &store,
        caches: &caches,
        remote: &remote,
    };

    let all = resolver().resolve(&ctx, "<< 138875005 |SNOMED CT Concept|").unwrap();
    assert_eq!(*all, store.concept_ids());
    assert!(remote.calls().is_empty());
}

#[test]
fn local_operators_follow_the_hierarchy() {
    let store = populated_store(120);
    let caches = HierarchyCaches::new();
    let ctx = EclContext {
        store: &store,
        caches: &caches,
        remote: &NoRemote,
    };
    let r = resolver();
    let top = concept(3);

    let below = r.resolve(&ctx, &format!("< {top}")).unwrap();
    assert_eq!(below.len(), 11);
    assert!(!below.contains(top));
    let or_self = r.resolve(&ctx, &format!("<< {top}")).unwrap();
    assert_eq!(or_self.len(), 12);
    let children = r.resolve(&ctx, &format!("<! {top}")).unwrap();
    assert_eq!(*children, *below);

    let leaf = concept(13);
    let up = r.resolve(&ctx, &format!("> {leaf}")).unwrap();
    assert_eq!(up.iter().collect::<Vec<_>>(), {
        let mut v = vec![ROOT_CONCEPT, top];
        v.sort();
        v
    });
    assert_eq!(r.resolve(&ctx, &format!(">> {leaf}")).unwrap().len(), 3);
    assert_eq!(r.resolve(&ctx, &format!(">! {leaf}")).unwrap().iter().collect::<Vec<_>>(), vec![top]);
    assert_eq!(r.resolve(&ctx, &format!("{leaf} |Leaf|")).unwrap().len(), 1);
    assert_eq!(*r.resolve(&ctx, "*").unwrap(), store.concept_ids());
}

#[test]
fn unknown_singleton_is_not_found() {
    let store = populated_store(120);
    let caches = HierarchyCaches::new();
    let ctx = EclContext {
        store: &store,
        caches: &caches,
        remote: &NoRemote,
    };
    let missing = sctid_for(999_999, Partition::Concept);
    assert!(matches!(
        resolver().resolve(&ctx, &missing.to_string()),
        Err(EclError::Graph(GraphError::NotFound { .. }))
    ));
}

#[test]
fn small_store_delegates_simple_expressions() {
    let store = populated_store(20);
    let caches = HierarchyCaches::new();
    let remote = RecordingRemote::with_pages(vec![page(&[concept(1)], 1, None)]);
    let ctx = EclContext {
        store: &store,
        caches: &caches,
        remote: &remote,
    };
    let got = resolver().resolve(&ctx, "<< 138875005").unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(remote.calls().len(), 1);
}

// ============================================================================
// OR splitting and caching
// ============================================================================

#[test]
fn or_branches_are_unioned_and_cached_under_the_whole_expression() {
    let store = populated_store(120);
    let caches = HierarchyCaches::new();
    let remote = RecordingRemote::with_pages(vec![page(&[concept(1), 424_144_002], 2, None)]);
    let ctx = EclContext {
        store: &store,
        caches: &caches,
        remote: &remote,
    };
    let r = resolver();
    let local = format!("<< {}", concept(2));
    let refined = "<< 404684003 : 363698007 = << 39057004";
    let expr = format!("{local} OR {refined}");

    let union = r.resolve(&ctx, &expr).unwrap();
    assert_eq!(union.len(), 12 + 2);
    assert!(union.contains(424_144_002));
    assert_eq!(remote.calls(), vec![(refined.to_string(), None)]);

    assert_eq!(r.cached(&expr).as_deref(), Some(&*union));
    assert!(r.cached(&local).is_some());
    assert!(r.cached(refined).is_some());

    // Served from cache: no further remote traffic.
    r.resolve(&ctx, &format!("  {expr} ")).unwrap();
    assert_eq!(remote.calls().len(), 1);
}

// ============================================================================
// Remote paging
// ============================================================================

#[test]
fn pages_until_total_is_consumed() {
    let store = GraphStore::default();
    let caches = HierarchyCaches::new();
    let remote = RecordingRemote::with_pages(vec![
        page(&[concept(1), concept(2)], 5, Some("c1")),
        page(&[concept(2), concept(3)], 5, Some("c2")),
        page(&[concept(4)], 5, None),
    ]);
    let ctx = EclContext {
        store: &store,
        caches: &caches,
        remote: &remote,
    };
    let r = resolver();
    let got = r.resolve(&ctx, "^ 723264001").unwrap();
    assert_eq!(got.len(), 4);
    let cursors: Vec<_> = remote.calls().into_iter().map(|(_, c)| c).collect();
    assert_eq!(cursors, vec![None, Some("c1".to_string()), Some("c2".to_string())]);
    assert_eq!(r.placeholder_count(), 4);
    assert_eq!(r.placeholder(concept(4)), Some(Some(format!("Remote {}", concept(4)))));
}

#[test]
fn missing_cursor_is_a_protocol_error_and_nothing_is_cached() {
    let store = GraphStore::default();
    let caches = HierarchyCaches::new();
    let remote = RecordingRemote::with_pages(vec![page(&[concept(1)], 3, None)]);
    let ctx = EclContext {
        store: &store,
        caches: &caches,
        remote: &remote,
    };
    let r = resolver();
    assert!(matches!(
        r.resolve(&ctx, "^ 723264001"),
        Err(EclError::Protocol { .. })
    ));
    assert_eq!(r.cached_len(), 0);
    assert_eq!(r.placeholder_count(), 0);
}

#[test]
fn empty_results_are_not_cached() {
    let store = GraphStore::default();
    let caches = HierarchyCaches::new();
    let remote = RecordingRemote::with_pages(vec![
        page(&[], 0, None),
        page(&[concept(7)], 1, None),
    ]);
    let ctx = EclContext {
        store: &store,
        caches: &caches,
        remote: &remote,
    };
    let r = resolver();
    assert!(r.resolve(&ctx, "^ 723264001").unwrap().is_empty());
    assert!(r.cached("^ 723264001").is_none());
    assert_eq!(r.resolve(&ctx, "^ 723264001").unwrap().len(), 1);
    assert_eq!(remote.calls().len(), 2);
}

#[test]
fn placeholders_are_dropped_once_the_store_holds_them() {
    let mut store = GraphStore::default();
    let caches = HierarchyCaches::new();
    let remote = RecordingRemote::with_pages(vec![page(&[concept(1), concept(2)], 2, None)]);
    let r = resolver();
    {
        let ctx = EclContext {
            store: &store,
            caches: &caches,
            remote: &remote,
        };
        r.resolve(&ctx, "^ 723264001").unwrap();
    }
    assert_eq!(r.placeholder_count(), 2);

    store.reset();
    store.get_or_create(concept(1)).unwrap();
    let ctx = EclContext {
        store: &store,
        caches: &caches,
        remote: &remote,
    };
    assert_eq!(r.resolve(&ctx, "^ 723264001").unwrap().len(), 2);
    assert_eq!(r.placeholder_count(), 1);
    assert_eq!(r.placeholder(concept(1)), None);
    assert_eq!(remote.calls().len(), 1);
}

#[test]
fn resolvers_are_shared_per_branch_and_view() {
    let resolvers = EclResolvers::new(EclSettings::default());
    let a = resolvers.resolver("MAIN", CharacteristicType::Stated);
    let b = resolvers.resolver("MAIN", CharacteristicType::Stated);
    let c = resolvers.resolver("MAIN/TASK", CharacteristicType::Stated);
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert!(!std::sync::Arc::ptr_eq(&a, &c));
    assert_eq!(resolvers.len(), 2);
}

// ============================================================================
// Union law
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn or_equals_union_of_branches(a in 0u64..120, b in 0u64..120, op_a in 0usize..4, op_b in 0usize..4) {
        let store = populated_store(120);
        let caches = HierarchyCaches::new();
        let ctx = EclContext { store: &store, caches: &caches, remote: &NoRemote };
        let ops = ["<<", "<", ">>", ">"];
        let left = format!("{} {}", ops[op_a], concept(a));
        let right = format!("{} {}", ops[op_b], concept(b));

        let left_set = resolver().resolve(&ctx, &left);
        let right_set = resolver().resolve(&ctx, &right);
        let both = resolver().resolve(&ctx, &format!("{left} OR {right}"));
        match (left_set, right_set) {
            (Ok(l), Ok(r)) => prop_assert_eq!(&*both.unwrap(), &(&*l | &*r)),
            _ => prop_assert!(both.is_err()),
        }
    }
}
