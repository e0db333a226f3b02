//! Load-and-query session for termgraph.
//!
//! A [`Session`] owns everything one load-and-query lifetime needs: the
//! graph store, the four hierarchy caches, the closure history per
//! characteristic type, and the ECL resolvers. It is constructed once and
//! passed by reference; dropping it (or calling [`Session::reset`]) is the
//! only way state goes away.

pub mod config;

pub use config::{RemoteConfig, SessionConfig};

use anyhow::Context;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use termgraph_ecl::{EclContext, EclError, EclResolvers, NoRemote, RemoteEclClient};
use termgraph_ingest_rf2::{LoadOptions, LoadStats, ReleaseLoadReport, Rf2FileKind, Rf2Loader};
use termgraph_store::{
    CharacteristicType, ClosureDelta, ClosureHistory, ConceptId, ConceptSet, GraphError, GraphStore,
    HierarchyCaches, TransitiveClosure,
};
use tracing::{debug, info, warn};

/// Install a `tracing` subscriber driven by `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// The load-and-query context.
pub struct Session {
    config: SessionConfig,
    store: Arc<RwLock<GraphStore>>,
    caches: HierarchyCaches,
    closures: RwLock<BTreeMap<CharacteristicType, ClosureHistory>>,
    ecl: EclResolvers,
    remote: Arc<dyn RemoteEclClient>,
}

impl Session {
    /// Create a session, connecting the HTTP ECL client when a remote is
    /// configured.
    pub fn new(config: SessionConfig) -> anyhow::Result<Self> {
        let remote: Arc<dyn RemoteEclClient> = match &config.remote {
            None => Arc::new(NoRemote),
            Some(remote) => connect(remote)?,
        };
        Ok(Self::with_remote(config, remote))
    }

    pub fn with_remote(config: SessionConfig, remote: Arc<dyn RemoteEclClient>) -> Self {
        let store = GraphStore::new(config.store_settings());
        let ecl = EclResolvers::new(config.ecl_settings());
        Self {
            config,
            store: Arc::new(RwLock::new(store)),
            caches: HierarchyCaches::new(),
            closures: RwLock::new(BTreeMap::new()),
            ecl,
            remote,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> RwLockReadGuard<'_, GraphStore> {
        self.store.read()
    }

    pub fn store_handle(&self) -> Arc<RwLock<GraphStore>> {
        Arc::clone(&self.store)
    }

    pub fn caches(&self) -> &HierarchyCaches {
        &self.caches
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Load an extracted RF2 release directory.
    ///
    /// On failure the store is reset: a partially applied file is never left
    /// behind.
    pub fn load_release_dir(&self, path: impl AsRef<Path>) -> anyhow::Result<ReleaseLoadReport> {
        let path = path.as_ref();
        let result = {
            let mut store = self.store.write();
            let result = termgraph_ingest_rf2::load_release_dir(&mut store, path, self.config.detect_no_change_deltas);
            if result.is_err() {
                store.reset();
            }
            result
        };
        self.invalidate_derived();
        result.with_context(|| format!("failed to load RF2 release {}", path.display()))
    }

    /// Load a single RF2 file of a known kind.
    pub fn load_file(&self, kind: Rf2FileKind, path: impl AsRef<Path>, options: LoadOptions) -> anyhow::Result<LoadStats> {
        let path = path.as_ref();
        let file = path.display().to_string();
        let handle = File::open(path).with_context(|| format!("failed to open {file}"))?;
        let options = options.detect_no_change_deltas(self.config.detect_no_change_deltas);
        let result = {
            let mut store = self.store.write();
            let result = Rf2Loader::new(&mut store, options).load(kind, &file, BufReader::new(handle));
            if result.is_err() {
                store.reset();
            }
            result
        };
        self.invalidate_derived();
        Ok(result?)
    }

    /// Mutate the store directly; derived caches are dropped afterwards.
    pub fn with_store_mut<R>(&self, f: impl FnOnce(&mut GraphStore) -> R) -> R {
        let mut store = self.store.write();
        let out = f(&mut *store);
        drop(store);
        self.invalidate_derived();
        out
    }

    fn invalidate_derived(&self) {
        self.caches.reset_all();
        self.ecl.reset_all();
        debug!("hierarchy and ECL caches reset");
    }

    /// Drop every loaded component and all derived state.
    pub fn reset(&self) {
        self.store.write().reset();
        self.closures.write().clear();
        self.invalidate_derived();
        info!("session reset");
    }

    // ------------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------------

    pub fn ancestors(&self, id: ConceptId, ct: CharacteristicType) -> Result<ConceptSet, GraphError> {
        let store = self.store.read();
        Ok(self.caches.ancestors(ct).get(&store, id, true)?.into_owned())
    }

    pub fn descendants(&self, id: ConceptId, ct: CharacteristicType) -> Result<ConceptSet, GraphError> {
        let store = self.store.read();
        Ok(self.caches.descendants(ct).get(&store, id, true)?.into_owned())
    }

    pub fn ancestors_or_self(&self, id: ConceptId, ct: CharacteristicType) -> Result<ConceptSet, GraphError> {
        let store = self.store.read();
        self.caches.ancestors(ct).get_or_self(&store, id)
    }

    pub fn descendants_or_self(&self, id: ConceptId, ct: CharacteristicType) -> Result<ConceptSet, GraphError> {
        let store = self.store.read();
        self.caches.descendants(ct).get_or_self(&store, id)
    }

    // ------------------------------------------------------------------------
    // Closure
    // ------------------------------------------------------------------------

    /// Generate a new closure for `ct`, keeping the last one as previous.
    /// Returns the delta against the previous generation, if there was one.
    pub fn generate_closure(&self, ct: CharacteristicType) -> Result<Option<ClosureDelta>, GraphError> {
        let closure = {
            let store = self.store.read();
            TransitiveClosure::generate(&store, ct)?
        };
        let mut closures = self.closures.write();
        let history = closures.entry(ct).or_default();
        history.advance(closure);
        Ok(history.delta())
    }

    pub fn closure(&self, ct: CharacteristicType) -> Option<MappedRwLockReadGuard<'_, TransitiveClosure>> {
        RwLockReadGuard::try_map(self.closures.read(), |c| c.get(&ct)?.current()).ok()
    }

    pub fn previous_closure(&self, ct: CharacteristicType) -> Option<MappedRwLockReadGuard<'_, TransitiveClosure>> {
        RwLockReadGuard::try_map(self.closures.read(), |c| c.get(&ct)?.previous()).ok()
    }

    // ------------------------------------------------------------------------
    // ECL
    // ------------------------------------------------------------------------

    /// Resolve an expression on `branch`, or the configured default branch.
    pub fn resolve_ecl(
        &self,
        branch: Option<&str>,
        ct: CharacteristicType,
        expr: &str,
    ) -> Result<Arc<ConceptSet>, EclError> {
        let branch = branch.unwrap_or(&self.config.default_branch);
        let resolver = self.ecl.resolver(branch, ct);
        let store = self.store.read();
        let ctx = EclContext {
            store: &store,
            caches: &self.caches,
            remote: self.remote.as_ref(),
        };
        resolver.resolve(&ctx, expr).inspect_err(|err| {
            warn!(expression = expr, branch, error = %err, "ECL resolution failed");
        })
    }
}

#[cfg(feature = "remote-http")]
fn connect(remote: &RemoteConfig) -> anyhow::Result<Arc<dyn RemoteEclClient>> {
    let client = termgraph_ecl::HttpEclClient::new(
        &remote.base_url,
        std::time::Duration::from_secs(remote.timeout_secs),
    )?;
    info!(base_url = %remote.base_url, "remote ECL expansion enabled");
    Ok(Arc::new(client))
}

#[cfg(not(feature = "remote-http"))]
fn connect(remote: &RemoteConfig) -> anyhow::Result<Arc<dyn RemoteEclClient>> {
    Err(anyhow::anyhow!(
        "remote ECL server {} configured but the `remote-http` feature is disabled",
        remote.base_url
    ))
}
