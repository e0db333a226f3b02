//! RF2 ingestion for the termgraph store.
//!
//! Tab-delimited RF2 snapshot and delta files are applied row by row
//! through effective-time merge rules. Class axioms from the OWL axiom
//! refset are converted into stated relationships on the way in.
//!
//! ```text
//! release dir ──► classify ──► Rf2Loader::load_* ──► GraphStore
//!                                   │
//!                                   └─► merge::decide (per row)
//! ```

pub mod error;
pub mod loader;
pub mod merge;
pub mod release;
pub mod rows;

pub use error::{LoadError, RowError};
pub use loader::Rf2Loader;
pub use merge::{decide, MergeDecision, Rf2Component};
pub use release::{classify, load_release_dir, LoadedFile, ReleaseLoadReport, Rf2FileKind, Rf2ReleaseType};

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// How rows of one load are treated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Released flag given to components created by this load.
    pub released: Option<bool>,
    /// Keep the prior effective time of rows republished without change.
    pub detect_no_change_deltas: bool,
    /// Whether the rows come from a delta; enables duplicate language
    /// member detection.
    pub delta: bool,
}

impl LoadOptions {
    pub fn snapshot() -> Self {
        Self {
            released: Some(true),
            detect_no_change_deltas: false,
            delta: false,
        }
    }

    pub fn delta() -> Self {
        Self {
            released: Some(true),
            detect_no_change_deltas: false,
            delta: true,
        }
    }

    pub fn released(mut self, released: Option<bool>) -> Self {
        self.released = released;
        self
    }

    pub fn detect_no_change_deltas(mut self, detect: bool) -> Self {
        self.detect_no_change_deltas = detect;
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::snapshot()
    }
}

/// Row counters for one file or a whole release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub rows: usize,
    pub applied: usize,
    pub superseded: usize,
    /// Axiom rows older than the held entry.
    pub ignored_older: usize,
    pub no_change_deltas: usize,
    pub property_axioms: usize,
    pub duplicate_pairs: usize,
    /// Refset rows whose referenced description or relationship is unknown.
    pub orphans: usize,
    /// Rows for refsets this loader does not handle.
    pub skipped: usize,
}

impl AddAssign for LoadStats {
    fn add_assign(&mut self, other: Self) {
        self.rows += other.rows;
        self.applied += other.applied;
        self.superseded += other.superseded;
        self.ignored_older += other.ignored_older;
        self.no_change_deltas += other.no_change_deltas;
        self.property_axioms += other.property_axioms;
        self.duplicate_pairs += other.duplicate_pairs;
        self.orphans += other.orphans;
        self.skipped += other.skipped;
    }
}
