//! Release directory loading.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use termgraph_store::GraphStore;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{LoadError, LoadOptions, LoadStats, Rf2Loader};

/// RF2 file kinds, in the order they must be applied within one release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rf2FileKind {
    Concepts,
    Descriptions,
    Relationships,
    ConcreteRelationships,
    Axioms,
    Language,
    InactivationIndicators,
    Associations,
    Annotations,
    ModuleDependencies,
    AlternateIdentifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rf2ReleaseType {
    Snapshot,
    Delta,
    Full,
}

impl Rf2ReleaseType {
    fn strip(content: &str) -> Option<(&str, Rf2ReleaseType)> {
        [
            ("Snapshot", Rf2ReleaseType::Snapshot),
            ("Delta", Rf2ReleaseType::Delta),
            ("Full", Rf2ReleaseType::Full),
        ]
        .into_iter()
        .find_map(|(marker, ty)| content.find(marker).map(|at| (&content[..at], ty)))
    }
}

/// Classify an RF2 file name such as `sct2_Concept_Snapshot_INT_20230131.txt`
/// or `der2_cRefset_LanguageSnapshot-en_INT_20230131.txt`.
pub fn classify(file_name: &str) -> Option<(Rf2FileKind, Rf2ReleaseType)> {
    let stem = file_name.strip_suffix(".txt")?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 3 {
        return None;
    }
    let (content, release_type) = if parts[1].ends_with("Refset") {
        Rf2ReleaseType::strip(parts[2])?
    } else {
        (parts[1], Rf2ReleaseType::strip(parts[2])?.1)
    };
    let kind = match content {
        "Concept" => Rf2FileKind::Concepts,
        "Description" | "TextDefinition" => Rf2FileKind::Descriptions,
        "Relationship" | "StatedRelationship" => Rf2FileKind::Relationships,
        "RelationshipConcreteValues" => Rf2FileKind::ConcreteRelationships,
        "OWLExpression" => Rf2FileKind::Axioms,
        "Language" => Rf2FileKind::Language,
        "AttributeValue" => Rf2FileKind::InactivationIndicators,
        "Association" => Rf2FileKind::Associations,
        "ModuleDependency" => Rf2FileKind::ModuleDependencies,
        "Identifier" => Rf2FileKind::AlternateIdentifiers,
        other if other.contains("Annotation") => Rf2FileKind::Annotations,
        _ => return None,
    };
    Some((kind, release_type))
}

/// One file applied from a release directory.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub kind: Rf2FileKind,
    pub release_type: Rf2ReleaseType,
    pub stats: LoadStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReleaseLoadReport {
    pub files: Vec<LoadedFile>,
    pub totals: LoadStats,
}

/// Load every recognised RF2 file under `root`.
///
/// Snapshots go first, then deltas; within each, files are applied in
/// [`Rf2FileKind`] order and then by path, so dated deltas of one kind apply
/// oldest to newest. Each file gets its own loader. Full files are not supported and
/// are skipped. The first failing file aborts the load.
pub fn load_release_dir(
    store: &mut GraphStore,
    root: &Path,
    detect_no_change_deltas: bool,
) -> Result<ReleaseLoadReport, LoadError> {
    let mut found: Vec<(Rf2ReleaseType, Rf2FileKind, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|err| LoadError::Io {
            file: root.display().to_string(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        match classify(&name) {
            Some((_, Rf2ReleaseType::Full)) => {
                warn!(path = %entry.path().display(), "skipping RF2 full file");
            }
            Some((kind, release_type)) => found.push((release_type, kind, entry.path().to_path_buf())),
            None => debug!(path = %entry.path().display(), "not an RF2 file"),
        }
    }
    found.sort();

    let mut report = ReleaseLoadReport::default();
    for release_type in [Rf2ReleaseType::Snapshot, Rf2ReleaseType::Delta] {
        let options = match release_type {
            Rf2ReleaseType::Delta => LoadOptions::delta(),
            _ => LoadOptions::snapshot(),
        }
        .detect_no_change_deltas(detect_no_change_deltas);
        for (_, kind, path) in found.iter().filter(|(ty, _, _)| *ty == release_type) {
            let file = path.display().to_string();
            let handle = File::open(path).map_err(|source| LoadError::Io {
                file: file.clone(),
                source,
            })?;
            let stats = Rf2Loader::new(store, options.clone()).load(*kind, &file, BufReader::new(handle))?;
            report.totals += stats.clone();
            report.files.push(LoadedFile {
                path: path.clone(),
                kind: *kind,
                release_type,
                stats,
            });
        }
    }

    info!(
        root = %root.display(),
        files = report.files.len(),
        rows = report.totals.rows,
        concepts = store.len(),
        "RF2 release loaded"
    );
    Ok(report)
}
