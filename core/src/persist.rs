use crate::error::{EngineError, Result};
use crate::index::{InvertedIndex, PositionIndex, ReviewAggregate};
use crate::registry::{self, IndexEntry, IndexKind, IndexRegistry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const JSON_SUFFIX: &str = "_index.json";
const BINARY_SUFFIX: &str = "_index.bin";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotFormat {
    #[default]
    Json,
    Binary,
}

impl SnapshotFormat {
    fn suffix(self) -> &'static str {
        match self {
            SnapshotFormat::Json => JSON_SUFFIX,
            SnapshotFormat::Binary => BINARY_SUFFIX,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
    pub format: SnapshotFormat,
    /// Kind of every index written with this snapshot.
    pub indices: BTreeMap<String, IndexKind>,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index(&self, name: &str, format: SnapshotFormat) -> PathBuf {
        self.root.join(format!("{name}{}", format.suffix()))
    }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Outcome of a fail-soft registry save.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool { self.failed.is_empty() }
}

fn encode<T: Serialize>(value: &T, format: SnapshotFormat) -> Result<Vec<u8>> {
    Ok(match format {
        SnapshotFormat::Json => serde_json::to_vec_pretty(value)?,
        SnapshotFormat::Binary => bincode::serialize(value)?,
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8], format: SnapshotFormat) -> Result<T> {
    Ok(match format {
        SnapshotFormat::Json => serde_json::from_slice(bytes)?,
        SnapshotFormat::Binary => bincode::deserialize(bytes)?,
    })
}

fn decode_entry(bytes: &[u8], kind: IndexKind, format: SnapshotFormat) -> Result<IndexEntry> {
    Ok(match kind {
        IndexKind::Inverted => IndexEntry::Inverted(decode::<InvertedIndex>(bytes, format)?),
        IndexKind::Position => IndexEntry::Position(decode::<PositionIndex>(bytes, format)?),
        IndexKind::Reviews => IndexEntry::Reviews(decode::<ReviewAggregate>(bytes, format)?),
    })
}

/// Guess the kind of a JSON artifact that is not in the manifest from its shape.
fn infer_json_entry(bytes: &[u8]) -> Result<IndexEntry> {
    let mut last_err = None;
    for kind in [IndexKind::Inverted, IndexKind::Position, IndexKind::Reviews] {
        match decode_entry(bytes, kind, SnapshotFormat::Json) {
            Ok(entry) => return Ok(entry),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| EngineError::Io(std::io::ErrorKind::InvalidData.into())))
}

pub fn save_index(paths: &IndexPaths, name: &str, entry: &IndexEntry, format: SnapshotFormat) -> Result<PathBuf> {
    create_dir_all(&paths.root)?;
    let bytes = match entry {
        IndexEntry::Inverted(i) => encode(i, format)?,
        IndexEntry::Position(i) => encode(i, format)?,
        IndexEntry::Reviews(i) => encode(i, format)?,
    };
    let file = paths.index(name, format);
    let mut f = File::create(&file)?;
    f.write_all(&bytes)?;
    Ok(file)
}

pub fn load_index(paths: &IndexPaths, name: &str, kind: IndexKind, format: SnapshotFormat) -> Result<IndexEntry> {
    let file = paths.index(name, format);
    let mut f = File::open(&file).map_err(|e| EngineError::resource(&file, e))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    decode_entry(&buf, kind, format)
}

/// Save every index. A failing index is logged and skipped; the others are
/// still written.
pub fn save_registry(paths: &IndexPaths, registry: &IndexRegistry, format: SnapshotFormat) -> SaveReport {
    let mut report = SaveReport::default();
    for (name, entry) in registry.iter() {
        match save_index(paths, name, entry, format) {
            Ok(file) => {
                tracing::debug!(%name, file = %file.display(), "saved index");
                report.saved.push(name.clone());
            }
            Err(e) => {
                tracing::warn!(%name, error = %e, "failed to save index, continuing");
                report.failed.push((name.clone(), e.to_string()));
            }
        }
    }
    report
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let file = paths.meta();
    let mut f = File::open(&file).map_err(|e| EngineError::resource(&file, e))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Manifest for the indices of `report` that were written.
pub fn meta_for(registry: &IndexRegistry, report: &SaveReport, num_docs: u32, format: SnapshotFormat) -> MetaFile {
    let indices = report
        .saved
        .iter()
        .filter_map(|name| registry.get(name).map(|e| (name.clone(), e.kind())))
        .collect();
    MetaFile {
        num_docs,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: SNAPSHOT_VERSION,
        format,
        indices,
    }
}

/// Load every `*_index.json` / `*_index.bin` artifact under the snapshot root.
/// The index name is the file name without the suffix.
///
/// With a manifest only artifacts in its format are read. Kinds come from the
/// manifest, then from the builder's fixed names, then from the JSON shape.
pub fn load_all(paths: &IndexPaths) -> Result<IndexRegistry> {
    let meta = match load_meta(paths) {
        Ok(meta) => Some(meta),
        Err(EngineError::Resource { .. }) => None,
        Err(e) => return Err(e),
    };

    let entries = fs::read_dir(&paths.root).map_err(|e| EngineError::resource(&paths.root, e))?;
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        files.push(entry?.path());
    }
    files.sort();

    let mut registry = IndexRegistry::new();
    for file in files {
        if !file.is_file() { continue; }
        let Some(file_name) = file.file_name().and_then(|s| s.to_str()) else { continue };
        let (name, format) = if let Some(name) = file_name.strip_suffix(JSON_SUFFIX) {
            (name, SnapshotFormat::Json)
        } else if let Some(name) = file_name.strip_suffix(BINARY_SUFFIX) {
            (name, SnapshotFormat::Binary)
        } else {
            continue;
        };
        if let Some(meta) = &meta {
            if meta.format != format {
                tracing::warn!(file = %file.display(), "artifact not in the manifest format, skipped");
                continue;
            }
        }
        if registry.get(name).is_some() {
            return Err(EngineError::AmbiguousIndex(name.to_string()));
        }

        let kind = meta
            .as_ref()
            .and_then(|m| m.indices.get(name).copied())
            .or_else(|| registry::kind_for_name(name));
        let entry = match (kind, format) {
            (Some(kind), _) => load_index(paths, name, kind, format)?,
            (None, SnapshotFormat::Json) => {
                let bytes = fs::read(&file)?;
                infer_json_entry(&bytes)?
            }
            (None, SnapshotFormat::Binary) => {
                tracing::warn!(file = %file.display(), "binary index of unknown kind, skipped");
                continue;
            }
        };
        tracing::debug!(%name, kind = %entry.kind(), keys = entry.len(), "loaded index");
        registry.insert(name, entry);
    }

    if registry.is_empty() {
        return Err(EngineError::EmptySnapshot(paths.root.clone()));
    }
    tracing::info!(indices = registry.len(), root = %paths.root.display(), "loaded snapshot");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ReviewStats;

    fn registry() -> IndexRegistry {
        let mut title = InvertedIndex::new();
        title.insert("boot", "u1");
        let mut pos = PositionIndex::new();
        pos.insert("boot", "u1", 4);
        let mut reviews = ReviewAggregate::new();
        reviews.insert("u1", ReviewStats { review_count: 1, mean_rating: 4.0, last_rating: 4 });
        let mut reg = IndexRegistry::new();
        reg.insert("title", title);
        reg.insert("title_position", pos);
        reg.insert("reviews", reviews);
        reg
    }

    #[test]
    fn artifact_names_follow_suffix_convention() {
        let paths = IndexPaths::new("/snap");
        assert_eq!(paths.index("title", SnapshotFormat::Json), PathBuf::from("/snap/title_index.json"));
        assert_eq!(paths.index("reviews", SnapshotFormat::Binary), PathBuf::from("/snap/reviews_index.bin"));
    }

    #[test]
    fn json_shapes_are_inferred_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let report = save_registry(&paths, &registry(), SnapshotFormat::Json);
        assert!(report.is_complete());
        // no meta.json written: kinds come from the artifact shapes
        assert_eq!(load_all(&paths).unwrap(), registry());
    }

    #[test]
    fn binary_round_trip_uses_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let reg = registry();
        let report = save_registry(&paths, &reg, SnapshotFormat::Binary);
        save_meta(&paths, &meta_for(&reg, &report, 1, SnapshotFormat::Binary)).unwrap();
        assert_eq!(load_all(&paths).unwrap(), reg);
    }

    #[test]
    fn save_failure_does_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        // a directory squatting on one artifact's file name makes that write fail
        fs::create_dir(dir.path().join("reviews_index.json")).unwrap();
        let paths = IndexPaths::new(dir.path());
        let report = save_registry(&paths, &registry(), SnapshotFormat::Json);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "reviews");
        assert_eq!(report.saved, vec!["title".to_string(), "title_position".to_string()]);
    }

    fn single(name: &str, title: &str) -> IndexRegistry {
        let mut index = InvertedIndex::new();
        index.insert(title, "u1");
        let mut reg = IndexRegistry::new();
        reg.insert(name, index);
        reg
    }

    #[test]
    fn manifest_format_wins_over_stale_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        // an older JSON build left behind, then a binary rebuild in place
        save_registry(&paths, &single("title", "boots"), SnapshotFormat::Json);
        let rebuilt = single("title", "sneakers");
        let report = save_registry(&paths, &rebuilt, SnapshotFormat::Binary);
        save_meta(&paths, &meta_for(&rebuilt, &report, 1, SnapshotFormat::Binary)).unwrap();

        let loaded = load_all(&paths).unwrap();
        let title = loaded.inverted("title").unwrap();
        assert!(title.contains_key("sneakers"));
        assert!(!title.contains_key("boots"));
    }

    #[test]
    fn both_formats_without_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_registry(&paths, &single("title", "boots"), SnapshotFormat::Json);
        save_registry(&paths, &single("title", "sneakers"), SnapshotFormat::Binary);
        assert!(matches!(load_all(&paths), Err(EngineError::AmbiguousIndex(name)) if name == "title"));
    }

    #[test]
    fn empty_reviews_load_as_reviews_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut reg = registry();
        reg.insert("reviews", ReviewAggregate::new());
        reg.insert("description_position", PositionIndex::new());
        assert!(save_registry(&paths, &reg, SnapshotFormat::Json).is_complete());
        assert_eq!(fs::read_to_string(paths.index("reviews", SnapshotFormat::Json)).unwrap(), "{}");

        let loaded = load_all(&paths).unwrap();
        assert_eq!(loaded.get("reviews").map(IndexEntry::kind), Some(IndexKind::Reviews));
        assert_eq!(loaded.get("description_position").map(IndexEntry::kind), Some(IndexKind::Position));
        assert_eq!(loaded, reg);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_all(&IndexPaths::new(dir.path())), Err(EngineError::EmptySnapshot(_))));
    }
}
