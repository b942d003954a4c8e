//! Durable per-job run history.
//!
//! The state store is an ordered mapping of job name to [`RunRecord`],
//! persisted as a whole JSON document on every mutation. Saves are atomic
//! (write a sibling temp file, then rename over the primary) so readers
//! never observe a partial document. An optional [`StateMirror`] receives a
//! best-effort copy after every save and is consulted once, on load, when
//! the primary file is missing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, SchedulerError};
use crate::jobs::JobError;
use crate::mirror::StateMirror;

/// The persisted history/state for a single job.
///
/// Created on a job's first execution attempt, mutated by the orchestrator
/// after every attempt, never deleted by the core. Instants carry full
/// sub-second precision through serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// First execution attempt ever; set once.
    pub first_run: DateTime<Utc>,
    /// Most recent execution attempt, success or not.
    pub last_run: DateTime<Utc>,
    /// Most recent successful execution; retained across failures.
    pub last_success: Option<DateTime<Utc>>,
    /// When the job is next due; recomputed after every attempt.
    pub next_run: DateTime<Utc>,
    /// Failure detail from the last attempt, cleared on success.
    pub last_error: Option<JobError>,
    /// Consecutive failures; reset to zero on success.
    pub error_count: u32,
    /// The dependency list as configured at the time of the run, recorded
    /// for external tooling that inspects the document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// Ordered mapping of job name to run record, persisted as one document.
pub struct StateStore {
    path: PathBuf,
    records: BTreeMap<String, RunRecord>,
    mirror: Option<Arc<dyn StateMirror>>,
}

impl StateStore {
    /// Load the state store from `path`.
    ///
    /// An absent primary document is hydrated from the mirror when one is
    /// configured, falling back to an empty store. A present-but-malformed
    /// document (primary or mirrored) fails with `CorruptState`; history is
    /// never silently reset.
    pub async fn load(path: impl Into<PathBuf>, mirror: Option<Arc<dyn StateMirror>>) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path,
            records: BTreeMap::new(),
            mirror,
        };

        match std::fs::read_to_string(&store.path) {
            Ok(text) => {
                store.records = parse_document(&store.path, &text)?;
                debug!(path = %store.path.display(), jobs = store.records.len(), "loaded state document");
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                store.hydrate_from_mirror().await?;
            }
            Err(err) => return Err(err.into()),
        }

        Ok(store)
    }

    async fn hydrate_from_mirror(&mut self) -> Result<()> {
        let Some(mirror) = self.mirror.clone() else {
            return Ok(());
        };
        match mirror.read(self.key()).await {
            Ok(Some(document)) => {
                self.records = parse_document(&self.path, &document)?;
                info!(
                    path = %self.path.display(),
                    jobs = self.records.len(),
                    "state document hydrated from mirror"
                );
                // Re-establish the primary so the next load does not need
                // the mirror.
                self.write_primary(&document)?;
            }
            Ok(None) => {
                debug!("no primary state document and nothing mirrored; starting empty");
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "mirror read failed; starting empty");
            }
        }
        Ok(())
    }

    /// The mirror key for this document: its file name.
    pub fn key(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("crashtab-state")
    }

    /// Path of the primary document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&RunRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, record: RunRecord) {
        self.records.insert(name.into(), record);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RunRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize the whole mapping and atomically replace the persisted
    /// document, then mirror it (best effort; mirror failures are logged
    /// and never fail the save).
    pub async fn save(&self) -> Result<()> {
        let document = serde_json::to_string_pretty(&self.records)
            .map_err(SchedulerError::Serialization)?;
        self.write_primary(&document)?;

        if let Some(mirror) = &self.mirror {
            if let Err(err) = mirror.write(self.key(), &document).await {
                warn!(
                    key = self.key(),
                    error = %format!("{err:#}"),
                    "state mirror write failed; primary save is intact"
                );
            }
        }
        Ok(())
    }

    fn write_primary(&self, document: &str) -> Result<()> {
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, document)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("path", &self.path)
            .field("jobs", &self.records.len())
            .field("mirrored", &self.mirror.is_some())
            .finish()
    }
}

fn parse_document(path: &Path, text: &str) -> Result<BTreeMap<String, RunRecord>> {
    serde_json::from_str(text).map_err(|err| SchedulerError::CorruptState {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::MemoryMirror;
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn record(next_run: DateTime<Utc>) -> RunRecord {
        RunRecord {
            first_run: next_run - chrono::Duration::days(1),
            last_run: next_run - chrono::Duration::days(1),
            last_success: Some(next_run - chrono::Duration::days(1)),
            next_run,
            last_error: None,
            error_count: 0,
            depends_on: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip_subsecond() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        // Deliberately not on a second boundary.
        let instant = Utc
            .with_ymd_and_hms(2026, 5, 4, 3, 2, 1)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(123_456))
            .unwrap();

        let mut store = StateStore::load(&path, None).await.unwrap();
        store.set("matview-refresh", record(instant));
        store.save().await.unwrap();

        let reloaded = StateStore::load(&path, None).await.unwrap();
        assert_eq!(
            reloaded.get("matview-refresh").unwrap().next_run,
            instant,
            "sub-second precision must survive the round trip"
        );
    }

    #[tokio::test]
    async fn test_absent_primary_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path().join("state.json"), None)
            .await
            .unwrap();
        assert!(store.is_empty());
        let summary = format!("{store:?}");
        assert!(summary.contains("jobs: 0"));
        assert!(summary.contains("mirrored: false"));
    }

    #[tokio::test]
    async fn test_corrupt_primary_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = StateStore::load(&path, None).await.unwrap_err();
        assert!(matches!(err, SchedulerError::CorruptState { .. }));
    }

    #[tokio::test]
    async fn test_hydration_from_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let instant = Utc.with_ymd_and_hms(2026, 5, 4, 3, 0, 0).unwrap();
        let mut seeded: BTreeMap<String, RunRecord> = BTreeMap::new();
        seeded.insert("fetch-adi".to_string(), record(instant));
        let document = serde_json::to_string_pretty(&seeded).unwrap();

        let mirror = Arc::new(MemoryMirror::new());
        mirror.seed("state.json", &document).await;

        let store = StateStore::load(&path, Some(mirror)).await.unwrap();
        assert_eq!(store.get("fetch-adi").unwrap().next_run, instant);
        // Hydration re-establishes the primary document.
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StateStore::load(&path, None).await.unwrap();
        store.set("purge-expired-crashes", record(Utc::now()));
        store.save().await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["state.json".to_string()]);
    }

    struct BrokenMirror;

    #[async_trait]
    impl StateMirror for BrokenMirror {
        async fn read(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow::anyhow!("mirror down"))
        }
        async fn write(&self, _key: &str, _document: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("mirror down"))
        }
    }

    #[tokio::test]
    async fn test_mirror_failures_never_fail_the_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StateStore::load(&path, Some(Arc::new(BrokenMirror)))
            .await
            .unwrap();
        store.set("fetch-adi", record(Utc::now()));
        store.save().await.unwrap();
        assert!(path.exists());
    }
}
