use super::{Store, StoreAdapter};
use crate::error::StoreError;
use crate::types::{CommitRecord, RECORD_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk envelope of a JSON store
#[derive(Debug, Serialize, Deserialize)]
struct Document {
    schema_version: u32,
    collection: String,
    records: Vec<CommitRecord>,
}

/// Store kept as one versioned JSON document
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
    collection: String,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>, collection: &str) -> Self {
        Self {
            path: path.into(),
            collection: collection.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn load_error(&self, reason: impl std::fmt::Display) -> StoreError {
        StoreError::LoadFailed {
            location: self.location(),
            reason: reason.to_string(),
        }
    }

    fn save_error(&self, reason: impl std::fmt::Display) -> StoreError {
        StoreError::SaveFailed {
            location: self.location(),
            reason: reason.to_string(),
        }
    }

    fn mismatch(&self, reason: impl std::fmt::Display) -> StoreError {
        StoreError::SchemaMismatch {
            location: self.location(),
            reason: reason.to_string(),
        }
    }
}

impl StoreAdapter for JsonStore {
    fn load(&self) -> Result<Store, StoreError> {
        if !self.path.exists() {
            tracing::debug!("JSON store {:?} not found, starting empty", self.path);
            return Ok(Store::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| self.load_error(e))?;

        // Check the envelope before typing the records so a version bump is
        // reported as such rather than as a field error
        let raw: serde_json::Value = serde_json::from_str(&content).map_err(|e| self.load_error(e))?;
        let version = raw
            .get("schema_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| self.mismatch("missing schema_version"))?;
        if version != u64::from(RECORD_SCHEMA_VERSION) {
            return Err(self.mismatch(format!(
                "schema version {} (expected {})",
                version, RECORD_SCHEMA_VERSION
            )));
        }

        let document: Document = serde_json::from_value(raw).map_err(|e| self.mismatch(e))?;
        if document.collection != self.collection {
            return Err(self.mismatch(format!(
                "file holds collection '{}', not '{}'",
                document.collection, self.collection
            )));
        }

        tracing::info!(
            "Loaded {} commit records from {:?}",
            document.records.len(),
            self.path
        );
        Ok(Store::from_records(document.records))
    }

    fn save(&self, store: &Store) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.save_error(e))?;
        }

        let document = Document {
            schema_version: RECORD_SCHEMA_VERSION,
            collection: self.collection.clone(),
            records: store.records().to_vec(),
        };
        let content = serde_json::to_string_pretty(&document).map_err(|e| self.save_error(e))?;

        // Readers never observe a half-written file
        let temp_path = self.temp_path();
        fs::write(&temp_path, content).map_err(|e| self.save_error(e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| self.save_error(e))?;

        tracing::debug!("Saved {} commit records to {:?}", store.len(), self.path);
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn describe(&self) -> String {
        format!("COLLECTION='{}'", self.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::sample_record;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("commits.json"), "commits");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("commits.json");
        let adapter = JsonStore::new(&path, "commits");

        let mut second = sample_record();
        second.commit_hash = "fedcba9876543210fedcba9876543210fedcba98".to_string();
        let store = Store::from_records(vec![sample_record(), second]);

        adapter.save(&store).unwrap();
        assert!(path.exists());
        assert!(!adapter.temp_path().exists());

        assert_eq!(adapter.load().unwrap(), store);
    }

    #[test]
    fn test_envelope_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("commits.json");
        let adapter = JsonStore::new(&path, "history");
        adapter.save(&Store::from_records(vec![sample_record()])).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["schema_version"], 1);
        assert_eq!(raw["collection"], "history");
        assert_eq!(raw["records"][0]["labels"], serde_json::json!(["team-a"]));
    }

    #[test]
    fn test_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("commits.json");
        fs::write(&path, r#"{"schema_version": 2, "collection": "commits", "records": []}"#).unwrap();

        let err = JsonStore::new(&path, "commits").load().unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("commits.json");
        let adapter = JsonStore::new(&path, "commits");
        adapter.save(&Store::from_records(vec![sample_record()])).unwrap();

        let content = fs::read_to_string(&path)
            .unwrap()
            .replace("\"num_lines_deleted\": 1", "\"num_lines_deleted\": -1");
        fs::write(&path, content).unwrap();

        assert!(matches!(
            adapter.load().unwrap_err(),
            StoreError::SchemaMismatch { .. }
        ));
    }

    #[test]
    fn test_other_collection_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("commits.json");
        JsonStore::new(&path, "commits").save(&Store::new()).unwrap();

        assert!(matches!(
            JsonStore::new(&path, "other").load().unwrap_err(),
            StoreError::SchemaMismatch { .. }
        ));
    }

    #[test]
    fn test_garbage_file_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("commits.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            JsonStore::new(&path, "commits").load().unwrap_err(),
            StoreError::LoadFailed { .. }
        ));
    }
}
