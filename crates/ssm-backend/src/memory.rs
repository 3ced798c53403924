//! In-memory stores
//!
//! [`MemoryStore`] behaves like the parameter store or the secrets store
//! depending on its [`StoreType`]:
//!
//! - Parameter store: versions are numbered, a create with overwrite enabled
//!   replaces the value, encrypted values are masked unless decryption is
//!   requested.
//! - Secrets store: versions carry uuid ids and the `AWSCURRENT` /
//!   `AWSPREVIOUS` stage labels, a create on an existing secret fails.
//!
//! Failure injection hooks let tests exercise retries and per-field errors.

use crate::backend::Backend;
use crate::error::BackendError;
use crate::types::{
    DeleteOutput, GetOutput, GetRequest, ListEntry, ListPage, PutEntry, RemoteValue, ValueType,
    VersionSelector,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use ssm_tag::{StoreType, Tier};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Stage label of the current secret version
pub const CURRENT_STAGE: &str = "AWSCURRENT";
/// Stage label of the previous secret version
pub const PREVIOUS_STAGE: &str = "AWSPREVIOUS";
/// Text returned for encrypted parameters read without decryption
pub const MASKED_VALUE: &str = "****";

/// One stored version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVersion {
    /// Version id
    pub id: String,
    /// Stored text
    pub value: String,
    /// Stage labels attached to the version
    pub stages: Vec<String>,
}

/// One stored path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Versions, oldest first
    pub versions: Vec<StoredVersion>,
    /// Plain or encrypted
    pub value_type: ValueType,
    /// Key id used for encryption
    pub key_id: Option<String>,
    /// Metadata
    pub tags: IndexMap<String, String>,
    /// Tier
    pub tier: Option<Tier>,
    /// Description
    pub description: Option<String>,
    /// Last write time
    pub last_modified: DateTime<Utc>,
}

impl StoredEntry {
    /// Latest version
    #[must_use]
    pub fn latest(&self) -> Option<&StoredVersion> {
        self.versions.last()
    }

    fn select(&self, selector: &VersionSelector) -> Option<&StoredVersion> {
        if let Some(id) = &selector.id {
            return self.versions.iter().find(|v| v.id == *id);
        }
        if let Some(stage) = &selector.stage {
            return self
                .versions
                .iter()
                .rev()
                .find(|v| v.stages.iter().any(|s| s == stage));
        }
        self.latest()
    }
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, StoredEntry>,
    unavailable_gets: usize,
    rejected: BTreeSet<String>,
    last_get: Option<GetRequest>,
    writes: usize,
}

/// In-memory store
#[derive(Debug)]
pub struct MemoryStore {
    store_type: StoreType,
    page_size: usize,
    state: Mutex<State>,
}

impl MemoryStore {
    /// Default listing page size
    pub const DEFAULT_PAGE_SIZE: usize = 10;

    /// Empty store of the given type
    #[must_use]
    pub fn new(store_type: StoreType) -> Self {
        Self {
            store_type,
            page_size: Self::DEFAULT_PAGE_SIZE,
            state: Mutex::new(State::default()),
        }
    }

    /// Empty parameter store
    #[must_use]
    pub fn parameters() -> Self {
        Self::new(StoreType::Pms)
    }

    /// Empty secrets store
    #[must_use]
    pub fn secrets() -> Self {
        Self::new(StoreType::Asm)
    }

    /// Listing page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Store a plain value directly
    pub fn insert(&self, path: impl Into<String>, value: impl Into<String>) {
        let entry = PutEntry::new(path, value);
        let mut state = self.state.lock();
        self.write(&mut state, &entry, true);
    }

    /// Store an encrypted value directly
    pub fn insert_secure(&self, path: impl Into<String>, value: impl Into<String>) {
        let mut entry = PutEntry::new(path, value);
        entry.value_type = ValueType::SecureString;
        let mut state = self.state.lock();
        self.write(&mut state, &entry, true);
    }

    /// Latest value of `path`
    #[must_use]
    pub fn value(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .entries
            .get(path)
            .and_then(StoredEntry::latest)
            .map(|v| v.value.clone())
    }

    /// Full record of `path`
    #[must_use]
    pub fn entry(&self, path: &str) -> Option<StoredEntry> {
        self.state.lock().entries.get(path).cloned()
    }

    /// All stored paths in order
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.state.lock().entries.keys().cloned().collect()
    }

    /// Number of stored paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Fail the next `count` reads with [`BackendError::Unavailable`]
    pub fn fail_next_gets(&self, count: usize) {
        self.state.lock().unavailable_gets = count;
    }

    /// Reject every create and update of `path`
    pub fn reject_writes_to(&self, path: impl Into<String>) {
        self.state.lock().rejected.insert(path.into());
    }

    /// Most recent read request
    #[must_use]
    pub fn last_get(&self) -> Option<GetRequest> {
        self.state.lock().last_get.clone()
    }

    /// Number of successful creates and updates
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    fn check_rejected(state: &State, path: &str) -> Result<(), BackendError> {
        if state.rejected.contains(path) {
            return Err(BackendError::write_rejected(path, "rejected by store policy"));
        }
        Ok(())
    }

    fn next_version_id(&self, entry: Option<&StoredEntry>, token: Option<Uuid>) -> String {
        match self.store_type {
            StoreType::Pms => (entry.map_or(0, |e| e.versions.len()) + 1).to_string(),
            StoreType::Asm => token.unwrap_or_else(Uuid::new_v4).to_string(),
        }
    }

    fn write(&self, state: &mut State, put: &PutEntry, merge_tags: bool) {
        let id = self.next_version_id(state.entries.get(&put.path), put.client_token);
        let now = Utc::now();
        let store_type = self.store_type;

        let entry = state
            .entries
            .entry(put.path.clone())
            .or_insert_with(|| StoredEntry {
                versions: Vec::new(),
                value_type: put.value_type,
                key_id: None,
                tags: IndexMap::new(),
                tier: None,
                description: None,
                last_modified: now,
            });

        let mut stages = Vec::new();
        if store_type == StoreType::Asm {
            for version in &mut entry.versions {
                version.stages.retain(|s| s != PREVIOUS_STAGE);
                if let Some(pos) = version.stages.iter().position(|s| s == CURRENT_STAGE) {
                    version.stages[pos] = PREVIOUS_STAGE.to_string();
                }
            }
            stages.push(CURRENT_STAGE.to_string());
        }

        entry.versions.push(StoredVersion {
            id,
            value: put.value.clone(),
            stages,
        });
        entry.value_type = put.value_type;
        if put.key_id.is_some() {
            entry.key_id.clone_from(&put.key_id);
        }
        if put.tier.is_some() {
            entry.tier = put.tier;
        }
        if put.description.is_some() {
            entry.description.clone_from(&put.description);
        }
        if merge_tags {
            entry
                .tags
                .extend(put.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        entry.last_modified = now;
        state.writes += 1;
    }
}

#[async_trait]
impl Backend for MemoryStore {
    fn store_type(&self) -> StoreType {
        self.store_type
    }

    async fn get(&self, request: &GetRequest) -> Result<GetOutput, BackendError> {
        let mut state = self.state.lock();
        state.last_get = Some(request.clone());
        if state.unavailable_gets > 0 {
            state.unavailable_gets -= 1;
            return Err(BackendError::Unavailable(format!(
                "{} store is throttling reads",
                self.store_type
            )));
        }

        let mut output = GetOutput::default();
        for wanted in &request.entries {
            let found = state
                .entries
                .get(&wanted.path)
                .and_then(|e| e.select(&wanted.version).map(|v| (e, v)));
            match found {
                Some((entry, version)) => {
                    let masked = self.store_type == StoreType::Pms
                        && entry.value_type == ValueType::SecureString
                        && !request.decrypt;
                    output.values.insert(
                        wanted.path.clone(),
                        RemoteValue {
                            value: if masked {
                                MASKED_VALUE.to_string()
                            } else {
                                version.value.clone()
                            },
                            version: Some(version.id.clone()),
                        },
                    );
                }
                None => output.unresolved.push(wanted.path.clone()),
            }
        }
        Ok(output)
    }

    async fn create(&self, entry: &PutEntry) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        Self::check_rejected(&state, &entry.path)?;

        let exists = state.entries.contains_key(&entry.path);
        let replace_allowed = self.store_type == StoreType::Pms && entry.overwrite;
        if exists && !replace_allowed {
            return Err(BackendError::AlreadyExists(entry.path.clone()));
        }

        tracing::trace!(path = %entry.path, store = %self.store_type, "create");
        self.write(&mut state, entry, true);
        Ok(())
    }

    async fn update(&self, entry: &PutEntry) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        Self::check_rejected(&state, &entry.path)?;

        if self.store_type == StoreType::Asm && !state.entries.contains_key(&entry.path) {
            return Err(BackendError::NotFound(entry.path.clone()));
        }

        tracing::trace!(path = %entry.path, store = %self.store_type, "update");
        self.write(&mut state, entry, false);
        Ok(())
    }

    async fn tag(&self, path: &str, tags: &IndexMap<String, String>) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        let entry = state
            .entries
            .get_mut(path)
            .ok_or_else(|| BackendError::NotFound(path.to_string()))?;
        entry
            .tags
            .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn delete(&self, paths: &[String]) -> Result<DeleteOutput, BackendError> {
        let mut state = self.state.lock();
        let mut output = DeleteOutput::default();
        for path in paths {
            if state.entries.remove(path).is_none() {
                output.unresolved.push(path.clone());
            }
        }
        Ok(output)
    }

    async fn list(
        &self,
        prefixes: &[String],
        next_token: Option<&str>,
    ) -> Result<ListPage, BackendError> {
        let state = self.state.lock();
        let mut entries: Vec<ListEntry> = state
            .entries
            .iter()
            .filter(|(name, _)| next_token.map_or(true, |after| name.as_str() > after))
            .filter(|(name, _)| {
                prefixes.is_empty() || prefixes.iter().any(|p| name.starts_with(p.as_str()))
            })
            .take(self.page_size + 1)
            .map(|(name, entry)| ListEntry {
                name: name.clone(),
                version: entry.latest().map(|v| v.id.clone()),
                last_modified: Some(entry.last_modified),
            })
            .collect();

        let next_token = if entries.len() > self.page_size {
            entries.truncate(self.page_size);
            entries.last().map(|e| e.name.clone())
        } else {
            None
        };
        Ok(ListPage {
            entries,
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GetEntry;
    use pretty_assertions::assert_eq;

    fn get(paths: &[&str], decrypt: bool) -> GetRequest {
        GetRequest {
            entries: paths.iter().map(|p| GetEntry::latest(*p)).collect(),
            decrypt,
        }
    }

    #[tokio::test]
    async fn get_reports_missing_paths() {
        let store = MemoryStore::parameters();
        store.insert("/dev/svc/a", "1");

        let out = store.get(&get(&["/dev/svc/a", "/dev/svc/b"], false)).await.unwrap();
        assert_eq!(out.values["/dev/svc/a"].value, "1");
        assert_eq!(out.unresolved, vec!["/dev/svc/b".to_string()]);
    }

    #[tokio::test]
    async fn secure_parameters_are_masked_without_decrypt() {
        let store = MemoryStore::parameters();
        store.insert_secure("/dev/svc/pw", "hunter2");

        let masked = store.get(&get(&["/dev/svc/pw"], false)).await.unwrap();
        assert_eq!(masked.values["/dev/svc/pw"].value, MASKED_VALUE);
        let clear = store.get(&get(&["/dev/svc/pw"], true)).await.unwrap();
        assert_eq!(clear.values["/dev/svc/pw"].value, "hunter2");
    }

    #[tokio::test]
    async fn parameter_create_respects_overwrite() {
        let store = MemoryStore::parameters();
        store.create(&PutEntry::new("/p", "1")).await.unwrap();
        store.create(&PutEntry::new("/p", "2")).await.unwrap();
        assert_eq!(store.value("/p").as_deref(), Some("2"));

        let mut strict = PutEntry::new("/p", "3");
        strict.overwrite = false;
        assert_eq!(
            store.create(&strict).await,
            Err(BackendError::AlreadyExists("/p".into()))
        );
        assert_eq!(store.entry("/p").unwrap().versions.len(), 2);
    }

    #[tokio::test]
    async fn overwriting_create_merges_tags() {
        let store = MemoryStore::parameters();
        let mut first = PutEntry::new("/p", "1");
        first.tags.insert("team".into(), "core".into());
        store.create(&first).await.unwrap();

        let mut second = PutEntry::new("/p", "2");
        second.tags.insert("team".into(), "infra".into());
        second.tags.insert("cost".into(), "low".into());
        store.create(&second).await.unwrap();

        let entry = store.entry("/p").unwrap();
        assert_eq!(entry.tags.get("team").map(String::as_str), Some("infra"));
        assert_eq!(entry.tags.get("cost").map(String::as_str), Some("low"));
    }

    #[tokio::test]
    async fn secret_versions_rotate_stages() {
        let store = MemoryStore::secrets();
        store.create(&PutEntry::new("/s", "one")).await.unwrap();
        assert!(matches!(
            store.create(&PutEntry::new("/s", "two")).await,
            Err(BackendError::AlreadyExists(_))
        ));
        store.update(&PutEntry::new("/s", "two")).await.unwrap();

        let previous = GetRequest {
            entries: vec![GetEntry {
                path: "/s".into(),
                version: VersionSelector {
                    id: None,
                    stage: Some(PREVIOUS_STAGE.into()),
                },
            }],
            decrypt: true,
        };
        let out = store.get(&previous).await.unwrap();
        assert_eq!(out.values["/s"].value, "one");
        assert_eq!(store.value("/s").as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn secret_update_requires_existing_path() {
        let store = MemoryStore::secrets();
        assert!(store
            .update(&PutEntry::new("/missing", "x"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn injected_unavailability_is_consumed() {
        let store = MemoryStore::parameters();
        store.fail_next_gets(1);
        assert!(store.get(&get(&["/a"], false)).await.unwrap_err().is_transient());
        assert!(store.get(&get(&["/a"], false)).await.is_ok());
    }

    #[tokio::test]
    async fn list_paginates_and_filters() {
        let store = MemoryStore::parameters().with_page_size(2);
        for name in ["/dev/a/1", "/dev/a/2", "/dev/a/3", "/dev/b/1"] {
            store.insert(name, "v");
        }

        let prefixes = vec!["/dev/a".to_string()];
        let first = store.list(&prefixes, None).await.unwrap();
        assert_eq!(first.entries.len(), 2);
        let token = first.next_token.unwrap();
        let second = store.list(&prefixes, Some(token.as_str())).await.unwrap();
        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].name, "/dev/a/3");
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn continuation_survives_deletes() {
        let store = MemoryStore::parameters().with_page_size(1);
        for name in ["/a", "/b", "/c"] {
            store.insert(name, "v");
        }

        let mut token: Option<String> = None;
        let mut seen = Vec::new();
        loop {
            let page = store.list(&[], token.as_deref()).await.unwrap();
            let names: Vec<String> = page.entries.iter().map(|e| e.name.clone()).collect();
            store.delete(&names).await.unwrap();
            seen.extend(names);
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }
        assert_eq!(seen, vec!["/a", "/b", "/c"]);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_reports_unresolved() {
        let store = MemoryStore::parameters();
        store.insert("/a", "1");
        let out = store
            .delete(&["/a".to_string(), "/b".to_string()])
            .await
            .unwrap();
        assert_eq!(out.unresolved, vec!["/b".to_string()]);
        assert!(store.is_empty());
    }
}
