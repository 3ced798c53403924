//! Synchronization against one store

use crate::config::SerializerConfig;
use crate::error::SsmError;
use crate::request::{get_entry, put_entry};
use crate::result::{FieldResult, FieldResults};
use crate::retry::retry;
use ssm_backend::{Backend, BackendError, GetRequest, PutEntry};
use ssm_reflect::{from_wire, to_wire, Field, Node, NodeId, NodeTree};
use ssm_tag::{StoreTag, StoreType};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub(crate) struct Repository<'a> {
    store: StoreType,
    backend: &'a dyn Backend,
    config: &'a SerializerConfig,
}

impl<'a> Repository<'a> {
    pub(crate) fn new(store: StoreType, backend: &'a dyn Backend, config: &'a SerializerConfig) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    fn tagged<'t>(&self, tree: &'t NodeTree, id: NodeId) -> Option<(&'t Node, &'t StoreTag)> {
        let node = tree.get(id)?;
        let tag = node.tag(self.store.namespace())?;
        Some((node, tag))
    }

    /// Read every selected path and apply the values onto `root`
    pub(crate) async fn fetch(
        &self,
        tree: &NodeTree,
        paths: &BTreeMap<String, NodeId>,
        root: &mut dyn Field,
    ) -> Result<FieldResults, SsmError> {
        let mut results = FieldResults::new();
        if paths.is_empty() {
            return Ok(results);
        }

        let mut request = GetRequest::default();
        for (path, id) in paths {
            if let Some((_, tag)) = self.tagged(tree, *id) {
                request.decrypt |= tag.secure();
                request.entries.push(get_entry(tag, path));
            }
        }

        let backend = self.backend;
        let request = &request;
        let output = retry("get", &self.config.retry, move || backend.get(request))
            .await
            .map_err(|source| SsmError::backend(self.store, source))?;
        debug!(
            store = %self.store,
            found = output.values.len(),
            unresolved = output.unresolved.len(),
            decrypt = request.decrypt,
            "fetched"
        );

        for (path, id) in paths {
            let Some((node, _)) = self.tagged(tree, *id) else {
                continue;
            };
            let Some(remote) = output.values.get(path) else {
                if node.is_absent() {
                    debug!(field = %node.local_path(), path = %path, "optional stays absent");
                    continue;
                }
                results.insert(
                    node.local_path().to_string(),
                    FieldResult::missing(node, path, self.store),
                );
                continue;
            };
            let Some(field) = node.resolve_mut(root) else {
                warn!(field = %node.local_path(), "field vanished while populating");
                continue;
            };
            if let Err(err) = from_wire(node.local_path(), field, &remote.value) {
                warn!(field = %node.local_path(), path = %path, error = %err, "could not apply value");
                results.insert(
                    node.local_path().to_string(),
                    FieldResult::failed(node, path, self.store, err),
                );
            }
        }
        Ok(results)
    }

    /// Write every selected field of `root`
    pub(crate) async fn upsert(
        &self,
        tree: &NodeTree,
        paths: &BTreeMap<String, NodeId>,
        root: &dyn Field,
    ) -> FieldResults {
        let mut results = FieldResults::new();

        for (path, id) in paths {
            let Some((node, tag)) = self.tagged(tree, *id) else {
                continue;
            };
            let Some(field) = node.resolve(root) else {
                continue;
            };

            let value = match to_wire(node.local_path(), field) {
                Ok(value) => value,
                Err(err) => {
                    results.insert(
                        node.local_path().to_string(),
                        FieldResult::failed(node, path, self.store, err),
                    );
                    continue;
                }
            };
            let entry = match put_entry(tag, path, value, self.config) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(field = %node.local_path(), path = %path, error = %err, "rejected before write");
                    results.insert(
                        node.local_path().to_string(),
                        FieldResult::failed(node, path, self.store, err),
                    );
                    continue;
                }
            };

            match self.write(&entry).await {
                Ok(()) => debug!(store = %self.store, path = %path, "written"),
                Err(err) => {
                    warn!(store = %self.store, path = %path, error = %err, "write failed");
                    results.insert(
                        node.local_path().to_string(),
                        FieldResult::failed(node, path, self.store, err),
                    );
                }
            }
        }
        results
    }

    async fn write(&self, entry: &PutEntry) -> Result<(), BackendError> {
        let backend = self.backend;
        let policy = &self.config.retry;

        let Err(err) = retry("create", policy, move || backend.create(entry)).await else {
            return Ok(());
        };
        if !entry.overwrite {
            return Err(err);
        }

        debug!(path = %entry.path, reason = %err, "create failed, updating instead");
        retry("update", policy, move || backend.update(entry)).await?;
        if !entry.tags.is_empty() {
            retry("tag", policy, move || backend.tag(&entry.path, &entry.tags)).await?;
        }
        Ok(())
    }

    /// Delete every selected path; paths already absent are reported missing
    pub(crate) async fn delete(
        &self,
        tree: &NodeTree,
        paths: &BTreeMap<String, NodeId>,
    ) -> Result<FieldResults, SsmError> {
        let mut results = FieldResults::new();
        if paths.is_empty() {
            return Ok(results);
        }

        let names: Vec<String> = paths.keys().cloned().collect();
        let unresolved = self.delete_batch(&names).await?;
        for path in &unresolved {
            let Some((node, _)) = paths.get(path).and_then(|id| self.tagged(tree, *id)) else {
                continue;
            };
            debug!(store = %self.store, path = %path, "already absent");
            results.insert(
                node.local_path().to_string(),
                FieldResult::missing(node, path, self.store),
            );
        }
        Ok(results)
    }

    /// Delete every remote path beginning with one of `prefixes`
    pub(crate) async fn delete_tree(&self, prefixes: &[String]) -> Result<usize, SsmError> {
        let backend = self.backend;
        let policy = &self.config.retry;
        let mut token: Option<String> = None;
        let mut deleted = 0;

        loop {
            let next = token.as_deref();
            let page = retry("list", policy, move || backend.list(prefixes, next))
                .await
                .map_err(|source| SsmError::backend(self.store, source))?;

            let names: Vec<String> = page
                .entries
                .into_iter()
                .map(|e| e.name)
                .filter(|name| prefixes.iter().any(|p| name.starts_with(p.as_str())))
                .collect();

            if names.is_empty() {
                debug!(store = %self.store, "nothing to delete on this page");
            } else {
                let unresolved = self.delete_batch(&names).await?;
                deleted += names.len().saturating_sub(unresolved.len());
            }

            match page.next_token {
                Some(cursor) => token = Some(cursor),
                None => break,
            }
        }

        debug!(store = %self.store, deleted, "deleted tree");
        Ok(deleted)
    }

    async fn delete_batch(&self, names: &[String]) -> Result<Vec<String>, SsmError> {
        let backend = self.backend;
        retry("delete", &self.config.retry, move || backend.delete(names))
            .await
            .map(|output| output.unresolved)
            .map_err(|source| SsmError::backend(self.store, source))
    }
}
