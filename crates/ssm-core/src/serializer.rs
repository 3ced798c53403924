//! Public synchronization entry point

use crate::config::SerializerConfig;
use crate::error::SsmError;
use crate::repository::Repository;
use crate::result::FieldResults;
use ssm_backend::Backend;
use ssm_reflect::{Field, FieldFilters, NodeId, NodeTree, ParseError, Parser};
use ssm_tag::{StoreType, TagParser, TagParserRegistry};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Synchronizes annotated structures with the configured stores
///
/// Every call parses the structure afresh; nothing is cached between calls.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ssm_backend::MemoryStore;
/// use ssm_core::{Serializer, SerializerConfig};
///
/// let serializer = Serializer::new(SerializerConfig::new("dev", "svc1"))
///     .with_parameter_store(Arc::new(MemoryStore::parameters()))
///     .with_secret_store(Arc::new(MemoryStore::secrets()));
/// assert_eq!(serializer.config().service, "svc1");
/// ```
pub struct Serializer {
    config: SerializerConfig,
    parameters: Option<Arc<dyn Backend>>,
    secrets: Option<Arc<dyn Backend>>,
    custom: Vec<(String, Arc<dyn TagParser>)>,
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("config", &self.config)
            .field("parameters", &self.parameters.is_some())
            .field("secrets", &self.secrets.is_some())
            .field(
                "custom",
                &self.custom.iter().map(|(ns, _)| ns.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Serializer {
    /// Serializer without backends
    #[must_use]
    pub fn new(config: SerializerConfig) -> Self {
        Self {
            config,
            parameters: None,
            secrets: None,
            custom: Vec::new(),
        }
    }

    /// With parameter store backend
    #[must_use]
    pub fn with_parameter_store(mut self, backend: Arc<dyn Backend>) -> Self {
        self.parameters = Some(backend);
        self
    }

    /// With secret store backend
    #[must_use]
    pub fn with_secret_store(mut self, backend: Arc<dyn Backend>) -> Self {
        self.secrets = Some(backend);
        self
    }

    /// Register a parser for a custom namespace
    ///
    /// Fields tagged in the namespace appear in the parsed tree but are never
    /// synchronized. Registering `pms` or `asm` replaces the built-in parser.
    #[must_use]
    pub fn register_tag_parser(
        mut self,
        namespace: impl Into<String>,
        parser: impl TagParser,
    ) -> Self {
        let namespace = namespace.into();
        let parser: Arc<dyn TagParser> = Arc::new(parser);
        self.custom.retain(|(ns, _)| *ns != namespace);
        self.custom.push((namespace, parser));
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Parse `v` for every store and custom namespace
    ///
    /// # Errors
    /// Returns the walker's [`ParseError`].
    pub fn parse(&self, v: &dyn Field) -> Result<NodeTree, ParseError> {
        self.parser(&StoreType::all()).parse(v)
    }

    fn parser(&self, active: &[StoreType]) -> Parser {
        let mut registry = TagParserRegistry::for_stores(active);
        for (namespace, parser) in &self.custom {
            registry.register_boxed(namespace.clone(), Box::new(Arc::clone(parser)));
        }
        Parser::new(&self.config.environment, &self.config.service)
            .with_prefix(&self.config.prefix)
            .with_max_depth(self.config.max_depth)
            .with_registry(registry)
    }

    fn backend(&self, store: StoreType) -> Option<&dyn Backend> {
        match store {
            StoreType::Pms => self.parameters.as_deref(),
            StoreType::Asm => self.secrets.as_deref(),
        }
    }

    fn repository(
        &self,
        store: StoreType,
        paths: &BTreeMap<String, NodeId>,
    ) -> Result<Option<Repository<'_>>, SsmError> {
        if paths.is_empty() {
            return Ok(None);
        }
        let backend = self.backend(store).ok_or(SsmError::BackendMissing(store))?;
        Ok(Some(Repository::new(store, backend, &self.config)))
    }

    /// Populate every tagged field of `v` from the active stores
    ///
    /// # Errors
    /// See [`Serializer::unmarshal_with_opts`].
    pub async fn unmarshal(&self, v: &mut dyn Field) -> Result<FieldResults, SsmError> {
        self.unmarshal_with_opts(v, &FieldFilters::new(), &[]).await
    }

    /// Populate the fields of `v` admitted by `filter` from the stores in
    /// `usage` (the configured stores when empty)
    ///
    /// Paths that do not exist remotely and values that cannot be applied are
    /// reported in the returned map; the call itself still succeeds. Absent
    /// optionals are instantiated only when one of their fields receives a
    /// value and stay absent otherwise, without a missing outcome.
    ///
    /// # Errors
    /// Returns [`SsmError::Parse`] for an unusable root or a malformed tag,
    /// [`SsmError::BackendMissing`] when tagged fields target a store
    /// without backend and [`SsmError::Backend`] when a read fails.
    #[instrument(skip_all, fields(filter = %filter))]
    pub async fn unmarshal_with_opts(
        &self,
        v: &mut dyn Field,
        filter: &FieldFilters,
        usage: &[StoreType],
    ) -> Result<FieldResults, SsmError> {
        let active = self.config.active_stores(usage);
        let tree = self
            .parser(&active)
            .with_absent_optionals(self.config.materialize_optional)
            .parse(&*v)?;
        tree.dump();

        let mut results = FieldResults::new();
        for store in active {
            let paths = tree.parameter_map(store.namespace(), filter);
            let Some(repository) = self.repository(store, &paths)? else {
                continue;
            };
            // later stores overwrite earlier entries for the same field
            results.extend(repository.fetch(&tree, &paths, v).await?);
        }

        info!(outcomes = results.len(), "unmarshal finished");
        Ok(results)
    }

    /// Write every tagged field of `v` to the active stores
    ///
    /// # Errors
    /// See [`Serializer::marshal_with_opts`].
    pub async fn marshal(&self, v: &dyn Field) -> Result<FieldResults, SsmError> {
        self.marshal_with_opts(v, &FieldFilters::new(), &[]).await
    }

    /// Write the fields of `v` admitted by `filter` to the stores in `usage`
    /// (the configured stores when empty)
    ///
    /// Entries are created, or updated when they exist and overwrite is
    /// allowed. A failing field is reported in the returned map and does not
    /// stop its siblings.
    ///
    /// # Errors
    /// Returns [`SsmError::Parse`] for an unusable root or a malformed tag
    /// and [`SsmError::BackendMissing`] when tagged fields target a store
    /// without backend.
    #[instrument(skip_all, fields(filter = %filter))]
    pub async fn marshal_with_opts(
        &self,
        v: &dyn Field,
        filter: &FieldFilters,
        usage: &[StoreType],
    ) -> Result<FieldResults, SsmError> {
        let active = self.config.active_stores(usage);
        let tree = self.parser(&active).parse(v)?;
        tree.dump();

        let mut results = FieldResults::new();
        for store in active {
            let paths = tree.parameter_map(store.namespace(), filter);
            let Some(repository) = self.repository(store, &paths)? else {
                continue;
            };
            results.extend(repository.upsert(&tree, &paths, v).await);
        }

        info!(failures = results.len(), "marshal finished");
        Ok(results)
    }

    /// Delete the remote entries of every tagged field of `v`
    ///
    /// # Errors
    /// See [`Serializer::delete_with_opts`].
    pub async fn delete(&self, v: &dyn Field) -> Result<FieldResults, SsmError> {
        self.delete_with_opts(v, &FieldFilters::new(), &[]).await
    }

    /// Delete the remote entries of the fields of `v` admitted by `filter`
    /// from the stores in `usage` (the configured stores when empty)
    ///
    /// Entries that do not exist are reported missing in the returned map;
    /// the call itself still succeeds.
    ///
    /// # Errors
    /// Returns [`SsmError::Parse`] for an unusable root or a malformed tag,
    /// [`SsmError::BackendMissing`] when tagged fields target a store
    /// without backend and [`SsmError::Backend`] when a delete fails.
    #[instrument(skip_all, fields(filter = %filter))]
    pub async fn delete_with_opts(
        &self,
        v: &dyn Field,
        filter: &FieldFilters,
        usage: &[StoreType],
    ) -> Result<FieldResults, SsmError> {
        let active = self.config.active_stores(usage);
        let tree = self.parser(&active).parse(v)?;

        let mut results = FieldResults::new();
        for store in active {
            let paths = tree.parameter_map(store.namespace(), filter);
            let Some(repository) = self.repository(store, &paths)? else {
                continue;
            };
            let missing = repository.delete(&tree, &paths).await?;
            info!(store = %store, paths = paths.len(), missing = missing.len(), "deleted");
            results.extend(missing);
        }
        Ok(results)
    }

    /// Delete every remote entry whose name begins with one of `prefixes`
    /// from the stores in `usage` (the configured stores when empty)
    ///
    /// Returns the number of deleted entries. Stores without backend are
    /// skipped.
    ///
    /// # Errors
    /// Returns [`SsmError::InvalidArgument`] when `prefixes` is empty or
    /// contains an empty prefix and [`SsmError::Backend`] when listing or
    /// deleting fails.
    #[instrument(skip(self))]
    pub async fn delete_tree(
        &self,
        usage: &[StoreType],
        prefixes: &[String],
    ) -> Result<usize, SsmError> {
        if prefixes.is_empty() || prefixes.iter().any(String::is_empty) {
            return Err(SsmError::InvalidArgument(
                "delete_tree needs at least one non-empty prefix".to_string(),
            ));
        }

        let mut deleted = 0;
        for store in self.config.active_stores(usage) {
            let Some(backend) = self.backend(store) else {
                debug!(store = %store, "no backend, skipping");
                continue;
            };
            deleted += Repository::new(store, backend, &self.config)
                .delete_tree(prefixes)
                .await?;
        }

        info!(deleted, "delete_tree finished");
        Ok(deleted)
    }
}
