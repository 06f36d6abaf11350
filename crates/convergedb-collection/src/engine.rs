//! The `Collection` type: the public CRUD, digest, and merge surface.

use std::collections::BTreeMap;
use std::sync::Arc;

use convergedb_core::{hash, ConvergeError, ConvergeResult, Document, Hlc, HlcClock, Issue, Storage, Validator, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

use crate::config::CollectionConfig;
use crate::listener::{ChangeEvent, ChangeKind, ListenerFn};
use crate::ordering;
use crate::state::LifecycleState;

/// Result of `get_hashes`: the root digest and the per-bucket digests.
#[derive(Debug, Clone, PartialEq)]
pub struct HashSummary {
    pub root: String,
    pub buckets: BTreeMap<usize, String>,
}

/// Result of a successful `create_many`/`update_many` call: the ids that
/// were durably written, in commit order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchOutcome {
    pub committed: Vec<String>,
}

/// A named collection of CRDT documents, backed by a `Storage` adapter and
/// validated through a `Validator` adapter.
pub struct Collection {
    name: String,
    storage: Arc<dyn Storage>,
    validator: Arc<dyn Validator>,
    config: CollectionConfig,
    lifecycle: Mutex<LifecycleState>,
    clock: RwLock<Option<HlcClock>>,
    documents: RwLock<BTreeMap<String, Document>>,
    listeners: Mutex<BTreeMap<String, ListenerFn>>,
    // Single-writer FIFO queue: every mutating operation holds this for its
    // whole duration, serializing mutations while leaving reads free to
    // proceed against the `documents` RwLock.
    write_queue: Mutex<()>,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        storage: Arc<dyn Storage>,
        validator: Arc<dyn Validator>,
        config: CollectionConfig,
    ) -> Self {
        Self {
            name: name.into(),
            storage,
            validator,
            config,
            lifecycle: Mutex::new(LifecycleState::Unopened),
            clock: RwLock::new(None),
            documents: RwLock::new(BTreeMap::new()),
            listeners: Mutex::new(BTreeMap::new()),
            write_queue: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn hlc_path(&self) -> String {
        format!("{}.hlc.json", self.name)
    }

    fn doc_path(&self, id: &str) -> String {
        format!("{}/{}.json", self.name, id)
    }

    /// `open()`: loads the persisted clock and the full document set. Safe
    /// to call multiple times; only the first unopened->open transition
    /// does any I/O.
    #[instrument(skip(self), fields(collection = %self.name))]
    pub async fn open(&self) -> ConvergeResult<()> {
        {
            let state = *self.lifecycle.lock().await;
            match state {
                LifecycleState::Open => return Ok(()),
                LifecycleState::Closing | LifecycleState::Terminal => {
                    return Err(ConvergeError::StorageFailure {
                        operation: "open".to_string(),
                        cause: "collection is closing or closed".to_string(),
                    })
                }
                LifecycleState::Unopened => {}
            }
        }

        let persisted_hlc = self.storage.read(&self.hlc_path()).await?;
        let last = match persisted_hlc {
            Some(raw) => serde_json::from_str::<String>(&raw)
                .ok()
                .and_then(|s| Hlc::parse(&s))
                .unwrap_or_else(Hlc::zero),
            None => Hlc::zero(),
        };

        let mut loaded = BTreeMap::new();
        let mut max_seen = last;
        for entry in self.storage.list(&self.name).await? {
            let Some(id) = entry.strip_suffix(".json") else { continue };
            let path = self.doc_path(id);
            if let Some(raw) = self.storage.read(&path).await? {
                let doc = Document::from_json(&raw).map_err(|e| ConvergeError::InvalidContent {
                    id: id.to_string(),
                    details: e.to_string(),
                })?;
                if doc.doc_hlc() > &max_seen {
                    max_seen = doc.doc_hlc().clone();
                }
                loaded.insert(id.to_string(), doc);
            }
        }

        *self.documents.write().await = loaded;
        *self.clock.write().await = Some(HlcClock::from_persisted(max_seen));
        *self.lifecycle.lock().await = LifecycleState::Open;
        debug!(documents = self.documents.read().await.len(), "collection opened");
        Ok(())
    }

    /// `close()`: open -> closing -> terminal. Persists the clock one final
    /// time; rejects further mutations.
    #[instrument(skip(self), fields(collection = %self.name))]
    pub async fn close(&self) -> ConvergeResult<()> {
        *self.lifecycle.lock().await = LifecycleState::Closing;
        if let Some(clock) = self.clock.read().await.as_ref() {
            self.persist_clock(clock.current()).await?;
        }
        *self.lifecycle.lock().await = LifecycleState::Terminal;
        Ok(())
    }

    async fn ensure_open(&self) -> ConvergeResult<()> {
        let needs_open = matches!(*self.lifecycle.lock().await, LifecycleState::Unopened);
        if needs_open {
            self.open().await?;
        }
        Ok(())
    }

    async fn ensure_writable(&self) -> ConvergeResult<()> {
        self.ensure_open().await?;
        let state = *self.lifecycle.lock().await;
        if matches!(state, LifecycleState::Closing | LifecycleState::Terminal) {
            return Err(ConvergeError::StorageFailure {
                operation: "write".to_string(),
                cause: "collection is closing or closed".to_string(),
            });
        }
        Ok(())
    }

    async fn persist_clock(&self, hlc: Hlc) -> ConvergeResult<()> {
        let encoded = serde_json::to_string(&hlc.to_canonical_string()).unwrap_or_default();
        self.storage.write(&self.hlc_path(), &encoded).await
    }

    async fn persist_document(&self, doc: &Document) -> ConvergeResult<()> {
        self.storage.write(&self.doc_path(doc.id()), &doc.to_json()).await
    }

    fn to_object(value: Value, id: &str) -> ConvergeResult<BTreeMap<String, Value>> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            _ => Err(ConvergeError::InvalidData {
                id: id.to_string(),
                issues: vec![Issue::new("", "validator must return an object")],
            }),
        }
    }

    async fn notify(&self, event: ChangeEvent) {
        let listeners = self.listeners.lock().await;
        for listener in listeners.values() {
            listener(event.clone());
        }
    }

    // ---- public CRUD surface ----

    #[instrument(skip(self), fields(collection = %self.name, %id))]
    pub async fn get(&self, id: &str) -> ConvergeResult<Option<BTreeMap<String, Value>>> {
        self.ensure_open().await?;
        let docs = self.documents.read().await;
        Ok(docs.get(id).map(Document::to_data))
    }

    pub async fn all(&self) -> ConvergeResult<Vec<BTreeMap<String, Value>>> {
        self.ensure_open().await?;
        let docs = self.documents.read().await;
        Ok(docs.values().map(Document::to_data).collect())
    }

    pub async fn all_where<F>(&self, predicate: F) -> ConvergeResult<Vec<BTreeMap<String, Value>>>
    where
        F: Fn(&BTreeMap<String, Value>) -> bool,
    {
        self.ensure_open().await?;
        let docs = self.documents.read().await;
        Ok(docs.values().map(Document::to_data).filter(|d| predicate(d)).collect())
    }

    #[instrument(skip(self, data), fields(collection = %self.name, %id))]
    pub async fn insert(&self, id: &str, data: BTreeMap<String, Value>) -> ConvergeResult<()> {
        self.ensure_writable().await?;
        let _guard = self.write_queue.lock().await;

        if self.documents.read().await.contains_key(id) {
            return Err(ConvergeError::AlreadyExists {
                collection: self.name.clone(),
                id: id.to_string(),
            });
        }

        let candidate = Value::Object(data);
        let validated = match self.validator.validate(&self.name, &candidate) {
            convergedb_core::ValidationOutcome::Ok(v) => Self::to_object(v, id)?,
            convergedb_core::ValidationOutcome::Issues(issues) => {
                warn!(%id, ?issues, "insert rejected by validator");
                return Err(ConvergeError::InvalidData { id: id.to_string(), issues });
            }
        };

        let clock_guard = self.clock.read().await;
        let clock = clock_guard.as_ref().expect("clock loaded by ensure_writable");
        let hlc = clock.tick();
        let doc = Document::make(hlc.clone(), id, validated.clone());
        drop(clock_guard);

        self.persist_clock(hlc).await?;
        self.persist_document(&doc).await?;
        self.documents.write().await.insert(id.to_string(), doc);

        self.notify(ChangeEvent { kind: ChangeKind::Insert, id: id.to_string(), data: validated }).await;
        Ok(())
    }

    #[instrument(skip(self, partial), fields(collection = %self.name, %id))]
    pub async fn update(&self, id: &str, partial: BTreeMap<String, Value>) -> ConvergeResult<()> {
        self.ensure_writable().await?;
        let _guard = self.write_queue.lock().await;

        let existing = self
            .documents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ConvergeError::NotFound { collection: self.name.clone(), id: id.to_string() })?;

        let mut shallow_merged = existing.to_data();
        shallow_merged.extend(partial.clone());

        let candidate = Value::Object(shallow_merged);
        if let convergedb_core::ValidationOutcome::Issues(issues) = self.validator.validate(&self.name, &candidate) {
            warn!(%id, ?issues, "update rejected by validator");
            return Err(ConvergeError::InvalidData { id: id.to_string(), issues });
        }

        let clock_guard = self.clock.read().await;
        let clock = clock_guard.as_ref().expect("clock loaded by ensure_writable");
        let updated = existing.apply_update(clock, &partial);
        let latest_hlc = clock.current();
        drop(clock_guard);

        self.persist_clock(latest_hlc).await?;
        self.persist_document(&updated).await?;
        let merged_data = updated.to_data();
        self.documents.write().await.insert(id.to_string(), updated);

        self.notify(ChangeEvent { kind: ChangeKind::Update, id: id.to_string(), data: merged_data }).await;
        Ok(())
    }

    /// `create_many`: all-or-nothing with respect to validation — every
    /// input is checked (already-exists, then schema) before anything is
    /// written. If every input passes, documents are persisted one at a
    /// time in order; the first storage failure aborts the remainder and
    /// reports which ids had already committed via
    /// `ConvergeError::BatchStorageFailure`.
    #[instrument(skip(self, items), fields(collection = %self.name, batch = items.len()))]
    pub async fn create_many(&self, items: Vec<(String, BTreeMap<String, Value>)>) -> ConvergeResult<BatchOutcome> {
        self.ensure_writable().await?;
        let _guard = self.write_queue.lock().await;

        let mut prepared = Vec::with_capacity(items.len());
        let mut failures = Vec::new();
        {
            let docs = self.documents.read().await;
            for (id, data) in items {
                if docs.contains_key(&id) {
                    failures.push((
                        id.clone(),
                        ConvergeError::AlreadyExists { collection: self.name.clone(), id: id.clone() },
                    ));
                    continue;
                }
                let candidate = Value::Object(data);
                match self.validator.validate(&self.name, &candidate) {
                    convergedb_core::ValidationOutcome::Ok(v) => match Self::to_object(v, &id) {
                        Ok(obj) => prepared.push((id, obj)),
                        Err(e) => failures.push((id, e)),
                    },
                    convergedb_core::ValidationOutcome::Issues(issues) => {
                        failures.push((id.clone(), ConvergeError::InvalidData { id, issues }));
                    }
                }
            }
        }

        if !failures.is_empty() {
            warn!(collection = %self.name, failed = failures.len(), "create_many rejected before any writes");
            return Err(ConvergeError::BatchRejected { failures });
        }

        let mut committed = Vec::with_capacity(prepared.len());
        for (id, validated) in prepared {
            let clock_guard = self.clock.read().await;
            let clock = clock_guard.as_ref().expect("clock loaded by ensure_writable");
            let hlc = clock.tick();
            let doc = Document::make(hlc.clone(), &id, validated.clone());
            drop(clock_guard);

            if let Err(e) = self.persist_clock(hlc).await {
                return Err(ConvergeError::BatchStorageFailure {
                    operation: "create_many".to_string(),
                    committed,
                    cause: e.to_string(),
                });
            }
            if let Err(e) = self.persist_document(&doc).await {
                return Err(ConvergeError::BatchStorageFailure {
                    operation: "create_many".to_string(),
                    committed,
                    cause: e.to_string(),
                });
            }

            self.documents.write().await.insert(id.clone(), doc);
            self.notify(ChangeEvent { kind: ChangeKind::Insert, id: id.clone(), data: validated }).await;
            committed.push(id);
        }

        Ok(BatchOutcome { committed })
    }

    /// `update_many`: same two-phase shape as `create_many` — every input is
    /// checked (exists, then schema against its shallow-merged data) before
    /// any write happens, then documents are persisted in order with the
    /// first storage failure reported via `ConvergeError::BatchStorageFailure`.
    #[instrument(skip(self, items), fields(collection = %self.name, batch = items.len()))]
    pub async fn update_many(&self, items: Vec<(String, BTreeMap<String, Value>)>) -> ConvergeResult<BatchOutcome> {
        self.ensure_writable().await?;
        let _guard = self.write_queue.lock().await;

        let mut prepared = Vec::with_capacity(items.len());
        let mut failures = Vec::new();
        {
            let docs = self.documents.read().await;
            for (id, partial) in items {
                let Some(existing) = docs.get(&id).cloned() else {
                    failures.push((id.clone(), ConvergeError::NotFound { collection: self.name.clone(), id }));
                    continue;
                };

                let mut shallow_merged = existing.to_data();
                shallow_merged.extend(partial.clone());
                let candidate = Value::Object(shallow_merged);
                match self.validator.validate(&self.name, &candidate) {
                    convergedb_core::ValidationOutcome::Issues(issues) => {
                        failures.push((id.clone(), ConvergeError::InvalidData { id, issues }));
                    }
                    convergedb_core::ValidationOutcome::Ok(_) => prepared.push((id, existing, partial)),
                }
            }
        }

        if !failures.is_empty() {
            warn!(collection = %self.name, failed = failures.len(), "update_many rejected before any writes");
            return Err(ConvergeError::BatchRejected { failures });
        }

        let mut committed = Vec::with_capacity(prepared.len());
        for (id, existing, partial) in prepared {
            let clock_guard = self.clock.read().await;
            let clock = clock_guard.as_ref().expect("clock loaded by ensure_writable");
            let updated = existing.apply_update(clock, &partial);
            let latest_hlc = clock.current();
            drop(clock_guard);

            if let Err(e) = self.persist_clock(latest_hlc).await {
                return Err(ConvergeError::BatchStorageFailure {
                    operation: "update_many".to_string(),
                    committed,
                    cause: e.to_string(),
                });
            }
            if let Err(e) = self.persist_document(&updated).await {
                return Err(ConvergeError::BatchStorageFailure {
                    operation: "update_many".to_string(),
                    committed,
                    cause: e.to_string(),
                });
            }

            let merged_data = updated.to_data();
            self.documents.write().await.insert(id.clone(), updated);
            self.notify(ChangeEvent { kind: ChangeKind::Update, id: id.clone(), data: merged_data }).await;
            committed.push(id);
        }

        Ok(BatchOutcome { committed })
    }

    // ---- anti-entropy surface ----

    pub async fn get_hashes(&self, bucket_size: Option<usize>) -> ConvergeResult<HashSummary> {
        self.ensure_open().await?;
        let bucket_size = bucket_size.unwrap_or(self.config.default_bucket_size);
        let docs = ordering::sorted(self.documents.read().await.values().cloned().collect());
        let hashes: Vec<&str> = docs.iter().map(Document::hash).collect();
        let root = hash::accumulate(hashes.iter().copied());
        let buckets = hash::bucket(&hashes, bucket_size);
        Ok(HashSummary { root, buckets })
    }

    pub async fn get_buckets(&self, indices: &[usize], bucket_size: Option<usize>) -> ConvergeResult<Vec<Document>> {
        self.ensure_open().await?;
        let bucket_size = bucket_size.unwrap_or(self.config.default_bucket_size);
        let docs = ordering::sorted(self.documents.read().await.values().cloned().collect());
        let chunks: Vec<&[Document]> = docs.chunks(bucket_size.max(1)).collect();
        let mut out = Vec::new();
        for &index in indices {
            if let Some(chunk) = chunks.get(index) {
                out.extend(chunk.iter().cloned());
            }
        }
        Ok(out)
    }

    /// `merge(remote_docs)`: CRDT-join each incoming document into local
    /// state, observe its HLC into the clock, and persist. Listener
    /// notifications are coalesced to at most one per id.
    #[instrument(skip(self, remote_docs), fields(collection = %self.name, batch = remote_docs.len()))]
    pub async fn merge(&self, remote_docs: Vec<Document>) -> ConvergeResult<()> {
        self.ensure_writable().await?;
        let _guard = self.write_queue.lock().await;

        let mut notifications = Vec::new();
        let mut max_observed = Hlc::zero();

        for remote in remote_docs {
            if self.config.reject_unknown_fields_on_merge {
                let candidate = Value::Object(remote.to_data());
                if let convergedb_core::ValidationOutcome::Issues(issues) =
                    self.validator.validate(&self.name, &candidate)
                {
                    warn!(id = remote.id(), ?issues, "merge rejected by validator policy");
                    return Err(ConvergeError::InvalidData { id: remote.id().to_string(), issues });
                }
            }

            let id = remote.id().to_string();
            let existing = self.documents.read().await.get(&id).cloned();
            let merged = match &existing {
                Some(local) => local.merge(&remote),
                None => remote.clone(),
            };

            if remote.doc_hlc() > &max_observed {
                max_observed = remote.doc_hlc().clone();
            }

            let changed = existing.as_ref().map(|e| e.hash() != merged.hash()).unwrap_or(true);
            self.persist_document(&merged).await?;
            self.documents.write().await.insert(id.clone(), merged.clone());

            if changed {
                notifications.push(ChangeEvent { kind: ChangeKind::Merge, id, data: merged.to_data() });
            }
        }

        {
            let clock_guard = self.clock.read().await;
            let clock = clock_guard.as_ref().expect("clock loaded by ensure_writable");
            clock.observe(&max_observed);
            let latest = clock.current();
            drop(clock_guard);
            self.persist_clock(latest).await?;
        }

        for event in notifications {
            self.notify(event).await;
        }
        Ok(())
    }

    // ---- listeners ----

    pub async fn register_listener(&self, key: impl Into<String>, listener: ListenerFn) {
        self.listeners.lock().await.insert(key.into(), listener);
    }

    pub async fn unregister_listener(&self, key: &str) {
        self.listeners.lock().await.remove(key);
    }
}
