//! File-backed document store.
//!
//! ## Storage Layout
//!
//! ```text
//! <collections_dir>/
//!   <collection>/
//!     <document id>.json    # the document payload as a JSON object
//! ```
//!
//! Generated ids are canonical UUIDs claimed with create-new semantics, so two writers can never
//! be handed the same id. Upserts go through a temporary file and a rename so readers never see
//! a half-written document.

use super::{Collection, Document, DocumentData, DocumentStore};
use crate::constants::RECORD_EXTENSION;
use crate::validation::validate_key;
use crate::{AdminError, AdminResult};
use parking_lot::RwLock;
use portal_uuid::UuidService;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

const MAX_ID_ALLOCATION_ATTEMPTS: usize = 5;

#[derive(Debug)]
pub struct FsDocumentStore {
    root: PathBuf,
    // Writers hold this exclusively, readers shared: a scan never interleaves with a write
    // made through this handle.
    snapshot_lock: RwLock<()>,
}

impl FsDocumentStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> AdminResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            AdminError::from_io(format!("create store directory {}", root.display()), e)
        })?;
        Ok(Self {
            root,
            snapshot_lock: RwLock::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.name())
    }

    fn document_path(&self, collection: Collection, id: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{id}.{RECORD_EXTENSION}"))
    }

    fn ensure_collection_dir(&self, collection: Collection) -> AdminResult<PathBuf> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir).map_err(|e| {
            AdminError::from_io(format!("create collection directory {collection}"), e)
        })?;
        Ok(dir)
    }

    fn read_document(&self, collection: Collection, id: &str) -> AdminResult<Option<Document>> {
        let path = self.document_path(collection, id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AdminError::from_io(format!("read {collection}/{id}"), e)),
        };

        let data = decode_payload(&raw).map_err(|e| {
            AdminError::Validation(format!("document {collection}/{id} is malformed: {e}"))
        })?;

        Ok(Some(Document {
            id: id.to_owned(),
            data,
        }))
    }

    /// Reads every document in a collection, ordered by id.
    ///
    /// Malformed files are logged and skipped so one bad document does not hide the rest.
    fn scan(&self, collection: Collection) -> AdminResult<Vec<Document>> {
        let dir = self.collection_dir(collection);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AdminError::from_io(format!("list {collection}"), e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AdminError::from_io(format!("list {collection}"), e))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if validate_key("document id", id).is_ok() {
                ids.push(id.to_owned());
            }
        }
        ids.sort();

        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            match self.read_document(collection, &id) {
                Ok(Some(doc)) => documents.push(doc),
                // Removed by another process between listing and reading.
                Ok(None) => {}
                Err(AdminError::Validation(msg)) => {
                    tracing::warn!(collection = %collection, id = %id, "skipping document: {msg}");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(documents)
    }

    fn write_replace(&self, path: &Path, id: &str, data: &DocumentData) -> AdminResult<()> {
        let bytes = encode_payload(data)?;
        let tmp = path.with_extension(format!("{RECORD_EXTENSION}.tmp"));

        let result = fs::write(&tmp, &bytes).and_then(|()| fs::rename(&tmp, path));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(AdminError::from_io(format!("write document {id}"), e));
        }
        Ok(())
    }
}

fn decode_payload(raw: &[u8]) -> Result<DocumentData, String> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("payload is not a JSON object".into()),
        Err(e) => Err(e.to_string()),
    }
}

fn encode_payload(data: &DocumentData) -> AdminResult<Vec<u8>> {
    serde_json::to_vec_pretty(data).map_err(|e| AdminError::from_json("encode document", e))
}

/// Publishes `bytes` at `path` only if nothing exists there yet.
///
/// The content is written and synced to a uniquely named temporary file first and then linked
/// into place, so `path` either does not exist or holds the complete payload. Returns
/// `Ok(false)` if `path` already existed.
pub(crate) fn write_new(path: &Path, bytes: &[u8]) -> io::Result<bool> {
    let tmp = path.with_extension(format!("{RECORD_EXTENSION}.{}.tmp", UuidService::new()));

    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp)
        .and_then(|mut file| file.write_all(bytes).and_then(|()| file.sync_all()));
    let linked = written.and_then(|()| fs::hard_link(&tmp, path));
    let _ = fs::remove_file(&tmp);

    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

impl DocumentStore for FsDocumentStore {
    fn create_document(&self, collection: Collection, data: DocumentData) -> AdminResult<String> {
        let bytes = encode_payload(&data)?;
        let _guard = self.snapshot_lock.write();
        self.ensure_collection_dir(collection)?;

        // Guard against pathological UUID collisions by limiting retries.
        for _attempt in 0..MAX_ID_ALLOCATION_ATTEMPTS {
            let id = UuidService::new().to_string();
            let path = self.document_path(collection, &id);
            match write_new(&path, &bytes) {
                Ok(true) => {
                    tracing::debug!(collection = %collection, id = %id, "document created");
                    return Ok(id);
                }
                Ok(false) => continue,
                Err(e) => {
                    return Err(AdminError::from_io(format!("create document in {collection}"), e))
                }
            }
        }

        Err(AdminError::Transient(format!(
            "failed to allocate a unique document id in {collection} after {MAX_ID_ALLOCATION_ATTEMPTS} attempts"
        )))
    }

    fn set_document(
        &self,
        collection: Collection,
        id: &str,
        data: DocumentData,
    ) -> AdminResult<()> {
        validate_key("document id", id)?;
        let _guard = self.snapshot_lock.write();
        self.ensure_collection_dir(collection)?;
        self.write_replace(&self.document_path(collection, id), id, &data)
    }

    fn insert_if_absent(
        &self,
        collection: Collection,
        id: &str,
        data: DocumentData,
    ) -> AdminResult<bool> {
        validate_key("document id", id)?;
        let bytes = encode_payload(&data)?;
        let _guard = self.snapshot_lock.write();
        self.ensure_collection_dir(collection)?;

        write_new(&self.document_path(collection, id), &bytes)
            .map_err(|e| AdminError::from_io(format!("create {collection}/{id}"), e))
    }

    fn get_document(&self, collection: Collection, id: &str) -> AdminResult<Option<Document>> {
        validate_key("document id", id)?;
        let _guard = self.snapshot_lock.read();
        self.read_document(collection, id)
    }

    fn delete_document(&self, collection: Collection, id: &str) -> AdminResult<bool> {
        validate_key("document id", id)?;
        let _guard = self.snapshot_lock.write();
        match fs::remove_file(self.document_path(collection, id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AdminError::from_io(format!("delete {collection}/{id}"), e)),
        }
    }

    fn query_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> AdminResult<Vec<Document>> {
        if field.is_empty() {
            return Err(AdminError::Validation("query field cannot be empty".into()));
        }
        let _guard = self.snapshot_lock.read();
        let documents = self.scan(collection)?;
        Ok(documents
            .into_iter()
            .filter(|doc| doc.field(field) == Some(value))
            .collect())
    }

    fn list_collection(
        &self,
        collection: Collection,
        limit: Option<usize>,
    ) -> AdminResult<Vec<Document>> {
        let _guard = self.snapshot_lock.read();
        let mut documents = self.scan(collection)?;
        if let Some(limit) = limit {
            documents.truncate(limit);
        }
        Ok(documents)
    }

    fn increment_field(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        delta: i64,
    ) -> AdminResult<i64> {
        validate_key("document id", id)?;
        validate_key("field name", field)?;
        let _guard = self.snapshot_lock.write();

        let mut doc = self
            .read_document(collection, id)?
            .ok_or_else(|| AdminError::NotFound(format!("document {collection}/{id}")))?;

        let current = match doc.data.get(field) {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_i64().ok_or_else(|| {
                AdminError::Validation(format!(
                    "field '{field}' of {collection}/{id} is not an integer"
                ))
            })?,
        };
        let next = current.checked_add(delta).ok_or_else(|| {
            AdminError::Validation(format!("incrementing {collection}/{id}.{field} overflows"))
        })?;

        doc.data.insert(field.to_owned(), Value::from(next));
        self.write_replace(&self.document_path(collection, id), id, &doc.data)?;
        Ok(next)
    }
}
