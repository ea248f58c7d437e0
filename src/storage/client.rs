use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use serde::{Deserialize, Serialize};
use sled::IVec;

use super::document::{Document, Value};
use super::errors::StoreError;

pub const DOCUMENT_SCHEMA_VERSION: u8 = 1;

const TREE_CATALOG: &str = "mobboard_catalog";
const SEP: char = '\u{1f}';

/// Where the client should keep its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionString {
    /// Persistent store rooted at a directory (`sled://<path>` or a bare path).
    Path(PathBuf),
    /// Throwaway store removed when the client is dropped (`memory://`).
    Memory,
}

impl FromStr for ConnectionString {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(StoreError::InvalidConnection("empty connection string".into()));
        }
        if trimmed == "memory://" || trimmed == "memory:" {
            return Ok(ConnectionString::Memory);
        }
        if let Some(path) = trimmed.strip_prefix("sled://") {
            if path.is_empty() {
                return Err(StoreError::InvalidConnection(format!("missing path in {}", trimmed)));
            }
            return Ok(ConnectionString::Path(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = trimmed.split_once("://") {
            return Err(StoreError::InvalidConnection(format!(
                "unsupported scheme '{}'",
                scheme
            )));
        }
        Ok(ConnectionString::Path(PathBuf::from(trimmed)))
    }
}

#[derive(Serialize, Deserialize)]
struct StoredDocument {
    schema_version: u8,
    document: Document,
}

/// Owns the one connection to the backing store.
///
/// Reads and writes may be issued from any number of threads at once. Opening and
/// closing happen once per process and are not meant to race with each other.
pub struct DocumentStoreClient {
    db: sled::Db,
    catalog: sled::Tree,
    closed: AtomicBool,
}

impl DocumentStoreClient {
    /// Open the store described by `connection_string`.
    pub fn connect(connection_string: &str) -> Result<Self, StoreError> {
        match connection_string.parse::<ConnectionString>()? {
            ConnectionString::Memory => {
                let db = sled::Config::new().temporary(true).open()?;
                Self::from_db(db)
            }
            ConnectionString::Path(path) => Self::open(path),
        }
    }

    /// Open (or create) a persistent store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let catalog = db.open_tree(TREE_CATALOG)?;
        Ok(Self {
            db,
            catalog,
            closed: AtomicBool::new(false),
        })
    }

    fn database_key(database: &str) -> Vec<u8> {
        format!("db{SEP}{database}").into_bytes()
    }

    fn collection_prefix(database: &str) -> Vec<u8> {
        format!("col{SEP}{database}{SEP}").into_bytes()
    }

    fn collection_key(database: &str, collection: &str) -> Vec<u8> {
        format!("col{SEP}{database}{SEP}{collection}").into_bytes()
    }

    fn encode(document: &Document) -> Result<Vec<u8>, StoreError> {
        let stored = StoredDocument {
            schema_version: DOCUMENT_SCHEMA_VERSION,
            document: document.clone(),
        };
        Ok(bincode::serialize(&stored)?)
    }

    fn decode(collection: &str, bytes: &IVec) -> Result<Document, StoreError> {
        let stored: StoredDocument = bincode::deserialize(bytes)?;
        if stored.schema_version != DOCUMENT_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                collection: collection.to_string(),
                expected: DOCUMENT_SCHEMA_VERSION,
                found: stored.schema_version,
            });
        }
        Ok(stored.document)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Create a database. Creating one that already exists is a no-op.
    pub fn create_database(&self, database: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.catalog.insert(Self::database_key(database), Vec::<u8>::new())?;
        self.catalog.flush()?;
        Ok(())
    }

    pub fn database_exists(&self, database: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        Ok(self.catalog.contains_key(Self::database_key(database))?)
    }

    /// Create a collection inside an existing database. Idempotent.
    pub fn create_collection(&self, database: &str, collection: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        if !self.database_exists(database)? {
            return Err(StoreError::DatabaseNotFound(database.to_string()));
        }
        let key = Self::collection_key(database, collection);
        self.db.open_tree(&key)?;
        self.catalog.insert(key, Vec::<u8>::new())?;
        self.catalog.flush()?;
        Ok(())
    }

    /// Collection names of a database in lexicographic order.
    pub fn list_collection_names(&self, database: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_open()?;
        if !self.database_exists(database)? {
            return Err(StoreError::DatabaseNotFound(database.to_string()));
        }
        let prefix = Self::collection_prefix(database);
        let mut names = Vec::new();
        for entry in self.catalog.scan_prefix(&prefix) {
            let (key, _) = entry?;
            let name = std::str::from_utf8(&key[prefix.len()..])
                .map_err(|e| StoreError::Internal(format!("collection name is not utf-8: {e}")))?;
            names.push(name.to_string());
        }
        Ok(names)
    }

    fn collection(&self, database: &str, collection: &str) -> Result<sled::Tree, StoreError> {
        self.ensure_open()?;
        if !self.database_exists(database)? {
            return Err(StoreError::DatabaseNotFound(database.to_string()));
        }
        let key = Self::collection_key(database, collection);
        if !self.catalog.contains_key(&key)? {
            return Err(StoreError::CollectionNotFound {
                database: database.to_string(),
                collection: collection.to_string(),
            });
        }
        Ok(self.db.open_tree(key)?)
    }

    /// Append one document. Fails without inserting when the target is missing.
    pub fn insert(&self, database: &str, collection: &str, document: &Document) -> Result<(), StoreError> {
        let tree = self.collection(database, collection)?;
        let id = self.db.generate_id()?;
        tree.insert(id.to_be_bytes(), Self::encode(document)?)?;
        tree.flush()?;
        Ok(())
    }

    /// Lazy scan of documents where `field == value`, in insertion order.
    pub fn find(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<DocumentCursor, StoreError> {
        let tree = self.collection(database, collection)?;
        Ok(DocumentCursor {
            collection: collection.to_string(),
            field: field.to_string(),
            value: value.clone(),
            tree,
            position: None,
            exhausted: false,
        })
    }

    /// First document matching the selector.
    pub fn find_first(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Document, StoreError> {
        match self.find(database, collection, field, value)?.next() {
            Some(result) => result,
            None => Err(StoreError::DocumentNotFound {
                collection: collection.to_string(),
                selector: format!("{field} = {value}"),
            }),
        }
    }

    /// Set one field on the first document matching the selector, creating the field
    /// if needed. Returns false when nothing matched.
    ///
    /// The write only lands if the stored bytes are still the ones the change was
    /// computed from, so concurrent updates to other fields of the same document
    /// are never overwritten.
    pub fn update_field(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        value: &Value,
        target_field: &str,
        new_value: &Value,
    ) -> Result<bool, StoreError> {
        let tree = self.collection(database, collection)?;
        let mut candidate = Self::first_match(&tree, collection, field, value)?;
        while let Some((key, current)) = candidate {
            let mut document = Self::decode(collection, &current)?;
            if !document.matches(field, value) {
                // selector changed underneath us
                candidate = Self::first_match(&tree, collection, field, value)?;
                continue;
            }
            document.set(target_field, new_value.clone());
            match tree.compare_and_swap(&key, Some(&current), Some(Self::encode(&document)?))? {
                Ok(()) => {
                    tree.flush()?;
                    return Ok(true);
                }
                Err(conflict) => {
                    debug!("retrying update of {} on {}/{}", target_field, database, collection);
                    candidate = match conflict.current {
                        Some(latest) => Some((key, latest)),
                        None => Self::first_match(&tree, collection, field, value)?,
                    };
                }
            }
        }
        debug!(
            "update on {}/{} matched no document for {} = {}",
            database, collection, field, value
        );
        Ok(false)
    }

    /// Key and raw bytes of the first document matching the selector.
    fn first_match(
        tree: &sled::Tree,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<(IVec, IVec)>, StoreError> {
        for entry in tree.iter() {
            let (key, bytes) = entry?;
            if Self::decode(collection, &bytes)?.matches(field, value) {
                return Ok(Some((key, bytes)));
            }
        }
        Ok(None)
    }

    /// Flush and refuse further operations. A second close is a no-op.
    pub fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.db.flush()?;
        Ok(())
    }
}

/// Forward-only, single-pass sequence of matching documents.
///
/// Each step seeks past the last key it returned, so documents appended while the
/// cursor is open may still be seen.
pub struct DocumentCursor {
    collection: String,
    field: String,
    value: Value,
    tree: sled::Tree,
    position: Option<IVec>,
    exhausted: bool,
}

impl DocumentCursor {
    /// Drain the remaining matches, stopping at the first decode or backend error.
    pub fn collect_documents(self) -> Result<Vec<Document>, StoreError> {
        self.collect()
    }
}

impl Iterator for DocumentCursor {
    type Item = Result<Document, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        loop {
            let entry = match &self.position {
                Some(last) => self
                    .tree
                    .range::<&[u8], _>((Bound::Excluded(&last[..]), Bound::Unbounded))
                    .next(),
                None => self.tree.first().transpose(),
            };
            let decoded = match entry {
                None => break,
                Some(Ok((key, bytes))) => {
                    self.position = Some(key);
                    DocumentStoreClient::decode(&self.collection, &bytes)
                }
                Some(Err(err)) => Err(StoreError::from(err)),
            };
            match decoded {
                Ok(document) if document.matches(&self.field, &self.value) => return Some(Ok(document)),
                Ok(_) => continue,
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
        self.exhausted = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DocumentStoreClient {
        let client = DocumentStoreClient::connect("memory://").unwrap();
        client.create_database("mbl-players").unwrap();
        client
    }

    #[test]
    fn parses_connection_strings() {
        assert_eq!("memory://".parse::<ConnectionString>().unwrap(), ConnectionString::Memory);
        assert_eq!(
            "sled://./data/board".parse::<ConnectionString>().unwrap(),
            ConnectionString::Path(PathBuf::from("./data/board"))
        );
        assert_eq!(
            "/var/lib/board".parse::<ConnectionString>().unwrap(),
            ConnectionString::Path(PathBuf::from("/var/lib/board"))
        );
        assert!("".parse::<ConnectionString>().is_err());
        assert!("mongodb://localhost:27017".parse::<ConnectionString>().is_err());
    }

    #[test]
    fn insert_requires_existing_containers() {
        let client = client();
        let doc = Document::of_type("playerdata");
        assert!(matches!(
            client.insert("nope", "c", &doc),
            Err(StoreError::DatabaseNotFound(_))
        ));
        assert!(matches!(
            client.insert("mbl-players", "c", &doc),
            Err(StoreError::CollectionNotFound { .. })
        ));
        client.create_collection("mbl-players", "c").unwrap();
        client.insert("mbl-players", "c", &doc).unwrap();
    }

    #[test]
    fn find_preserves_insertion_order() {
        let client = client();
        client.create_collection("mbl-players", "c").unwrap();
        for name in ["a", "b", "c"] {
            let doc = Document::of_type("note").with("name", name);
            client.insert("mbl-players", "c", &doc).unwrap();
        }
        client
            .insert("mbl-players", "c", &Document::of_type("other"))
            .unwrap();

        let names: Vec<String> = client
            .find("mbl-players", "c", "type", &Value::from("note"))
            .unwrap()
            .map(|d| d.unwrap().get_str("name").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn update_creates_missing_field_and_reports_no_match() {
        let client = client();
        client.create_collection("mbl-players", "c").unwrap();
        client
            .insert("mbl-players", "c", &Document::of_type("playerdata"))
            .unwrap();

        let sel = Value::from("playerdata");
        assert!(client
            .update_field("mbl-players", "c", "type", &sel, "pendingRewardMaterial", &Value::from("COAL"))
            .unwrap());
        let doc = client.find_first("mbl-players", "c", "type", &sel).unwrap();
        assert_eq!(doc.get_str("pendingRewardMaterial"), Some("COAL"));

        let other = Value::from("mobdata");
        assert!(!client
            .update_field("mbl-players", "c", "type", &other, "kills", &Value::Integer(1))
            .unwrap());
    }

    #[test]
    fn collections_listed_sorted_and_scoped() {
        let client = client();
        client.create_database("other").unwrap();
        client.create_collection("mbl-players", "zeta").unwrap();
        client.create_collection("mbl-players", "alpha").unwrap();
        client.create_collection("other", "beta").unwrap();
        assert_eq!(
            client.list_collection_names("mbl-players").unwrap(),
            vec!["alpha", "zeta"]
        );
    }

    #[test]
    fn closed_client_rejects_operations() {
        let client = client();
        client.close().unwrap();
        client.close().unwrap();
        assert!(client.is_closed());
        assert!(matches!(
            client.list_collection_names("mbl-players"),
            Err(StoreError::Closed)
        ));
    }
}
