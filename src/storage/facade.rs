use std::sync::Arc;

use log::{debug, error, warn};

use super::client::{DocumentCursor, DocumentStoreClient};
use super::document::{Document, Value};
use super::errors::{Outcome, StoreError};
use crate::logutil::reference;

/// What a facade call was doing, for the log line emitted when it misses or faults.
#[derive(Debug, Clone)]
struct Query {
    op: &'static str,
    database: String,
    collection: Option<String>,
    selector: Option<(String, String)>,
    field: Option<String>,
    value: Option<String>,
}

impl Query {
    fn new(op: &'static str, database: &str) -> Self {
        Self {
            op,
            database: database.to_string(),
            collection: None,
            selector: None,
            field: None,
            value: None,
        }
    }

    fn collection(mut self, collection: &str) -> Self {
        self.collection = Some(collection.to_string());
        self
    }

    fn selector(mut self, field: &str, value: &Value) -> Self {
        self.selector = Some((field.to_string(), value.to_string()));
        self
    }

    fn field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    fn value(mut self, value: impl ToString) -> Self {
        self.value = Some(value.to_string());
        self
    }

    fn reference(&self) -> String {
        let (sel_field, sel_value) = match &self.selector {
            Some((f, v)) => (Some(f.as_str()), Some(v.as_str())),
            None => (None, None),
        };
        reference([
            Some(self.database.as_str()),
            self.collection.as_deref(),
            sel_field,
            sel_value,
            self.field.as_deref(),
            self.value.as_deref(),
        ])
    }

    /// Log a miss or a fault with full context, then classify.
    fn report<T>(&self, result: Result<T, StoreError>) -> Outcome<T> {
        let outcome = Outcome::from(result);
        match &outcome {
            Outcome::Found(_) => {}
            Outcome::NotFound(err) => {
                warn!("storage miss on {}, reference -> {}: {}", self.op, self.reference(), err);
            }
            Outcome::Fault(err) => {
                error!("storage fault on {}, reference -> {}: {}", self.op, self.reference(), err);
            }
        }
        outcome
    }
}

/// Async field-level CRUD over the document store.
///
/// Every call runs on tokio's blocking pool and resolves on the awaiting task, so a
/// continuation that touches game state stays on the caller's context. Clones share
/// the same client.
#[derive(Clone)]
pub struct StorageFacade {
    client: Arc<DocumentStoreClient>,
}

impl StorageFacade {
    pub fn new(client: DocumentStoreClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Open a client from a connection string and wrap it.
    pub fn connect(connection_string: &str) -> Result<Self, StoreError> {
        Ok(Self::new(DocumentStoreClient::connect(connection_string)?))
    }

    /// Direct access for callers already running on a blocking thread.
    pub fn client(&self) -> &Arc<DocumentStoreClient> {
        &self.client
    }

    async fn dispatch<T, F>(&self, query: Query, op: F) -> Outcome<T>
    where
        T: Send + 'static,
        F: FnOnce(&DocumentStoreClient) -> Result<T, StoreError> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        let result = tokio::task::spawn_blocking(move || op(&client))
            .await
            .map_err(|err| StoreError::Internal(format!("storage task failed: {err}")))
            .and_then(|r| r);
        query.report(result)
    }

    /// Create the database if it does not exist yet.
    pub async fn ensure_database(&self, database: &str) -> Outcome<()> {
        let query = Query::new("ensureDatabase", database);
        let db = database.to_string();
        self.dispatch(query, move |c| c.create_database(&db)).await
    }

    /// Create the collection if it does not exist yet. The database must exist.
    pub async fn ensure_collection(&self, database: &str, collection: &str) -> Outcome<()> {
        let query = Query::new("ensureCollection", database).collection(collection);
        let (db, coll) = (database.to_string(), collection.to_string());
        self.dispatch(query, move |c| c.create_collection(&db, &coll)).await
    }

    pub async fn list_collection_names(&self, database: &str) -> Outcome<Vec<String>> {
        let query = Query::new("listCollectionNames", database);
        let db = database.to_string();
        self.dispatch(query, move |c| c.list_collection_names(&db)).await
    }

    /// Insert one document. A missing database or collection is reported, not created.
    pub async fn insert_document(&self, database: &str, collection: &str, document: Document) -> Outcome<()> {
        let query = Query::new("insertDocument", database)
            .collection(collection)
            .value(&document);
        let (db, coll) = (database.to_string(), collection.to_string());
        self.dispatch(query, move |c| c.insert(&db, &coll, &document)).await
    }

    /// Lazy cursor over documents where `field == value`. No matches is an empty cursor.
    pub async fn find_documents(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Outcome<DocumentCursor> {
        let value = value.into();
        let query = Query::new("findDocuments", database)
            .collection(collection)
            .selector(field, &value);
        let (db, coll, field) = (database.to_string(), collection.to_string(), field.to_string());
        self.dispatch(query, move |c| c.find(&db, &coll, &field, &value)).await
    }

    /// Same as [`StorageFacade::find_documents`] but runs on the calling thread.
    pub fn find_documents_blocking(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Outcome<DocumentCursor> {
        let value = value.into();
        let query = Query::new("findDocuments", database)
            .collection(collection)
            .selector(field, &value);
        query.report(self.client.find(database, collection, field, &value))
    }

    /// Read one field from the first document matching the selector.
    pub async fn get_field_value(
        &self,
        database: &str,
        collection: &str,
        selector_field: &str,
        selector_value: impl Into<Value>,
        field_to_get: &str,
    ) -> Outcome<Value> {
        let selector_value = selector_value.into();
        let query = Query::new("getFieldValue", database)
            .collection(collection)
            .selector(selector_field, &selector_value)
            .field(field_to_get);
        let (db, coll) = (database.to_string(), collection.to_string());
        let (sel, target) = (selector_field.to_string(), field_to_get.to_string());
        self.dispatch(query, move |c| {
            let document = c.find_first(&db, &coll, &sel, &selector_value)?;
            document
                .get(&target)
                .cloned()
                .ok_or(StoreError::FieldNotFound {
                    collection: coll.clone(),
                    field: target.clone(),
                })
        })
        .await
    }

    /// Set one field on the first document matching the selector.
    ///
    /// Resolves to `Found(false)` when no document matched; that is not an error.
    pub async fn set_field_value(
        &self,
        database: &str,
        collection: &str,
        selector_field: &str,
        selector_value: impl Into<Value>,
        field_to_set: &str,
        new_value: impl Into<Value>,
    ) -> Outcome<bool> {
        let selector_value = selector_value.into();
        let new_value = new_value.into();
        let query = Query::new("setFieldValue", database)
            .collection(collection)
            .selector(selector_field, &selector_value)
            .field(field_to_set)
            .value(&new_value);
        let (db, coll) = (database.to_string(), collection.to_string());
        let (sel, target) = (selector_field.to_string(), field_to_set.to_string());
        self.dispatch(query, move |c| {
            c.update_field(&db, &coll, &sel, &selector_value, &target, &new_value)
        })
        .await
    }

    /// Flush and close the shared client. Does not wait for in-flight calls, which
    /// fault with [`StoreError::Closed`] if they reach the store afterwards.
    pub async fn close(&self) -> Result<(), StoreError> {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || client.close())
            .await
            .map_err(|err| StoreError::Internal(format!("close task failed: {err}")))??;
        debug!("document store client closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_reference_lists_every_parameter() {
        let q = Query::new("setFieldValue", "mbl-players")
            .collection("abc")
            .selector("type", &Value::from("playerdata"))
            .field("kills")
            .value(Value::Integer(4));
        assert_eq!(q.reference(), "mbl-players;abc;type;playerdata;kills;4");

        let partial = Query::new("listCollectionNames", "mbl-players");
        assert_eq!(partial.reference(), "mbl-players;null;null;null;null;null");
    }

    #[tokio::test]
    async fn get_on_missing_field_is_a_miss() {
        let facade = StorageFacade::connect("memory://").unwrap();
        assert!(facade.ensure_database("db").await.is_found());
        assert!(facade.ensure_collection("db", "c").await.is_found());
        assert!(facade
            .insert_document("db", "c", Document::of_type("playerdata"))
            .await
            .is_found());

        let outcome = facade
            .get_field_value("db", "c", "type", "playerdata", "kills")
            .await;
        assert!(matches!(outcome, Outcome::NotFound(StoreError::FieldNotFound { .. })));
    }
}
