use uuid::Uuid;

use super::client::DocumentCursor;
use super::document::{Document, Value, TYPE_FIELD};
use super::errors::Outcome;
use super::facade::StorageFacade;

/// Storage bound to one player's collection.
///
/// The collection is named by the player's UUID and every document in it is
/// selected by its `type` field, so callers only name the document type.
#[derive(Clone)]
pub struct PlayerStorage {
    facade: StorageFacade,
    database: String,
    player_uuid: String,
}

impl PlayerStorage {
    pub fn new(facade: StorageFacade, database: impl Into<String>, player: Uuid) -> Self {
        Self {
            facade,
            database: database.into(),
            player_uuid: player.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.player_uuid
    }

    /// Create the player's collection (and the database) if missing.
    pub async fn provision(&self) -> Outcome<()> {
        match self.facade.ensure_database(&self.database).await {
            Outcome::Found(()) => {}
            other => return other,
        }
        self.facade
            .ensure_collection(&self.database, &self.player_uuid)
            .await
    }

    /// Whether a document of `document_type` exists for this player.
    ///
    /// Blocks the calling thread; call it from a blocking context such as
    /// `tokio::task::spawn_blocking`. Misses and faults both read as `false`.
    pub fn exists(&self, document_type: &str) -> bool {
        match self.facade.find_documents_blocking(
            &self.database,
            &self.player_uuid,
            TYPE_FIELD,
            document_type,
        ) {
            Outcome::Found(mut cursor) => matches!(cursor.next(), Some(Ok(_))),
            _ => false,
        }
    }

    pub async fn get_field_value(&self, document_type: &str, field_to_get: &str) -> Outcome<Value> {
        self.facade
            .get_field_value(
                &self.database,
                &self.player_uuid,
                TYPE_FIELD,
                document_type,
                field_to_get,
            )
            .await
    }

    pub async fn set_field_value(
        &self,
        document_type: &str,
        field_to_set: &str,
        new_value: impl Into<Value>,
    ) -> Outcome<bool> {
        self.facade
            .set_field_value(
                &self.database,
                &self.player_uuid,
                TYPE_FIELD,
                document_type,
                field_to_set,
                new_value,
            )
            .await
    }

    pub async fn insert_document(&self, document: Document) -> Outcome<()> {
        self.facade
            .insert_document(&self.database, &self.player_uuid, document)
            .await
    }

    pub async fn find_documents(&self, field: &str, value: impl Into<Value>) -> Outcome<DocumentCursor> {
        self.facade
            .find_documents(&self.database, &self.player_uuid, field, value)
            .await
    }
}
