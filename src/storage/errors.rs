use thiserror::Error;

/// Errors that can arise while interacting with the document store.
///
/// The first four variants are ordinary misses; everything else is a fault.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The named database has not been created.
    #[error("database doesn't exist: {0}")]
    DatabaseNotFound(String),

    /// The named collection has not been created in its database.
    #[error("collection doesn't exist: {database}/{collection}")]
    CollectionNotFound { database: String, collection: String },

    /// No document in the collection matched the selector.
    #[error("document doesn't exist: {collection} where {selector}")]
    DocumentNotFound { collection: String, selector: String },

    /// The matched document does not carry the requested field.
    #[error("field doesn't exist: {field} in {collection}")]
    FieldNotFound { collection: String, field: String },

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when decoding a document with an unexpected envelope version.
    #[error("schema mismatch in {collection}: expected {expected}, got {found}")]
    SchemaMismatch {
        collection: String,
        expected: u8,
        found: u8,
    },

    /// A stored document does not have the shape a caller relies on.
    #[error("malformed document in {collection}: {reason}")]
    Malformed { collection: String, reason: String },

    /// The connection string could not be understood.
    #[error("invalid connection string: {0}")]
    InvalidConnection(String),

    /// The client was closed before or during the operation.
    #[error("document store client is closed")]
    Closed,

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// True for the ordinary "nothing there" cases, false for faults.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::DatabaseNotFound(_)
                | StoreError::CollectionNotFound { .. }
                | StoreError::DocumentNotFound { .. }
                | StoreError::FieldNotFound { .. }
        )
    }
}

/// Result of a storage facade call.
///
/// Misses and faults travel on separate arms so a caller cannot mistake an
/// absent player for a broken connection.
#[derive(Debug)]
pub enum Outcome<T> {
    Found(T),
    NotFound(StoreError),
    Fault(StoreError),
}

impl<T> Outcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound(_))
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Outcome::Fault(_))
    }

    /// The value when found; misses and faults both collapse to `None`.
    pub fn found(self) -> Option<T> {
        match self {
            Outcome::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Found(value) => Outcome::Found(f(value)),
            Outcome::NotFound(err) => Outcome::NotFound(err),
            Outcome::Fault(err) => Outcome::Fault(err),
        }
    }

    /// Misses become `Ok(None)`; only faults become `Err`, so `?` propagates faults alone.
    pub fn into_result(self) -> Result<Option<T>, StoreError> {
        match self {
            Outcome::Found(value) => Ok(Some(value)),
            Outcome::NotFound(_) => Ok(None),
            Outcome::Fault(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, StoreError>> for Outcome<T> {
    fn from(result: Result<T, StoreError>) -> Self {
        match result {
            Ok(value) => Outcome::Found(value),
            Err(err) if err.is_not_found() => Outcome::NotFound(err),
            Err(err) => Outcome::Fault(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_misses_and_faults() {
        let miss: Outcome<()> = Err(StoreError::DatabaseNotFound("mbl-players".into())).into();
        assert!(miss.is_not_found());

        let fault: Outcome<()> = Err(StoreError::Closed).into();
        assert!(fault.is_fault());
        assert!(matches!(fault.into_result(), Err(StoreError::Closed)));
    }

    #[test]
    fn miss_becomes_none() {
        let miss: Outcome<i64> = Err(StoreError::FieldNotFound {
            collection: "c".into(),
            field: "kills".into(),
        })
        .into();
        assert!(matches!(miss.into_result(), Ok(None)));

        let hit: Outcome<i64> = Ok(3).into();
        assert_eq!(hit.map(|k| k + 1).found(), Some(4));
    }
}
