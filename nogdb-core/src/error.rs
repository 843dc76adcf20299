use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the engine can report, one variant per error kind.
///
/// Errors abort the current operation only; the owning transaction stays
/// alive in its prior state unless the variant's contract says otherwise.
#[derive(Debug, Error)]
pub enum Error {
    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("property not found: {0}")]
    PropertyNotFound(String),

    #[error("index not found: {class}.{property}")]
    IndexNotFound { class: String, property: String },

    #[error("record not found: {0}")]
    RecordNotFound(nogdb_api::RecordId),

    #[error("vertex not found: {0}")]
    VertexNotFound(nogdb_api::RecordId),

    #[error("source vertex not found: {0}")]
    SourceNotFound(nogdb_api::RecordId),

    #[error("destination vertex not found: {0}")]
    DestNotFound(nogdb_api::RecordId),

    #[error("class already exists: {0}")]
    DuplicateClass(String),

    #[error("property already exists: {0}")]
    DuplicateProperty(String),

    #[error("index already exists: {class}.{property}")]
    DuplicateIndex { class: String, property: String },

    #[error("invalid class name: {0:?}")]
    InvalidClassName(String),

    #[error("invalid property name: {0:?}")]
    InvalidPropertyName(String),

    #[error("property type cannot be indexed: {0}")]
    InvalidPropertyTypeForIndex(nogdb_api::PropertyType),

    #[error("unique index constraint cannot be satisfied by existing records")]
    InvalidIndexConstraint,

    #[error("class type mismatch: {0}")]
    ClassTypeMismatch(String),

    #[error("property is referenced by an index: {0}")]
    PropertyInUse(String),

    #[error("unique index violation on property: {0}")]
    UniqueConstraint(String),

    #[error("data type mismatch: {0}")]
    DataTypeMismatch(String),

    #[error("transaction is already committed or rolled back")]
    TxnCompleted,

    #[error("operation requires a read-write transaction")]
    TxnReadOnly,

    #[error("unrecognized token {token:?} at line {line}, column {column}")]
    UnrecognizedToken {
        token: String,
        line: usize,
        column: usize,
    },

    #[error("syntax error at line {line}, column {column}: {message}")]
    SyntaxError {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("stored bytes corrupted: {0}")]
    Corrupted(&'static str),

    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),
}
