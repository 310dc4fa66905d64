//! Store collaborator
//!
//! The core only needs a scoped session that can execute statements and
//! commit or roll back. Sessions are owned values: dropping one without
//! committing rolls it back, which is what releases it on early returns and
//! cancelled requests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::{Entity, Table};
use crate::query::{Predicate, Select};
use crate::value::{Row, ValueError};

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};

/// What to do when an insert hits an existing key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    Fail,
    Ignore,
}

/// Statements the core issues
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Count {
        table: &'static Table,
        filter: Option<Predicate>,
    },
    Insert {
        table: &'static Table,
        row: Row,
        on_conflict: OnConflict,
    },
    Update {
        table: &'static Table,
        filter: Predicate,
        changes: Row,
    },
    Delete {
        table: &'static Table,
        filter: Predicate,
    },
}

impl Statement {
    pub fn table(&self) -> &'static Table {
        match self {
            Self::Select(select) => select.table,
            Self::Count { table, .. }
            | Self::Insert { table, .. }
            | Self::Update { table, .. }
            | Self::Delete { table, .. } => table,
        }
    }
}

/// Result of executing a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Rows(Vec<Row>),
    Count(i64),
    Affected(u64),
}

impl Output {
    fn describe(&self) -> &'static str {
        match self {
            Self::Rows(_) => "rows",
            Self::Count(_) => "a count",
            Self::Affected(_) => "an affected-row count",
        }
    }

    pub fn into_rows(self) -> Result<Vec<Row>, StoreError> {
        match self {
            Self::Rows(rows) => Ok(rows),
            other => Err(StoreError::UnexpectedOutput {
                expected: "rows",
                found: other.describe(),
            }),
        }
    }

    pub fn into_count(self) -> Result<i64, StoreError> {
        match self {
            Self::Count(n) => Ok(n),
            other => Err(StoreError::UnexpectedOutput {
                expected: "a count",
                found: other.describe(),
            }),
        }
    }

    pub fn into_affected(self) -> Result<u64, StoreError> {
        match self {
            Self::Affected(n) => Ok(n),
            other => Err(StoreError::UnexpectedOutput {
                expected: "an affected-row count",
                found: other.describe(),
            }),
        }
    }
}

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("duplicate key violates {constraint}")]
    Conflict { constraint: String },

    #[error("referenced row missing for {constraint}")]
    MissingReference { constraint: String },

    #[error("cannot decode column {column}: {source}")]
    Decode {
        column: String,
        #[source]
        source: ValueError,
    },

    #[error("statement returned {found}, expected {expected}")]
    UnexpectedOutput {
        expected: &'static str,
        found: &'static str,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or("constraint").to_owned();
            if db.is_unique_violation() {
                return Self::Conflict { constraint };
            }
            if db.is_foreign_key_violation() {
                return Self::MissingReference { constraint };
            }
        }
        Self::Sqlx(err)
    }
}

/// A source of sessions
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Session: Session;

    /// Open a transactional session.
    async fn begin(&self) -> Result<Self::Session, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// One unit of work against the store
#[async_trait]
pub trait Session: Send {
    async fn execute(&mut self, statement: &Statement) -> Result<Output, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;

    /// Reload a record's attributes from its stored row.
    ///
    /// Returns `false` when the row no longer exists. Loaded relations on the
    /// record are left as they are.
    async fn refresh<E: Entity>(&mut self, record: &mut E) -> Result<bool, StoreError> {
        let registry = E::registry();
        let identity = registry.identity();
        let select = Select::new(registry.table())
            .filter(Predicate::eq(identity.column(), identity.get(record)))
            .limit(1);
        let rows = self.execute(&Statement::Select(select)).await?.into_rows()?;
        match rows.into_iter().next() {
            Some(row) => {
                registry.apply_row(record, row)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
