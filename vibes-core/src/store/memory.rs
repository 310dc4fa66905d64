//! In-process store
//!
//! Each session reads a snapshot of every table taken at `begin`. `commit`
//! replays the session's writes against the committed tables under the write
//! lock, so concurrent sessions never overwrite each other and a write that
//! clashes with a concurrent commit fails the whole commit. Dropping a
//! session discards it. Key and unique constraints declared in table metadata
//! are enforced, foreign keys are not.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{OnConflict, Output, Session, Statement, Store, StoreError};
use crate::entity::Table;
use crate::query::{Predicate, Select};
use crate::value::{Row, Value};

type Tables = HashMap<&'static str, Vec<Row>>;

/// Store holding rows in memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed rows in `table`.
    pub async fn row_count(&self, table: &Table) -> usize {
        self.tables
            .read()
            .await
            .get(table.name)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Session = MemorySession;

    async fn begin(&self) -> Result<MemorySession, StoreError> {
        let working = self.tables.read().await.clone();
        Ok(MemorySession {
            shared: Arc::clone(&self.tables),
            working,
            writes: Vec::new(),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Snapshot of all tables for one unit of work
///
/// Reads see the snapshot plus this session's own writes. Writes are logged
/// and replayed against the committed tables at `commit`.
pub struct MemorySession {
    shared: Arc<RwLock<Tables>>,
    working: Tables,
    writes: Vec<Statement>,
}

fn select(tables: &Tables, select: &Select) -> Vec<Row> {
    let mut rows: Vec<Row> = tables
        .get(select.table.name)
        .into_iter()
        .flatten()
        .filter(|row| select.filter.as_ref().is_none_or(|p| p.matches(row)))
        .cloned()
        .collect();

    rows.sort_by(|a, b| {
        select
            .order
            .iter()
            .map(|order| order.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let offset = usize::try_from(select.offset).unwrap_or(usize::MAX);
    let limit = select
        .limit
        .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
    rows.into_iter().skip(offset).take(limit).collect()
}

fn insert(
    tables: &mut Tables,
    table: &'static Table,
    row: &Row,
    on_conflict: OnConflict,
) -> Result<u64, StoreError> {
    let rows = tables.entry(table.name).or_default();
    if let Some(constraint) = violated_constraint(table, rows.iter(), row) {
        return match on_conflict {
            OnConflict::Ignore => Ok(0),
            OnConflict::Fail => Err(StoreError::Conflict { constraint }),
        };
    }
    let mut stored = Row::new();
    for column in table.columns {
        stored.insert(column.name, row.get(column.name).cloned().unwrap_or(Value::Null));
    }
    rows.push(stored);
    Ok(1)
}

/// Apply `changes` to every matching row. Nothing changes when any updated
/// row would clash with another row's key or unique column.
fn update(
    tables: &mut Tables,
    table: &'static Table,
    filter: &Predicate,
    changes: &Row,
) -> Result<u64, StoreError> {
    let rows = tables.entry(table.name).or_default();
    let mut next = rows.clone();
    let mut affected = 0;
    for index in 0..next.len() {
        if !filter.matches(&next[index]) {
            continue;
        }
        let mut updated = next[index].clone();
        for (name, value) in changes {
            updated.insert(name, value.clone());
        }
        let others = next
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .map(|(_, row)| row);
        if let Some(constraint) = violated_constraint(table, others, &updated) {
            return Err(StoreError::Conflict { constraint });
        }
        next[index] = updated;
        affected += 1;
    }
    *rows = next;
    Ok(affected)
}

fn delete(tables: &mut Tables, table: &'static Table, filter: &Predicate) -> u64 {
    let rows = tables.entry(table.name).or_default();
    let before = rows.len();
    rows.retain(|row| !filter.matches(row));
    (before - rows.len()) as u64
}

fn apply(tables: &mut Tables, statement: &Statement) -> Result<Output, StoreError> {
    let output = match statement {
        Statement::Select(query) => Output::Rows(select(tables, query)),
        Statement::Count { table, filter } => {
            let count = tables
                .get(table.name)
                .into_iter()
                .flatten()
                .filter(|row| filter.as_ref().is_none_or(|p| p.matches(row)))
                .count();
            Output::Count(i64::try_from(count).unwrap_or(i64::MAX))
        }
        Statement::Insert {
            table,
            row,
            on_conflict,
        } => Output::Affected(insert(tables, table, row, *on_conflict)?),
        Statement::Update {
            table,
            filter,
            changes,
        } => Output::Affected(update(tables, table, filter, changes)?),
        Statement::Delete { table, filter } => Output::Affected(delete(tables, table, filter)),
    };
    Ok(output)
}

/// Name of the key or unique constraint `row` would violate, if any.
///
/// NULL never clashes with a unique column.
fn violated_constraint<'r>(
    table: &Table,
    rows: impl Iterator<Item = &'r Row> + Clone,
    row: &Row,
) -> Option<String> {
    let key_taken = rows
        .clone()
        .any(|existing| table.primary_key.iter().all(|k| existing.get(k) == row.get(k)));
    if key_taken {
        return Some(format!("{}_pkey", table.name));
    }
    table
        .unique
        .iter()
        .filter(|column| !matches!(row.get(*column), None | Some(Value::Null)))
        .find(|column| rows.clone().any(|existing| existing.get(*column) == row.get(*column)))
        .map(|column| format!("{}_{}_key", table.name, column))
}

#[async_trait]
impl Session for MemorySession {
    async fn execute(&mut self, statement: &Statement) -> Result<Output, StoreError> {
        let output = apply(&mut self.working, statement)?;
        if !matches!(statement, Statement::Select(_) | Statement::Count { .. }) {
            self.writes.push(statement.clone());
        }
        Ok(output)
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let mut shared = self.shared.write().await;
        let mut next = shared.clone();
        for statement in &self.writes {
            apply(&mut next, statement).inspect_err(|err| {
                debug!(table = statement.table().name, error = %err, "commit rejected");
            })?;
        }
        *shared = next;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tables;

    fn genre(name: &str) -> Statement {
        let mut row = Row::new();
        row.insert("name", Value::from(name));
        Statement::Insert {
            table: &tables::GENRE,
            row,
            on_conflict: OnConflict::Fail,
        }
    }

    #[tokio::test]
    async fn uncommitted_session_is_discarded() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.execute(&genre("pop")).await.unwrap();
        drop(session);
        assert_eq!(store.row_count(&tables::GENRE).await, 0);

        let mut session = store.begin().await.unwrap();
        session.execute(&genre("pop")).await.unwrap();
        session.commit().await.unwrap();
        assert_eq!(store.row_count(&tables::GENRE).await, 1);
    }

    #[tokio::test]
    async fn duplicate_key_conflicts() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.execute(&genre("pop")).await.unwrap();
        let err = session.execute(&genre("pop")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref constraint } if constraint == "genre_pkey"));
    }

    #[tokio::test]
    async fn select_orders_and_windows() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        for name in ["rock", "ambient", "pop", "jazz"] {
            session.execute(&genre(name)).await.unwrap();
        }

        let mut select = Select::new(&tables::GENRE).limit(2);
        select.offset = 1;
        let rows = session
            .execute(&Statement::Select(select))
            .await
            .unwrap()
            .into_rows()
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].to_string()).collect();
        assert_eq!(names, ["jazz", "pop"]);
    }

    #[tokio::test]
    async fn delete_reports_affected_rows() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.execute(&genre("pop")).await.unwrap();
        let name = tables::GENRE.expect_column("name");
        let delete = Statement::Delete {
            table: &tables::GENRE,
            filter: Predicate::eq(name, "pop"),
        };
        assert_eq!(session.execute(&delete).await.unwrap(), Output::Affected(1));
        assert_eq!(session.execute(&delete).await.unwrap(), Output::Affected(0));
    }

    fn curator(id: &str, name: &str) -> Statement {
        let mut row = Row::new();
        row.insert("id", Value::from(id));
        row.insert("name", Value::from(name));
        row.insert("avatar", Value::from("https://a.example/me.png"));
        Statement::Insert {
            table: &tables::ADDED_BY,
            row,
            on_conflict: OnConflict::Fail,
        }
    }

    #[tokio::test]
    async fn interleaved_sessions_both_commit() {
        let store = MemoryStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.execute(&genre("pop")).await.unwrap();
        second.execute(&genre("rock")).await.unwrap();

        first.commit().await.unwrap();
        second.commit().await.unwrap();
        assert_eq!(store.row_count(&tables::GENRE).await, 2);
    }

    #[tokio::test]
    async fn commit_rejects_key_taken_by_concurrent_commit() {
        let store = MemoryStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.execute(&genre("pop")).await.unwrap();
        second.execute(&genre("pop")).await.unwrap();
        second.execute(&genre("rock")).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref constraint } if constraint == "genre_pkey"));
        // Nothing from the failed commit lands.
        assert_eq!(store.row_count(&tables::GENRE).await, 1);
    }

    #[tokio::test]
    async fn update_into_taken_unique_value_conflicts() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session.execute(&curator("a1", "ada")).await.unwrap();
        session.execute(&curator("b1", "bob")).await.unwrap();

        let id = tables::ADDED_BY.expect_column("id");
        let rename = Statement::Update {
            table: &tables::ADDED_BY,
            filter: Predicate::eq(id, "b1"),
            changes: Row::from([("name", Value::from("ada"))]),
        };
        let err = session.execute(&rename).await.unwrap_err();
        assert!(
            matches!(err, StoreError::Conflict { ref constraint } if constraint == "added_by_name_key")
        );

        let rekey = Statement::Update {
            table: &tables::ADDED_BY,
            filter: Predicate::eq(id, "b1"),
            changes: Row::from([("id", Value::from("a1"))]),
        };
        let err = session.execute(&rekey).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref constraint } if constraint == "added_by_pkey"));

        // Renaming a row to its own value is not a clash.
        let same = Statement::Update {
            table: &tables::ADDED_BY,
            filter: Predicate::eq(id, "b1"),
            changes: Row::from([("name", Value::from("bob"))]),
        };
        assert_eq!(session.execute(&same).await.unwrap(), Output::Affected(1));
    }
}
