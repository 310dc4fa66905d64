//! PostgreSQL store
//!
//! Statements are rendered with `sqlx::QueryBuilder`. Identifiers come only
//! from static table metadata and are always quoted; every value is bound.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row as _, Transaction};
use tracing::debug;

use super::{OnConflict, Output, Session, Statement, Store, StoreError};
use crate::entity::{Column, Table};
use crate::query::{Direction, Predicate};
use crate::value::{FieldKind, Row, Value};

/// Default maximum connections for the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Create a PostgreSQL connection pool.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool("postgres://localhost/hng_vibes", 10).await?;
/// ```
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Store backed by a connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    type Session = PgSession;

    async fn begin(&self) -> Result<PgSession, StoreError> {
        Ok(PgSession {
            tx: self.pool.begin().await?,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// A transaction on one pooled connection
///
/// Dropping it without `commit` rolls back and returns the connection.
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Session for PgSession {
    async fn execute(&mut self, statement: &Statement) -> Result<Output, StoreError> {
        let mut builder = render(statement);
        debug!(table = statement.table().name, sql = builder.sql(), "executing statement");

        match statement {
            Statement::Select(select) => {
                let rows = builder.build().fetch_all(&mut *self.tx).await?;
                rows.iter()
                    .map(|row| decode(select.table, row))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Output::Rows)
            }
            Statement::Count { .. } => {
                let row = builder.build().fetch_one(&mut *self.tx).await?;
                Ok(Output::Count(row.try_get::<i64, _>(0)?))
            }
            _ => {
                let done = builder.build().execute(&mut *self.tx).await?;
                Ok(Output::Affected(done.rows_affected()))
            }
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Render a statement into a query builder with bound values.
pub fn render(statement: &Statement) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("");
    match statement {
        Statement::Select(select) => {
            qb.push("SELECT ");
            push_columns(&mut qb, select.table.columns.iter().map(|c| c.name));
            qb.push(" FROM ").push(quote(select.table.name));
            push_where(&mut qb, select.filter.as_ref());
            if !select.order.is_empty() {
                qb.push(" ORDER BY ");
                for (i, order) in select.order.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    qb.push(quote(order.column.name));
                    qb.push(match order.direction {
                        Direction::Ascending => " ASC",
                        Direction::Descending => " DESC",
                    });
                }
            }
            if let Some(limit) = select.limit {
                qb.push(" LIMIT ").push_bind(clamp_i64(limit));
            }
            if select.offset > 0 {
                qb.push(" OFFSET ").push_bind(clamp_i64(select.offset));
            }
        }
        Statement::Count { table, filter } => {
            qb.push("SELECT COUNT(*) FROM ").push(quote(table.name));
            push_where(&mut qb, filter.as_ref());
        }
        Statement::Insert {
            table,
            row,
            on_conflict,
        } => {
            qb.push("INSERT INTO ").push(quote(table.name)).push(" (");
            push_columns(&mut qb, row.keys().copied());
            qb.push(") VALUES (");
            for (i, (name, value)) in row.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(&mut qb, kind_of(table, name), value);
            }
            qb.push(")");
            if *on_conflict == OnConflict::Ignore {
                qb.push(" ON CONFLICT DO NOTHING");
            }
        }
        Statement::Update {
            table,
            filter,
            changes,
        } => {
            qb.push("UPDATE ").push(quote(table.name)).push(" SET ");
            for (i, (name, value)) in changes.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push(quote(name)).push(" = ");
                push_value(&mut qb, kind_of(table, name), value);
            }
            push_where(&mut qb, Some(filter));
        }
        Statement::Delete { table, filter } => {
            qb.push("DELETE FROM ").push(quote(table.name));
            push_where(&mut qb, Some(filter));
        }
    }
    qb
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn kind_of(table: &'static Table, name: &str) -> FieldKind {
    table.column(name).map_or(FieldKind::Text, |c| c.kind)
}

fn push_columns<'a>(qb: &mut QueryBuilder<'static, Postgres>, names: impl Iterator<Item = &'a str>) {
    for (i, name) in names.enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(quote(name));
    }
}

fn push_where(qb: &mut QueryBuilder<'static, Postgres>, filter: Option<&Predicate>) {
    if let Some(predicate) = filter {
        qb.push(" WHERE ");
        push_predicate(qb, predicate);
    }
}

fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Eq {
            column,
            value: Value::Null,
        } => {
            qb.push(quote(column.name)).push(" IS NULL");
        }
        Predicate::Eq { column, value } => {
            qb.push(quote(column.name)).push(" = ");
            push_value(qb, column.kind, value);
        }
        Predicate::Contains { column, needle } => {
            qb.push(quote(column.name))
                .push(" ILIKE ")
                .push_bind(format!("%{}%", escape_like(needle)))
                .push(r" ESCAPE '\'");
        }
        Predicate::In { values, .. } if values.is_empty() => {
            qb.push("FALSE");
        }
        Predicate::In { column, values } => {
            qb.push(quote(column.name)).push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, column.kind, value);
            }
            qb.push(")");
        }
        Predicate::All(parts) => push_joined(qb, parts, " AND ", "TRUE"),
        Predicate::Any(parts) => push_joined(qb, parts, " OR ", "FALSE"),
    }
}

fn push_joined(qb: &mut QueryBuilder<'static, Postgres>, parts: &[Predicate], joiner: &str, empty: &str) {
    if parts.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            qb.push(joiner);
        }
        push_predicate(qb, part);
    }
    qb.push(")");
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, kind: FieldKind, value: &Value) {
    match value {
        Value::Null => match kind {
            FieldKind::Text => qb.push_bind(None::<String>),
            FieldKind::Integer => qb.push_bind(None::<i64>),
            FieldKind::Boolean => qb.push_bind(None::<bool>),
            FieldKind::Timestamp => qb.push_bind(None::<DateTime<Utc>>),
        },
        Value::Boolean(b) => qb.push_bind(*b),
        Value::Integer(n) => qb.push_bind(*n),
        Value::Text(s) => qb.push_bind(s.clone()),
        Value::Timestamp(ts) => qb.push_bind(*ts),
    };
}

/// Escape LIKE wildcards so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn decode(table: &'static Table, row: &PgRow) -> Result<Row, StoreError> {
    table
        .columns
        .iter()
        .map(|column| Ok((column.name, decode_column(column, row)?)))
        .collect()
}

fn decode_column(column: &Column, row: &PgRow) -> Result<Value, StoreError> {
    let value = match column.kind {
        FieldKind::Text => row.try_get::<Option<String>, _>(column.name)?.map(Value::Text),
        FieldKind::Integer => row.try_get::<Option<i64>, _>(column.name)?.map(Value::Integer),
        FieldKind::Boolean => row.try_get::<Option<bool>, _>(column.name)?.map(Value::Boolean),
        FieldKind::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(column.name)?
            .map(Value::Timestamp),
    };
    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{tables, Track};
    use crate::query::{plan, Combine, PageQuery, Select, SortKey, Window};

    #[test]
    fn renders_page_select() {
        let query = PageQuery::new()
            .filter("album", "Blue")
            .filter("year", 2001)
            .combine(Combine::Or)
            .search("love")
            .sort(SortKey::desc("year"))
            .window(Window::new(2, 10).unwrap());
        let select = plan::compile::<Track>(&query).unwrap();
        let qb = render(&Statement::Select(select));

        assert_eq!(
            qb.sql(),
            "SELECT \"id\", \"title\", \"album\", \"year\", \"duration_ms\", \"cover_url\", \
             \"audio_url\", \"spotify_url\", \"added_at\", \"added_by_name\" FROM \"track\" \
             WHERE ((\"album\" = $1 OR \"year\" = $2) AND \"title\" ILIKE $3 ESCAPE '\\') \
             ORDER BY \"year\" DESC, \"id\" ASC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn renders_count_with_same_predicate() {
        let select = plan::compile::<Track>(&PageQuery::new().filter("album", "Blue")).unwrap();
        let qb = render(&Statement::Count {
            table: select.table,
            filter: select.filter,
        });
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM \"track\" WHERE \"album\" = $1");
    }

    #[test]
    fn renders_empty_in_as_false() {
        let column = tables::GENRE.expect_column("name");
        let qb = render(&Statement::Select(Select::any_of(&tables::GENRE, column, vec![])));
        assert!(qb.sql().contains("WHERE FALSE"));
    }

    #[test]
    fn renders_insert_ignore() {
        let mut row = Row::new();
        row.insert("genre_name", Value::from("pop"));
        row.insert("track_id", Value::from("t1"));
        let qb = render(&Statement::Insert {
            table: &tables::TRACK_GENRE,
            row,
            on_conflict: OnConflict::Ignore,
        });
        assert_eq!(
            qb.sql(),
            "INSERT INTO \"track_genre\" (\"genre_name\", \"track_id\") VALUES ($1, $2) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn renders_partial_update() {
        let mut changes = Row::new();
        changes.insert("title", Value::from("New"));
        let id = tables::TRACK.expect_column("id");
        let qb = render(&Statement::Update {
            table: &tables::TRACK,
            filter: Predicate::eq(id, "t1"),
            changes,
        });
        assert_eq!(qb.sql(), "UPDATE \"track\" SET \"title\" = $1 WHERE \"id\" = $2");
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_acquires_connection() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let store = PgStore::new(create_pool(&url, 2).await.expect("pool creation failed"));
        store.ping().await.expect("ping failed");
    }
}
