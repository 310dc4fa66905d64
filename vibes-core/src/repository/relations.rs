//! Relation loading, association links and cascading deletes
//!
//! Loading issues one statement per relation (two for many-to-many) however
//! many records are on the page.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::entity::{Entity, RelationKind, Table};
use crate::error::Error;
use crate::query::{Predicate, Select};
use crate::store::{OnConflict, Session, Statement, StoreError};
use crate::value::{Row, Value};

/// Eager-load every declared relation of `records`.
pub async fn load_relations<E: Entity, S: Session>(session: &mut S, records: &mut [E]) -> Result<(), StoreError> {
    if records.is_empty() {
        return Ok(());
    }
    let registry = E::registry();

    for relation in registry.relations() {
        let kind = relation.kind();
        let owner = kind.owner_attribute();
        let keys = distinct(records.iter().map(|r| registry.value_of(r, owner)));

        let mut grouped = match *kind {
            RelationKind::BelongsTo {
                target, target_key, ..
            } => {
                let rows = select_in(session, target, target_key, keys).await?;
                group_by(rows, target_key)
            }
            RelationKind::HasMany {
                target,
                foreign_key,
                ..
            } => {
                let rows = select_in(session, target, foreign_key, keys).await?;
                group_by(rows, foreign_key)
            }
            RelationKind::ManyToMany {
                link,
                link_owner,
                link_target,
                target,
                target_key,
                ..
            } => {
                let links = select_in(session, link, link_owner, keys).await?;
                let wanted = distinct(links.iter().filter_map(|row| row.get(link_target).cloned()));
                let targets: HashMap<Value, Row> = select_in(session, target, target_key, wanted)
                    .await?
                    .into_iter()
                    .filter_map(|row| row.get(target_key).cloned().map(|key| (key, row)))
                    .collect();

                let mut grouped: HashMap<Value, Vec<Row>> = HashMap::new();
                for row in &links {
                    let (Some(owner_key), Some(target)) = (
                        row.get(link_owner),
                        row.get(link_target).and_then(|key| targets.get(key)),
                    ) else {
                        continue;
                    };
                    grouped
                        .entry(owner_key.clone())
                        .or_default()
                        .push(target.clone());
                }
                grouped
            }
        };

        for record in records.iter_mut() {
            let key = registry.value_of(record, owner);
            let rows = grouped.remove(&key).unwrap_or_default();
            relation.attach(record, rows)?;
        }
        debug!(resource = E::RESOURCE, relation = relation.name(), "relation loaded");
    }
    Ok(())
}

/// Link `owner` to `keys` through a many-to-many relation.
///
/// Targets made of nothing but their key are created when missing. Any other
/// missing target is not-found and nothing is written. With `replace`, the
/// owner's existing links are removed first.
pub async fn write_links<S: Session>(
    session: &mut S,
    kind: &RelationKind,
    owner: &Value,
    keys: &[Value],
    replace: bool,
) -> crate::error::Result<()> {
    let RelationKind::ManyToMany {
        link,
        link_owner,
        link_target,
        target,
        target_key,
        ..
    } = *kind
    else {
        return Ok(());
    };

    let keys = distinct(keys.iter().cloned());
    let creates_targets = target.columns.len() == 1;
    if !creates_targets {
        let found: BTreeSet<Value> = select_in(session, target, target_key, keys.clone())
            .await?
            .into_iter()
            .filter_map(|row| row.get(target_key).cloned())
            .collect();
        if let Some(missing) = keys.iter().find(|key| !found.contains(*key)) {
            return Err(Error::not_found(target.name, missing));
        }
    }

    if replace {
        session
            .execute(&Statement::Delete {
                table: link,
                filter: Predicate::eq(link.expect_column(link_owner), owner.clone()),
            })
            .await?;
    }

    for key in keys {
        if creates_targets {
            session
                .execute(&Statement::Insert {
                    table: target,
                    row: Row::from([(target_key, key.clone())]),
                    on_conflict: OnConflict::Ignore,
                })
                .await?;
        }

        let mut link_row = Row::new();
        link_row.insert(link_owner, owner.clone());
        link_row.insert(link_target, key);
        session
            .execute(&Statement::Insert {
                table: link,
                row: link_row,
                on_conflict: OnConflict::Ignore,
            })
            .await?;
    }
    Ok(())
}

/// Delete rows of `table` matching `filter` and, first, every row they own.
pub fn delete_cascade<'a, S: Session>(
    session: &'a mut S,
    table: &'static Table,
    filter: Predicate,
) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + 'a>> {
    Box::pin(async move {
        if !table.dependents.is_empty() {
            let owners = session
                .execute(&Statement::Select(Select::new(table).filter(filter.clone())))
                .await?
                .into_rows()?;
            for dependent in table.dependents {
                let values: Vec<Value> = distinct(owners.iter().filter_map(|row| row.get(dependent.references).cloned()));
                if values.is_empty() {
                    continue;
                }
                let column = dependent.table.expect_column(dependent.foreign_key);
                let removed = delete_cascade(session, dependent.table, Predicate::In { column, values }).await?;
                debug!(table = dependent.table.name, removed, "cascaded delete");
            }
        }
        session
            .execute(&Statement::Delete { table, filter })
            .await?
            .into_affected()
    })
}

async fn select_in<S: Session>(
    session: &mut S,
    table: &'static Table,
    column: &'static str,
    values: Vec<Value>,
) -> Result<Vec<Row>, StoreError> {
    if values.is_empty() {
        return Ok(Vec::new());
    }
    let select = Select::any_of(table, table.expect_column(column), values);
    session.execute(&Statement::Select(select)).await?.into_rows()
}

fn group_by(rows: Vec<Row>, column: &'static str) -> HashMap<Value, Vec<Row>> {
    let mut grouped: HashMap<Value, Vec<Row>> = HashMap::new();
    for row in rows {
        if let Some(key) = row.get(column).cloned() {
            grouped.entry(key).or_default().push(row);
        }
    }
    grouped
}

/// Distinct non-null values in first-seen order.
fn distinct(values: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut seen = BTreeSet::new();
    values
        .into_iter()
        .filter(|v| *v != Value::Null && seen.insert(v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_skips_nulls_and_repeats() {
        let values = distinct([
            Value::from("b"),
            Value::Null,
            Value::from("a"),
            Value::from("b"),
        ]);
        assert_eq!(values, [Value::from("b"), Value::from("a")]);
    }
}
