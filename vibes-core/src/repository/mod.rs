//! Record lifecycle and querying for any [`Entity`]
//!
//! Each operation runs in its own store session. Writes commit at the end;
//! reads roll back. An early return drops the session, which rolls it back.

pub mod patch;
pub mod relations;

use std::marker::PhantomData;

use tracing::{debug, info};

use crate::entity::{decode_rows, Entity, RelationKind};
use crate::error::{Error, Result};
use crate::query::plan::{compile, compile_filters};
use crate::query::{Combine, FilterSet, Page, PageQuery, Predicate, Select};
use crate::store::{OnConflict, Session, Statement, Store};
use crate::validation::ValidationError;
use crate::value::{Row, Value};

pub use patch::Patch;
use relations::{delete_cascade, load_relations, write_links};

/// Repository for records of type `E`
pub struct Repository<'a, E, S> {
    store: &'a S,
    entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity, S: Store> Repository<'a, E, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            entity: PhantomData,
        }
    }

    /// The first record matching every filter, by identity order.
    pub async fn fetch_one(&self, filters: &FilterSet, include_relations: bool) -> Result<Option<E>> {
        let filter = compile_filters(E::registry(), filters, Combine::And)?;

        let mut session = self.store.begin().await?;
        let record = find::<E, _>(&mut session, filter, include_relations).await?;
        session.rollback().await?;
        Ok(record)
    }

    /// Fetch a record by identity, with relations loaded.
    pub async fn get(&self, id: impl Into<Value>) -> Result<E> {
        let id = id.into();
        let mut session = self.store.begin().await?;
        let record = find::<E, _>(&mut session, Some(by_identity::<E>(&id)), true).await?;
        session.rollback().await?;
        record.ok_or_else(|| Error::not_found(E::RESOURCE, id))
    }

    /// One page of matching records and the total across all pages.
    pub async fn fetch_page(&self, query: &PageQuery) -> Result<Page<E>> {
        let select = compile::<E>(query)?;

        let mut session = self.store.begin().await?;
        let total = session
            .execute(&Statement::Count {
                table: select.table,
                filter: select.filter.clone(),
            })
            .await?
            .into_count()?;
        let rows = session
            .execute(&Statement::Select(select))
            .await?
            .into_rows()?;
        let mut records = decode_rows::<E>(rows)?;
        if query.include_relations {
            load_relations(&mut session, &mut records).await?;
        }
        session.rollback().await?;

        Ok(Page {
            records,
            total,
            window: query.window,
        })
    }

    /// Insert a new record and return it as stored, relations loaded.
    pub async fn create(&self, record: E) -> Result<E> {
        let record = prepare(record)?;

        let mut session = self.store.begin().await?;
        let record = insert(&mut session, record).await?;
        session.commit().await?;

        info!(resource = E::RESOURCE, id = %record.identity(), "record created");
        Ok(record)
    }

    /// Return the stored record with `record`'s identity (or, when that is
    /// blank, its unique key), creating it if there is none.
    pub async fn get_or_create(&self, record: E) -> Result<E> {
        let lookup = natural_key(&record);
        let record = prepare(record)?;

        let mut session = self.store.begin().await?;
        if let Some(filter) = lookup {
            if let Some(existing) = find::<E, _>(&mut session, Some(filter), true).await? {
                session.rollback().await?;
                return Ok(existing);
            }
        }
        let record = insert(&mut session, record).await?;
        session.commit().await?;

        info!(resource = E::RESOURCE, id = %record.identity(), "record created");
        Ok(record)
    }

    /// Apply a partial update; relation key sets replace existing links.
    pub async fn update(&self, id: impl Into<Value>, patch: &Patch) -> Result<E> {
        let id = id.into();
        let resolved = patch.resolve::<E>()?;

        let mut session = self.store.begin().await?;
        let mut record = find::<E, _>(&mut session, Some(by_identity::<E>(&id)), false)
            .await?
            .ok_or_else(|| Error::not_found(E::RESOURCE, &id))?;

        let mut changes = Row::new();
        for (attribute, value) in &resolved.changes {
            attribute
                .set(&mut record, value.clone())
                .map_err(|e| ValidationError::InvalidValue {
                    field: attribute.name().to_owned(),
                    expected: e.expected,
                })?;
            changes.insert(attribute.name(), value.clone());
        }
        for (relation, keys) in &resolved.links {
            let target_key = match relation.kind() {
                RelationKind::ManyToMany { target_key, .. } => *target_key,
                _ => continue,
            };
            let rows: Vec<Row> = keys
                .iter()
                .map(|key| Row::from([(target_key, key.clone())]))
                .collect();
            relation.attach(&mut record, rows)?;
        }
        record.validate()?;

        for (relation, keys) in &resolved.links {
            let owner = E::registry().value_of(&record, relation.kind().owner_attribute());
            write_links(&mut session, relation.kind(), &owner, keys, true).await?;
        }
        if !changes.is_empty() {
            session
                .execute(&Statement::Update {
                    table: E::registry().table(),
                    filter: by_identity::<E>(&id),
                    changes,
                })
                .await?;
        }
        let record = reload(&mut session, record).await?;
        session.commit().await?;

        info!(resource = E::RESOURCE, id = %id, "record updated");
        Ok(record)
    }

    /// Delete a record and everything it owns.
    ///
    /// A missing record is not-found on every call.
    pub async fn delete(&self, id: impl Into<Value>) -> Result<bool> {
        let id = id.into();
        let table = E::registry().table();

        let mut session = self.store.begin().await?;
        let existing = session
            .execute(&Statement::Count {
                table,
                filter: Some(by_identity::<E>(&id)),
            })
            .await?
            .into_count()?;
        if existing == 0 {
            return Err(Error::not_found(E::RESOURCE, id));
        }
        delete_cascade(&mut session, table, by_identity::<E>(&id)).await?;
        session.commit().await?;

        info!(resource = E::RESOURCE, id = %id, "record deleted");
        Ok(true)
    }
}

fn by_identity<E: Entity>(id: &Value) -> Predicate {
    Predicate::eq(E::registry().identity().column(), id.clone())
}

/// Identity if set, else the first non-blank unique attribute.
fn natural_key<E: Entity>(record: &E) -> Option<Predicate> {
    let registry = E::registry();
    let id = record.identity();
    if !id.is_blank() {
        return Some(by_identity::<E>(&id));
    }
    registry
        .table()
        .unique
        .iter()
        .filter_map(|name| registry.lookup(name))
        .map(|attribute| (attribute, attribute.get(record)))
        .find(|(_, value)| !value.is_blank())
        .map(|(attribute, value)| Predicate::eq(attribute.column(), value))
}

/// Assign identity and defaults, then check field rules.
fn prepare<E: Entity>(mut record: E) -> Result<E> {
    let identity = E::registry().identity();
    if identity.get(&record).is_blank() {
        let generated = E::generate_identity().ok_or(ValidationError::Empty {
            field: identity.name(),
        })?;
        identity
            .set(&mut record, generated)
            .map_err(|e| ValidationError::InvalidValue {
                field: identity.name().to_owned(),
                expected: e.expected,
            })?;
    }
    record.prepare_create();
    record.validate()?;
    Ok(record)
}

async fn insert<E: Entity, S: Session>(session: &mut S, record: E) -> Result<E> {
    let registry = E::registry();
    session
        .execute(&Statement::Insert {
            table: registry.table(),
            row: record.to_row(),
            on_conflict: OnConflict::Fail,
        })
        .await?;

    let id = record.identity();
    for relation in registry.relations() {
        if let Some(keys) = relation.links(&record) {
            let owner = registry.value_of(&record, relation.kind().owner_attribute());
            write_links(session, relation.kind(), &owner, &keys, false).await?;
        }
    }
    debug!(resource = E::RESOURCE, id = %id, "row inserted");
    reload(session, record).await
}

/// Refresh attributes from the store and load every relation.
async fn reload<E: Entity, S: Session>(session: &mut S, mut record: E) -> Result<E> {
    if !session.refresh(&mut record).await? {
        return Err(Error::not_found(E::RESOURCE, record.identity()));
    }
    load_relations(session, std::slice::from_mut(&mut record)).await?;
    Ok(record)
}

async fn find<E: Entity, S: Session>(
    session: &mut S,
    filter: Option<Predicate>,
    include_relations: bool,
) -> Result<Option<E>> {
    let mut select = Select::new(E::registry().table()).limit(1);
    select.filter = filter;
    let rows = session
        .execute(&Statement::Select(select))
        .await?
        .into_rows()?;
    let mut records = decode_rows::<E>(rows)?;
    if include_relations {
        load_relations(session, &mut records).await?;
    }
    Ok(records.pop())
}
