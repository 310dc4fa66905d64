//! Per-entity attribute registry
//!
//! Maps attribute names to a typed getter/setter pair and the column they
//! live in. Built once per entity type (behind a `Lazy`) and never mutated,
//! so validation of caller-supplied names is a map lookup.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use super::schema::{Column, Table};
use crate::store::StoreError;
use crate::value::{FieldKind, Row, Value, ValueError};

type Getter<E> = fn(&E) -> Value;
type Setter<E> = fn(&mut E, Value) -> Result<(), ValueError>;
type Attach<E> = fn(&mut E, Vec<Row>) -> Result<(), StoreError>;
type Render<E> = fn(&E) -> Option<JsonValue>;
type Links<E> = fn(&E) -> Option<Vec<Value>>;

/// A named scalar attribute backed by a column
pub struct Attribute<E> {
    column: &'static Column,
    get: Getter<E>,
    set: Setter<E>,
}

impl<E> Attribute<E> {
    pub fn name(&self) -> &'static str {
        self.column.name
    }

    pub fn kind(&self) -> FieldKind {
        self.column.kind
    }

    pub fn column(&self) -> &'static Column {
        self.column
    }

    pub fn get(&self, record: &E) -> Value {
        (self.get)(record)
    }

    pub fn set(&self, record: &mut E, value: Value) -> Result<(), ValueError> {
        (self.set)(record, value)
    }
}

/// How a relation's rows are found
#[derive(Debug, Clone, Copy)]
pub enum RelationKind {
    /// The owner holds the key of one target row.
    BelongsTo {
        local: &'static str,
        target: &'static Table,
        target_key: &'static str,
    },
    /// Target rows hold the owner's key.
    HasMany {
        owner_key: &'static str,
        target: &'static Table,
        foreign_key: &'static str,
    },
    /// Owner and target are joined through an association table.
    ManyToMany {
        owner_key: &'static str,
        link: &'static Table,
        link_owner: &'static str,
        link_target: &'static str,
        target: &'static Table,
        target_key: &'static str,
    },
}

impl RelationKind {
    /// Owner-side attribute whose value keys the relation.
    pub fn owner_attribute(&self) -> &'static str {
        match self {
            Self::BelongsTo { local, .. } => local,
            Self::HasMany { owner_key, .. } | Self::ManyToMany { owner_key, .. } => owner_key,
        }
    }

    pub fn target(&self) -> &'static Table {
        match self {
            Self::BelongsTo { target, .. }
            | Self::HasMany { target, .. }
            | Self::ManyToMany { target, .. } => target,
        }
    }
}

/// A declared relation
///
/// `attach` stores loaded rows on the owner, `render` serializes them back
/// (returning `None` when the relation is not loaded) and `links` exposes the
/// target keys a many-to-many relation should be linked to on write.
pub struct Relation<E> {
    name: &'static str,
    kind: RelationKind,
    attach: Attach<E>,
    render: Render<E>,
    links: Option<Links<E>>,
}

impl<E> Relation<E> {
    pub fn new(name: &'static str, kind: RelationKind, attach: Attach<E>, render: Render<E>) -> Self {
        Self {
            name,
            kind,
            attach,
            render,
            links: None,
        }
    }

    /// Declare which target keys a record links to (many-to-many only).
    pub fn with_links(mut self, links: Links<E>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &RelationKind {
        &self.kind
    }

    pub fn attach(&self, record: &mut E, rows: Vec<Row>) -> Result<(), StoreError> {
        (self.attach)(record, rows)
    }

    pub fn render(&self, record: &E) -> Option<JsonValue> {
        (self.render)(record)
    }

    pub fn links(&self, record: &E) -> Option<Vec<Value>> {
        self.links.and_then(|links| links(record))
    }
}

/// Attribute and relation registry for one entity type
pub struct Registry<E> {
    table: &'static Table,
    identity: &'static str,
    attributes: Vec<Attribute<E>>,
    index: HashMap<&'static str, usize>,
    search_fields: &'static [&'static str],
    relations: Vec<Relation<E>>,
}

impl<E> Registry<E> {
    /// Start a registry for `table`. The table must have a single-column key.
    pub fn new(table: &'static Table) -> Self {
        assert!(
            table.primary_key.len() == 1,
            "entity table '{}' needs a single-column primary key",
            table.name
        );
        Self {
            table,
            identity: table.primary_key[0],
            attributes: Vec::new(),
            index: HashMap::new(),
            search_fields: &[],
            relations: Vec::new(),
        }
    }

    /// Register an attribute stored in the column of the same name.
    pub fn attribute(mut self, name: &'static str, get: Getter<E>, set: Setter<E>) -> Self {
        let column = self.table.expect_column(name);
        self.index.insert(column.name, self.attributes.len());
        self.attributes.push(Attribute { column, get, set });
        self
    }

    /// Declare the fields matched by free-text search.
    pub fn searchable(mut self, fields: &'static [&'static str]) -> Self {
        self.search_fields = fields;
        self
    }

    pub fn relation(mut self, relation: Relation<E>) -> Self {
        let owner = relation.kind.owner_attribute();
        assert!(
            self.index.contains_key(owner),
            "relation '{}' keys on unregistered attribute '{}'",
            relation.name,
            owner
        );
        check_relation_columns(&relation.kind);
        self.relations.push(relation);
        self
    }

    pub fn table(&self) -> &'static Table {
        self.table
    }

    pub fn attributes(&self) -> &[Attribute<E>] {
        &self.attributes
    }

    pub fn lookup(&self, name: &str) -> Option<&Attribute<E>> {
        self.index.get(name).map(|&i| &self.attributes[i])
    }

    pub fn identity_name(&self) -> &'static str {
        self.identity
    }

    pub fn identity(&self) -> &Attribute<E> {
        self.lookup(self.identity).unwrap_or_else(|| {
            panic!(
                "identity attribute '{}' of '{}' is not registered",
                self.identity, self.table.name
            )
        })
    }

    pub fn identity_of(&self, record: &E) -> Value {
        self.identity().get(record)
    }

    /// Value of a registered attribute, `Null` for unknown names.
    pub fn value_of(&self, record: &E, name: &str) -> Value {
        self.lookup(name).map(|a| a.get(record)).unwrap_or(Value::Null)
    }

    pub fn search_fields(&self) -> &'static [&'static str] {
        self.search_fields
    }

    pub fn relations(&self) -> &[Relation<E>] {
        &self.relations
    }

    pub fn relation_named(&self, name: &str) -> Option<&Relation<E>> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Every registered attribute as a row.
    pub fn to_row(&self, record: &E) -> Row {
        self.attributes
            .iter()
            .map(|a| (a.name(), a.get(record)))
            .collect()
    }

    /// Copy the row's columns onto an existing record, leaving relations alone.
    pub fn apply_row(&self, record: &mut E, row: Row) -> Result<(), StoreError> {
        for (name, value) in row {
            if let Some(attribute) = self.lookup(name) {
                attribute
                    .set(record, value)
                    .map_err(|source| StoreError::Decode {
                        column: format!("{}.{}", self.table.name, name),
                        source,
                    })?;
            }
        }
        Ok(())
    }

    pub fn from_row(&self, row: Row) -> Result<E, StoreError>
    where
        E: Default,
    {
        let mut record = E::default();
        self.apply_row(&mut record, row)?;
        Ok(record)
    }
}

fn check_relation_columns(kind: &RelationKind) {
    match kind {
        RelationKind::BelongsTo {
            target, target_key, ..
        } => {
            target.expect_column(target_key);
        }
        RelationKind::HasMany {
            target,
            foreign_key,
            ..
        } => {
            target.expect_column(foreign_key);
        }
        RelationKind::ManyToMany {
            link,
            link_owner,
            link_target,
            target,
            target_key,
            ..
        } => {
            link.expect_column(link_owner);
            link.expect_column(link_target);
            target.expect_column(target_key);
        }
    }
}
