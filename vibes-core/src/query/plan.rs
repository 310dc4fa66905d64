//! Validated query plans
//!
//! [`compile`] checks every caller-supplied name against the entity registry
//! and produces a [`Select`] over static columns. Validation finishes before
//! a store session is opened, so a bad name never executes anything.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use super::{Combine, Direction, FilterSet, PageQuery};
use crate::entity::{Column, Entity, Registry, Table};
use crate::validation::ValidationError;
use crate::value::{FieldKind, Row, Value};

/// A boolean condition over one table's columns
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value` (`IS NULL` for `Value::Null`)
    Eq { column: &'static Column, value: Value },
    /// Case-insensitive substring match on a text column
    Contains { column: &'static Column, needle: String },
    /// `column IN (values)`; empty list is false
    In { column: &'static Column, values: Vec<Value> },
    /// Conjunction; empty is true
    All(Vec<Predicate>),
    /// Disjunction; empty is false
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: &'static Column, value: impl Into<Value>) -> Self {
        Self::Eq {
            column,
            value: value.into(),
        }
    }

    /// Combine predicates, collapsing the single-element case.
    pub fn combine(mut parts: Vec<Predicate>, combine: Combine) -> Option<Predicate> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(match combine {
                Combine::And => Self::All(parts),
                Combine::Or => Self::Any(parts),
            }),
        }
    }

    /// Evaluate against a row.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Eq { column, value } => row.get(column.name).unwrap_or(&Value::Null) == value,
            Self::Contains { column, needle } => row
                .get(column.name)
                .and_then(Value::as_text)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
            Self::In { column, values } => row
                .get(column.name)
                .is_some_and(|value| values.contains(value)),
            Self::All(parts) => parts.iter().all(|p| p.matches(row)),
            Self::Any(parts) => parts.iter().any(|p| p.matches(row)),
        }
    }
}

/// One ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub column: &'static Column,
    pub direction: Direction,
}

impl Order {
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let left = a.get(self.column.name).unwrap_or(&Value::Null);
        let right = b.get(self.column.name).unwrap_or(&Value::Null);
        match self.direction {
            Direction::Ascending => left.cmp(right),
            Direction::Descending => right.cmp(left),
        }
    }
}

/// A select over all columns of one table
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: &'static Table,
    pub filter: Option<Predicate>,
    pub order: Vec<Order>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Select {
    /// Every row of `table`, ordered by primary key.
    pub fn new(table: &'static Table) -> Self {
        let order = table
            .primary_key
            .iter()
            .map(|key| Order {
                column: table.expect_column(key),
                direction: Direction::Ascending,
            })
            .collect();
        Self {
            table,
            filter: None,
            order,
            limit: None,
            offset: 0,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rows whose `column` is one of `values`.
    pub fn any_of(table: &'static Table, column: &'static Column, values: Vec<Value>) -> Self {
        Self::new(table).filter(Predicate::In { column, values })
    }
}

/// Compile a page query for entity `E`.
pub fn compile<E: Entity>(query: &PageQuery) -> Result<Select, ValidationError> {
    let registry = E::registry();
    let mut parts = Vec::new();

    if let Some(filter) = compile_filters(registry, &query.filters, query.combine)? {
        parts.push(filter);
    }
    if let Some(term) = query.search_term() {
        if let Some(search) = compile_search(registry, term)? {
            parts.push(search);
        }
    }

    let mut order = Vec::new();
    if let Some(sort) = &query.sort {
        let attribute = registry
            .lookup(&sort.attribute)
            .ok_or_else(|| ValidationError::UnknownAttribute {
                context: "sort",
                name: sort.attribute.clone(),
            })?;
        order.push(Order {
            column: attribute.column(),
            direction: sort.direction,
        });
    }
    // Identity tiebreak keeps page boundaries deterministic.
    let identity = registry.identity().column();
    if order.iter().all(|o| o.column != identity) {
        order.push(Order {
            column: identity,
            direction: Direction::Ascending,
        });
    }

    Ok(Select {
        table: registry.table(),
        filter: Predicate::combine(parts, Combine::And),
        order,
        limit: Some(query.window.limit()),
        offset: query.window.offset(),
    })
}

/// Equality predicates for `filters`, combined by `combine`.
pub fn compile_filters<E>(
    registry: &Registry<E>,
    filters: &FilterSet,
    combine: Combine,
) -> Result<Option<Predicate>, ValidationError> {
    let parts = filters
        .iter()
        .map(|(name, raw)| {
            let attribute = registry
                .lookup(name)
                .ok_or_else(|| ValidationError::UnknownAttribute {
                    context: "filter",
                    name: name.to_owned(),
                })?;
            Ok(Predicate::Eq {
                column: attribute.column(),
                value: coerce(name, attribute.kind(), raw)?,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;
    Ok(Predicate::combine(parts, combine))
}

/// OR of substring matches over the declared search fields.
fn compile_search<E>(registry: &Registry<E>, term: &str) -> Result<Option<Predicate>, ValidationError> {
    let parts = registry
        .search_fields()
        .iter()
        .map(|field| {
            registry
                .lookup(field)
                .filter(|a| a.kind() == FieldKind::Text)
                .map(|a| Predicate::Contains {
                    column: a.column(),
                    needle: term.to_owned(),
                })
                .ok_or_else(|| ValidationError::SearchField {
                    name: (*field).to_owned(),
                })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;
    Ok(Predicate::combine(parts, Combine::Or))
}

/// Coerce a raw caller value into `kind`, naming the field on failure.
pub fn coerce(field: &str, kind: FieldKind, raw: &JsonValue) -> Result<Value, ValidationError> {
    kind.coerce(raw).ok_or_else(|| ValidationError::InvalidValue {
        field: field.to_owned(),
        expected: kind,
    })
}
