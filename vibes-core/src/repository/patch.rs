//! Partial updates

use serde_json::{Map, Value as JsonValue};

use crate::entity::{Attribute, Entity, Relation, RelationKind};
use crate::query::plan::coerce;
use crate::validation::ValidationError;
use crate::value::Value;

/// Explicitly supplied attribute values and relation key sets
///
/// Attributes not named in the patch are left untouched. A relation key set
/// replaces the record's association links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    values: Vec<(String, JsonValue)>,
    links: Vec<(String, Vec<JsonValue>)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    pub fn link<V: Into<JsonValue>>(mut self, relation: impl Into<String>, keys: impl IntoIterator<Item = V>) -> Self {
        self.links
            .push((relation.into(), keys.into_iter().map(Into::into).collect()));
        self
    }

    /// Arrays become relation key sets, everything else an attribute value.
    pub fn from_object(object: Map<String, JsonValue>) -> Self {
        object
            .into_iter()
            .fold(Self::new(), |patch, (name, value)| match value {
                JsonValue::Array(keys) => patch.link(name, keys),
                value => patch.set(name, value),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.links.is_empty()
    }

    /// Check every name and value against `E`'s registry.
    pub(crate) fn resolve<E: Entity>(&self) -> Result<Resolved<E>, ValidationError> {
        let registry = E::registry();

        let mut changes = Vec::with_capacity(self.values.len());
        for (name, raw) in &self.values {
            let attribute = registry
                .lookup(name)
                .ok_or_else(|| ValidationError::UnknownAttribute {
                    context: "update",
                    name: name.clone(),
                })?;
            let referenced = registry
                .table()
                .dependents
                .iter()
                .any(|dependent| dependent.references == attribute.column().name);
            if attribute.name() == registry.identity_name() || referenced {
                return Err(ValidationError::Immutable {
                    field: name.clone(),
                });
            }
            changes.push((attribute, coerce(name, attribute.kind(), raw)?));
        }

        let mut links = Vec::with_capacity(self.links.len());
        for (name, keys) in &self.links {
            let (relation, kind) = registry
                .relation_named(name)
                .and_then(|r| match *r.kind() {
                    RelationKind::ManyToMany {
                        target, target_key, ..
                    } => Some((r, target.expect_column(target_key).kind)),
                    _ => None,
                })
                .ok_or_else(|| ValidationError::UnknownAttribute {
                    context: "relation",
                    name: name.clone(),
                })?;
            let keys = keys
                .iter()
                .map(|raw| coerce(name, kind, raw))
                .collect::<Result<Vec<_>, _>>()?;
            links.push((relation, keys));
        }

        Ok(Resolved { changes, links })
    }
}

/// A patch checked against an entity's registry
pub(crate) struct Resolved<E: 'static> {
    pub changes: Vec<(&'static Attribute<E>, Value)>,
    pub links: Vec<(&'static Relation<E>, Vec<Value>)>,
}
