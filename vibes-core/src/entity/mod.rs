//! Entity contract
//!
//! Every queryable record type declares its table, an identity attribute,
//! an allow-list of searchable fields and its relations through a static
//! [`Registry`]. Filter, sort, search and update names are validated against
//! that registry; nothing is looked up by reflection.

pub mod registry;
pub mod schema;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;

pub use registry::{Attribute, Registry, Relation, RelationKind};
pub use schema::{Column, Dependent, Table};

use crate::store::StoreError;
use crate::validation::ValidationError;
use crate::value::{Row, Value};

/// A record type the query builder and lifecycle operations can work with.
pub trait Entity: Default + Clone + Send + Sync + 'static {
    /// Resource name used in not-found messages
    const RESOURCE: &'static str;

    /// The entity's registry, built once.
    fn registry() -> &'static Registry<Self>;

    /// Identity for a record created without one. `None` means the identity is
    /// a natural key the caller must supply.
    fn generate_identity() -> Option<Value> {
        None
    }

    /// Fill creation defaults before the record is inserted.
    fn prepare_create(&mut self) {}

    /// Field rules, checked before any store mutation.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn from_row(row: Row) -> Result<Self, StoreError> {
        Self::registry().from_row(row)
    }

    fn to_row(&self) -> Row {
        Self::registry().to_row(self)
    }

    fn identity(&self) -> Value {
        Self::registry().identity_of(self)
    }
}

/// Serialize a record through its declared attribute set plus loaded relations.
///
/// Entities implement `Serialize` by delegating here, so the wire shape is
/// always the registry's view of the record, never its Rust layout.
pub fn serialize_entity<E: Entity, S: Serializer>(record: &E, serializer: S) -> Result<S::Ok, S::Error> {
    let registry = E::registry();
    let relations: Vec<_> = registry
        .relations()
        .iter()
        .filter_map(|r| r.render(record).map(|value| (r.name(), value)))
        .collect();

    let mut map = serializer.serialize_map(Some(registry.attributes().len() + relations.len()))?;
    for attribute in registry.attributes() {
        map.serialize_entry(attribute.name(), &attribute.get(record))?;
    }
    for (name, value) in &relations {
        map.serialize_entry(name, value)?;
    }
    map.end()
}

/// Decode store rows into records.
pub fn decode_rows<E: Entity>(rows: Vec<Row>) -> Result<Vec<E>, StoreError> {
    rows.into_iter().map(E::from_row).collect()
}

/// JSON for a loaded relation, rendered like envelope data.
pub fn relation_json<T: Serialize + ?Sized>(value: &T) -> JsonValue {
    crate::response::render(value)
}
