use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::{tables, Track};
use crate::entity::{decode_rows, relation_json, serialize_entity, Entity, Registry, Relation, RelationKind};
use crate::validation::{self, ValidationError};
use crate::value::Value;

pub const NAME_MAX: usize = 255;
pub const AVATAR_MAX: usize = 500;

/// The person who shared a track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddedBy {
    pub id: String,
    pub name: String,
    pub avatar: String,

    pub tracks: Option<Vec<Track>>,
}

impl AddedBy {
    pub fn new(name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar: avatar.into(),
            ..Self::default()
        }
    }
}

static REGISTRY: Lazy<Registry<AddedBy>> = Lazy::new(|| {
    Registry::<AddedBy>::new(&tables::ADDED_BY)
        .attribute("id", |a| a.id.clone().into(), |a, v| {
            a.id = v.try_into()?;
            Ok(())
        })
        .attribute("name", |a| a.name.clone().into(), |a, v| {
            a.name = v.try_into()?;
            Ok(())
        })
        .attribute("avatar", |a| a.avatar.clone().into(), |a, v| {
            a.avatar = v.try_into()?;
            Ok(())
        })
        .searchable(&["name"])
        .relation(Relation::<AddedBy>::new(
            "tracks",
            RelationKind::HasMany {
                owner_key: "name",
                target: &tables::TRACK,
                foreign_key: "added_by_name",
            },
            |a, rows| {
                a.tracks = Some(decode_rows(rows)?);
                Ok(())
            },
            |a| a.tracks.as_ref().map(relation_json),
        ))
});

impl Entity for AddedBy {
    const RESOURCE: &'static str = "added_by";

    fn registry() -> &'static Registry<Self> {
        &REGISTRY
    }

    fn generate_identity() -> Option<Value> {
        Some(Uuid::new_v4().to_string().into())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validation::text("name", &self.name, NAME_MAX)?;
        validation::max_length("avatar", &self.avatar, AVATAR_MAX)
    }
}

impl Serialize for AddedBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entity(self, serializer)
    }
}
