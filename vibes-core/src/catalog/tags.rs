//! Genres and moods: name-keyed tags linked to tracks

use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};

use super::{tables, Track};
use crate::entity::{decode_rows, relation_json, serialize_entity, Entity, Registry, Relation, RelationKind};
use crate::validation::{self, ValidationError};

pub const TAG_NAME_MAX: usize = 100;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Genre {
    pub name: String,
    pub tracks: Option<Vec<Track>>,
}

impl Genre {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: None,
        }
    }
}

static GENRE_REGISTRY: Lazy<Registry<Genre>> = Lazy::new(|| {
    Registry::<Genre>::new(&tables::GENRE)
        .attribute("name", |g| g.name.clone().into(), |g, v| {
            g.name = v.try_into()?;
            Ok(())
        })
        .searchable(&["name"])
        .relation(Relation::<Genre>::new(
            "tracks",
            RelationKind::ManyToMany {
                owner_key: "name",
                link: &tables::TRACK_GENRE,
                link_owner: "genre_name",
                link_target: "track_id",
                target: &tables::TRACK,
                target_key: "id",
            },
            |g, rows| {
                g.tracks = Some(decode_rows(rows)?);
                Ok(())
            },
            |g| g.tracks.as_ref().map(relation_json),
        ))
});

impl Entity for Genre {
    const RESOURCE: &'static str = "genre";

    fn registry() -> &'static Registry<Self> {
        &GENRE_REGISTRY
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validation::text("name", &self.name, TAG_NAME_MAX)
    }
}

impl Serialize for Genre {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entity(self, serializer)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mood {
    pub name: String,
    pub tracks: Option<Vec<Track>>,
}

impl Mood {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: None,
        }
    }
}

static MOOD_REGISTRY: Lazy<Registry<Mood>> = Lazy::new(|| {
    Registry::<Mood>::new(&tables::MOOD)
        .attribute("name", |m| m.name.clone().into(), |m, v| {
            m.name = v.try_into()?;
            Ok(())
        })
        .searchable(&["name"])
        .relation(Relation::<Mood>::new(
            "tracks",
            RelationKind::ManyToMany {
                owner_key: "name",
                link: &tables::TRACK_MOOD,
                link_owner: "mood_name",
                link_target: "track_id",
                target: &tables::TRACK,
                target_key: "id",
            },
            |m, rows| {
                m.tracks = Some(decode_rows(rows)?);
                Ok(())
            },
            |m| m.tracks.as_ref().map(relation_json),
        ))
});

impl Entity for Mood {
    const RESOURCE: &'static str = "mood";

    fn registry() -> &'static Registry<Self> {
        &MOOD_REGISTRY
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validation::text("name", &self.name, TAG_NAME_MAX)
    }
}

impl Serialize for Mood {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entity(self, serializer)
    }
}
