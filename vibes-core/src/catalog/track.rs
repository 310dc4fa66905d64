use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::{tables, AddedBy, Genre, Mood, Reactions};
use crate::entity::{decode_rows, relation_json, serialize_entity, Entity, Registry, Relation, RelationKind};
use crate::validation::{self, ValidationError};
use crate::value::Value;

/// A curated track
///
/// Relation fields are `None` until loaded. `added_by` and `reactions` hold
/// `Some(None)` when loaded but absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub album: String,
    pub year: i64,
    pub duration_ms: i64,
    pub cover_url: String,
    pub audio_url: String,
    pub spotify_url: String,
    pub added_at: Option<DateTime<Utc>>,
    pub added_by_name: String,

    pub added_by: Option<Option<AddedBy>>,
    pub genres: Option<Vec<Genre>>,
    pub moods: Option<Vec<Mood>>,
    pub reactions: Option<Option<Reactions>>,
}

pub const TITLE_MAX: usize = 500;
pub const URL_MAX: usize = 1000;
pub const YEAR_MIN: i64 = 1900;
pub const YEAR_MAX: i64 = 2100;

static REGISTRY: Lazy<Registry<Track>> = Lazy::new(|| {
    Registry::<Track>::new(&tables::TRACK)
        .attribute("id", |t| t.id.clone().into(), |t, v| {
            t.id = v.try_into()?;
            Ok(())
        })
        .attribute("title", |t| t.title.clone().into(), |t, v| {
            t.title = v.try_into()?;
            Ok(())
        })
        .attribute("album", |t| t.album.clone().into(), |t, v| {
            t.album = v.try_into()?;
            Ok(())
        })
        .attribute("year", |t| t.year.into(), |t, v| {
            t.year = v.try_into()?;
            Ok(())
        })
        .attribute("duration_ms", |t| t.duration_ms.into(), |t, v| {
            t.duration_ms = v.try_into()?;
            Ok(())
        })
        .attribute("cover_url", |t| t.cover_url.clone().into(), |t, v| {
            t.cover_url = v.try_into()?;
            Ok(())
        })
        .attribute("audio_url", |t| t.audio_url.clone().into(), |t, v| {
            t.audio_url = v.try_into()?;
            Ok(())
        })
        .attribute("spotify_url", |t| t.spotify_url.clone().into(), |t, v| {
            t.spotify_url = v.try_into()?;
            Ok(())
        })
        .attribute("added_at", |t| t.added_at.into(), |t, v| {
            t.added_at = v.try_into()?;
            Ok(())
        })
        .attribute("added_by_name", |t| t.added_by_name.clone().into(), |t, v| {
            t.added_by_name = v.try_into()?;
            Ok(())
        })
        .searchable(&["title"])
        .relation(Relation::<Track>::new(
            "added_by",
            RelationKind::BelongsTo {
                local: "added_by_name",
                target: &tables::ADDED_BY,
                target_key: "name",
            },
            |t, rows| {
                let first = rows.into_iter().next().map(AddedBy::from_row).transpose()?;
                t.added_by = Some(first);
                Ok(())
            },
            |t| t.added_by.as_ref().map(relation_json),
        ))
        .relation(
            Relation::<Track>::new(
                "genres",
                RelationKind::ManyToMany {
                    owner_key: "id",
                    link: &tables::TRACK_GENRE,
                    link_owner: "track_id",
                    link_target: "genre_name",
                    target: &tables::GENRE,
                    target_key: "name",
                },
                |t, rows| {
                    t.genres = Some(decode_rows(rows)?);
                    Ok(())
                },
                |t| t.genres.as_ref().map(relation_json),
            )
            .with_links(|t| {
                t.genres
                    .as_ref()
                    .map(|genres| genres.iter().map(|g| Value::from(g.name.as_str())).collect())
            }),
        )
        .relation(
            Relation::<Track>::new(
                "moods",
                RelationKind::ManyToMany {
                    owner_key: "id",
                    link: &tables::TRACK_MOOD,
                    link_owner: "track_id",
                    link_target: "mood_name",
                    target: &tables::MOOD,
                    target_key: "name",
                },
                |t, rows| {
                    t.moods = Some(decode_rows(rows)?);
                    Ok(())
                },
                |t| t.moods.as_ref().map(relation_json),
            )
            .with_links(|t| {
                t.moods
                    .as_ref()
                    .map(|moods| moods.iter().map(|m| Value::from(m.name.as_str())).collect())
            }),
        )
        .relation(Relation::<Track>::new(
            "reactions",
            RelationKind::HasMany {
                owner_key: "id",
                target: &tables::REACTIONS,
                foreign_key: "track_id",
            },
            |t, rows| {
                let first = rows.into_iter().next().map(Reactions::from_row).transpose()?;
                t.reactions = Some(first);
                Ok(())
            },
            |t| t.reactions.as_ref().map(relation_json),
        ))
});

impl Track {
    /// Set the genre names linked on create or update.
    pub fn with_genres<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = Some(names.into_iter().map(Genre::new).collect());
        self
    }

    pub fn with_moods<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moods = Some(names.into_iter().map(Mood::new).collect());
        self
    }
}

impl Entity for Track {
    const RESOURCE: &'static str = "track";

    fn registry() -> &'static Registry<Self> {
        &REGISTRY
    }

    fn generate_identity() -> Option<Value> {
        Some(Uuid::new_v4().to_string().into())
    }

    fn prepare_create(&mut self) {
        if self.added_at.is_none() {
            self.added_at = Some(Utc::now());
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validation::text("title", &self.title, TITLE_MAX)?;
        validation::text("album", &self.album, TITLE_MAX)?;
        validation::range("year", self.year, YEAR_MIN, YEAR_MAX)?;
        validation::range("duration_ms", self.duration_ms, 1, i64::MAX)?;
        validation::max_length("cover_url", &self.cover_url, URL_MAX)?;
        validation::max_length("audio_url", &self.audio_url, URL_MAX)?;
        validation::max_length("spotify_url", &self.spotify_url, URL_MAX)?;
        validation::text("added_by_name", &self.added_by_name, super::added_by::NAME_MAX)?;
        for genre in self.genres.iter().flatten() {
            genre.validate()?;
        }
        for mood in self.moods.iter().flatten() {
            mood.validate()?;
        }
        Ok(())
    }
}

impl Serialize for Track {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entity(self, serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Track {
        Track {
            title: "Midnight City".into(),
            album: "Hurry Up, We're Dreaming".into(),
            year: 2011,
            duration_ms: 243_000,
            cover_url: "https://i.scdn.co/image/abc".into(),
            audio_url: "https://p.scdn.co/mp3-preview/abc".into(),
            spotify_url: "https://open.spotify.com/track/abc".into(),
            added_by_name: "ada".into(),
            ..Track::default()
        }
    }

    #[test]
    fn field_rules() {
        assert!(sample().validate().is_ok());

        let track = Track {
            year: 1899,
            ..sample()
        };
        assert_eq!(track.validate().unwrap_err().field(), "year");

        let track = Track {
            duration_ms: 0,
            ..sample()
        };
        assert_eq!(track.validate().unwrap_err().field(), "duration_ms");

        let track = Track {
            title: "x".repeat(501),
            ..sample()
        };
        assert!(matches!(
            track.validate(),
            Err(ValidationError::TooLong { field: "title", max: 500 })
        ));

        let track = sample().with_genres([""]);
        assert_eq!(track.validate().unwrap_err().field(), "name");
    }

    #[test]
    fn serializes_attributes_and_loaded_relations_only() {
        let track = Track {
            id: "t1".into(),
            ..sample()
        }
        .with_genres(["synthpop"]);
        let value = serde_json::to_value(&track).unwrap();

        assert_eq!(value["title"], json!("Midnight City"));
        assert_eq!(value["added_at"], json!(null));
        assert_eq!(value["genres"], json!([{"name": "synthpop"}]));
        assert!(value.get("moods").is_none());
        assert!(value.get("reactions").is_none());
    }

    #[test]
    fn loaded_but_absent_relation_renders_null() {
        let track = Track {
            reactions: Some(None),
            ..sample()
        };
        let value = serde_json::to_value(&track).unwrap();
        assert_eq!(value["reactions"], json!(null));
    }

    #[test]
    fn prepare_create_stamps_added_at() {
        let mut track = sample();
        track.prepare_create();
        assert!(track.added_at.is_some());
    }

    #[test]
    fn row_round_trip_leaves_relations_unloaded() {
        let track = Track {
            id: "t1".into(),
            added_at: Some(Utc::now()),
            ..sample()
        }
        .with_moods(["chill"]);
        let restored = Track::from_row(track.to_row()).unwrap();
        assert_eq!(restored.title, track.title);
        assert_eq!(restored.added_at, track.added_at);
        assert_eq!(restored.moods, None);
    }
}
