use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::tables;
use crate::entity::{serialize_entity, Entity, Registry};
use crate::validation::{self, ValidationError};
use crate::value::Value;

/// Reaction counters for one track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reactions {
    pub id: String,
    pub track_id: String,
    pub like_count: i64,
    pub fire_count: i64,
    pub heart_count: i64,
}

impl Reactions {
    pub fn for_track(track_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            ..Self::default()
        }
    }
}

static REGISTRY: Lazy<Registry<Reactions>> = Lazy::new(|| {
    Registry::<Reactions>::new(&tables::REACTIONS)
        .attribute("id", |r| r.id.clone().into(), |r, v| {
            r.id = v.try_into()?;
            Ok(())
        })
        .attribute("track_id", |r| r.track_id.clone().into(), |r, v| {
            r.track_id = v.try_into()?;
            Ok(())
        })
        .attribute("like_count", |r| r.like_count.into(), |r, v| {
            r.like_count = v.try_into()?;
            Ok(())
        })
        .attribute("fire_count", |r| r.fire_count.into(), |r, v| {
            r.fire_count = v.try_into()?;
            Ok(())
        })
        .attribute("heart_count", |r| r.heart_count.into(), |r, v| {
            r.heart_count = v.try_into()?;
            Ok(())
        })
});

impl Entity for Reactions {
    const RESOURCE: &'static str = "reactions";

    fn registry() -> &'static Registry<Self> {
        &REGISTRY
    }

    fn generate_identity() -> Option<Value> {
        Some(Uuid::new_v4().to_string().into())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validation::required("track_id", &self.track_id)?;
        validation::range("like_count", self.like_count, 0, i64::MAX)?;
        validation::range("fire_count", self.fire_count, 0, i64::MAX)?;
        validation::range("heart_count", self.heart_count, 0, i64::MAX)
    }
}

impl Serialize for Reactions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entity(self, serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_cannot_go_negative() {
        assert!(Reactions::for_track("t1").validate().is_ok());
        let reactions = Reactions {
            fire_count: -1,
            ..Reactions::for_track("t1")
        };
        assert_eq!(reactions.validate().unwrap_err().field(), "fire_count");
    }

    #[test]
    fn search_is_not_declared() {
        assert!(Reactions::registry().search_fields().is_empty());
    }
}
