//! Track catalog entities
//!
//! Tracks shared by people ([`AddedBy`]), tagged with [`Genre`]s and
//! [`Mood`]s, each with one row of [`Reactions`].

pub mod added_by;
pub mod reactions;
pub mod tables;
pub mod tags;
pub mod track;

pub use added_by::AddedBy;
pub use reactions::Reactions;
pub use tags::{Genre, Mood};
pub use track::Track;

use crate::entity::Entity;

/// Build every catalog registry now.
///
/// Registry construction checks relation metadata and panics on a mistake;
/// calling this at start-up moves that panic out of the first request.
pub fn warm() {
    Track::registry();
    AddedBy::registry();
    Genre::registry();
    Mood::registry();
    Reactions::registry();
}
