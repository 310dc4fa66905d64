//! Catalog table metadata
//!
//! Must agree with the server's migrations.

use crate::entity::{Column, Dependent, Table};
use crate::value::FieldKind::{Integer, Text, Timestamp};

pub static TRACK: Table = Table {
    name: "track",
    columns: &[
        Column::new("id", Text),
        Column::new("title", Text),
        Column::new("album", Text),
        Column::new("year", Integer),
        Column::new("duration_ms", Integer),
        Column::new("cover_url", Text),
        Column::new("audio_url", Text),
        Column::new("spotify_url", Text),
        Column::new("added_at", Timestamp),
        Column::new("added_by_name", Text),
    ],
    primary_key: &["id"],
    unique: &[],
    dependents: &[
        Dependent {
            table: &TRACK_GENRE,
            foreign_key: "track_id",
            references: "id",
        },
        Dependent {
            table: &TRACK_MOOD,
            foreign_key: "track_id",
            references: "id",
        },
        Dependent {
            table: &REACTIONS,
            foreign_key: "track_id",
            references: "id",
        },
    ],
};

pub static ADDED_BY: Table = Table {
    name: "added_by",
    columns: &[
        Column::new("id", Text),
        Column::new("name", Text),
        Column::new("avatar", Text),
    ],
    primary_key: &["id"],
    unique: &["name"],
    dependents: &[Dependent {
        table: &TRACK,
        foreign_key: "added_by_name",
        references: "name",
    }],
};

pub static GENRE: Table = Table {
    name: "genre",
    columns: &[Column::new("name", Text)],
    primary_key: &["name"],
    unique: &[],
    dependents: &[Dependent {
        table: &TRACK_GENRE,
        foreign_key: "genre_name",
        references: "name",
    }],
};

pub static MOOD: Table = Table {
    name: "mood",
    columns: &[Column::new("name", Text)],
    primary_key: &["name"],
    unique: &[],
    dependents: &[Dependent {
        table: &TRACK_MOOD,
        foreign_key: "mood_name",
        references: "name",
    }],
};

pub static TRACK_GENRE: Table = Table {
    name: "track_genre",
    columns: &[
        Column::new("track_id", Text),
        Column::new("genre_name", Text),
    ],
    primary_key: &["track_id", "genre_name"],
    unique: &[],
    dependents: &[],
};

pub static TRACK_MOOD: Table = Table {
    name: "track_mood",
    columns: &[
        Column::new("track_id", Text),
        Column::new("mood_name", Text),
    ],
    primary_key: &["track_id", "mood_name"],
    unique: &[],
    dependents: &[],
};

pub static REACTIONS: Table = Table {
    name: "reactions",
    columns: &[
        Column::new("id", Text),
        Column::new("track_id", Text),
        Column::new("like_count", Integer),
        Column::new("fire_count", Integer),
        Column::new("heart_count", Integer),
    ],
    primary_key: &["id"],
    unique: &["track_id"],
    dependents: &[],
};

/// Every catalog table, owners before the tables that reference them.
pub static ALL: [&Table; 7] = [
    &ADDED_BY,
    &TRACK,
    &GENRE,
    &MOOD,
    &TRACK_GENRE,
    &TRACK_MOOD,
    &REACTIONS,
];
