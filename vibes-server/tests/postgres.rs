//! Lifecycle checks against a live PostgreSQL.
//!
//! Run with `DATABASE_URL=... cargo test -p vibes-server -- --ignored`.

use std::time::{SystemTime, UNIX_EPOCH};

use vibes_core::store::create_pool;
use vibes_core::{
    AddedBy, Error, Patch, PageQuery, PgStore, Repository, StoreError, Track,
};
use vibes_server::MIGRATOR;

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = create_pool(&url, 2).await.expect("pool creation failed");
    MIGRATOR.run(&pool).await.expect("migrations failed");
    PgStore::new(pool)
}

fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}")
}

#[tokio::test]
#[ignore = "requires database"]
async fn track_lifecycle() {
    let store = store().await;
    let curator = unique("curator");
    let genre = unique("genre");

    Repository::<AddedBy, _>::new(&store)
        .create(AddedBy::new(curator.as_str(), "https://a.example/me.png"))
        .await
        .unwrap();

    let tracks = Repository::<Track, _>::new(&store);
    let created = tracks
        .create(
            Track {
                title: "Teardrop".into(),
                album: "Mezzanine".into(),
                year: 1998,
                duration_ms: 330_000,
                added_by_name: curator.clone(),
                ..Track::default()
            }
            .with_genres([genre.as_str()]),
        )
        .await
        .unwrap();

    let page = tracks
        .fetch_page(&PageQuery::new().filter("added_by_name", curator.as_str()))
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let updated = tracks
        .update(created.id.as_str(), &Patch::new().set("title", "Angel"))
        .await
        .unwrap();
    assert_eq!(updated.title, "Angel");
    assert_eq!(updated.album, "Mezzanine");
    assert_eq!(updated.genres.as_ref().map(Vec::len), Some(1));

    assert!(tracks.delete(created.id.as_str()).await.unwrap());
    assert!(matches!(
        tracks.delete(created.id.as_str()).await,
        Err(Error::NotFound { .. })
    ));
}

#[tokio::test]
#[ignore = "requires database"]
async fn constraint_violations_are_classified() {
    let store = store().await;
    let curator = unique("curator");
    let people = Repository::<AddedBy, _>::new(&store);

    people
        .create(AddedBy::new(curator.as_str(), "https://a.example/me.png"))
        .await
        .unwrap();
    let duplicate = people
        .create(AddedBy::new(curator.as_str(), "https://a.example/other.png"))
        .await
        .unwrap_err();
    assert!(matches!(duplicate, Error::Store(StoreError::Conflict { .. })));

    let dangling = Repository::<Track, _>::new(&store)
        .create(Track {
            title: "Orphan".into(),
            album: "Nowhere".into(),
            year: 2000,
            duration_ms: 1_000,
            added_by_name: unique("missing"),
            ..Track::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(
        dangling,
        Error::Store(StoreError::MissingReference { .. })
    ));
}
