use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::{Query, State};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use vibes_core::store::memory::MemorySession;
use vibes_core::{
    respond, throw, AddedBy, FilterSet, MemoryStore, Outcome, PageParams, Reply, Repository,
    Store, StoreError, Track,
};
use vibes_server::{build_router, with_boundary, AppState, Settings};

fn settings() -> Settings {
    Settings::try_parse_from(["vibes", "--memory", "--app-name", "HNG Vibes API"]).unwrap()
}

async fn send(app: Router, uri: &str) -> (StatusCode, JsonValue) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[derive(Clone)]
struct Offline;

#[async_trait]
impl Store for Offline {
    type Session = MemorySession;

    async fn begin(&self) -> Result<MemorySession, StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolClosed))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolClosed))
    }
}

#[tokio::test]
async fn root_welcomes_by_name() {
    let app = build_router(AppState::new(MemoryStore::new(), settings()));
    let (status, body) = send(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"message": "Welcome to HNG Vibes API", "data": {}})
    );
}

#[tokio::test]
async fn health_reports_store_status() {
    let app = build_router(AppState::new(MemoryStore::new(), settings()));
    let (status, body) = send(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"message": "Success", "data": {"api_status": "healthy", "db_status": "healthy"}})
    );

    let app = build_router(AppState::new(Offline, settings()));
    let (status, body) = send(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["api_status"], "healthy");
    assert_eq!(body["data"]["db_status"], "unhealthy");
}

#[tokio::test]
async fn unknown_route_is_a_404_envelope() {
    let app = build_router(AppState::new(MemoryStore::new(), settings()));
    let (status, body) = send(app, "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "route '/nope' not found", "data": {}}));
}

#[tokio::test]
async fn panic_detail_never_reaches_the_caller() {
    async fn boom() -> Reply {
        panic!("connection string postgres://secret@db leaked");
    }

    let state = AppState::new(MemoryStore::new(), settings());
    let app = with_boundary(Router::new().route("/boom", get(boom)), &state.settings)
        .with_state(state);
    let (status, body) = send(app, "/boom").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error", "data": {}}));
}

#[tokio::test]
async fn abort_and_store_failures_map_to_envelopes() {
    async fn forbidden() -> vibes_core::Result<Reply> {
        throw(StatusCode::FORBIDDEN, "curators only")
    }

    async fn offline(State(state): State<AppState<Offline>>) -> vibes_core::Result<Reply> {
        let track = Repository::<Track, _>::new(&state.store).get("t1").await?;
        Ok(respond(StatusCode::OK, Outcome::default(), &track))
    }

    let state = AppState::new(Offline, settings());
    let app = with_boundary(
        Router::new()
            .route("/forbidden", get(forbidden))
            .route("/offline", get(offline)),
        &state.settings,
    )
    .with_state(state);

    let (status, body) = send(app.clone(), "/forbidden").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": "curators only", "data": {}}));

    let (status, body) = send(app, "/offline").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(!body.to_string().contains("pool"));
}

#[tokio::test]
async fn page_params_from_query_string() {
    async fn tracks(
        State(state): State<AppState<MemoryStore>>,
        Query(params): Query<PageParams>,
    ) -> vibes_core::Result<Reply> {
        let query = params.into_query(FilterSet::new())?;
        let page = Repository::<Track, _>::new(&state.store)
            .fetch_page(&query)
            .await?;
        let titles: Vec<&str> = page.records.iter().map(|t| t.title.as_str()).collect();
        Ok(respond(
            StatusCode::OK,
            Outcome::default(),
            &json!({"total": page.total, "titles": titles}),
        ))
    }

    let store = MemoryStore::new();
    Repository::<AddedBy, _>::new(&store)
        .create(AddedBy::new("ada", "https://a.example/ada.png"))
        .await
        .unwrap();
    let repo = Repository::<Track, _>::new(&store);
    for (title, year) in [("Alpha", 2001), ("Beta", 2002), ("Gamma", 2003)] {
        repo.create(Track {
            title: title.into(),
            album: "Album".into(),
            year,
            duration_ms: 1_000,
            added_by_name: "ada".into(),
            ..Track::default()
        })
        .await
        .unwrap();
    }

    let state = AppState::new(store, settings());
    let app = with_boundary(Router::new().route("/tracks", get(tracks)), &state.settings)
        .with_state(state);

    let (status, body) = send(app.clone(), "/tracks?page=1&size=2&sort_by=year&descending=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"total": 3, "titles": ["Gamma", "Beta"]}));

    let (status, body) = send(app.clone(), "/tracks?sort_by=colour").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"], json!({}));
    assert!(body["error"].as_str().unwrap().contains("colour"));

    let (status, _) = send(app, "/tracks?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
