/// HTTP API tests
///
/// Drives the router in-process with fake upstream collaborators.
/// Run with: cargo test --test http_api_tests

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use travelog::proxy::{
    FetchedImage, ImageFetcher, ImageImporter, ImageResult, ImageSearch, Place, PlaceQuery,
    PlaceSearch,
};
use travelog::storage::StorageOp;
use travelog::web::{AppState, IDENTITY_HEADER, router};
use travelog::{
    ImageSetReconciler, InMemoryEntryStore, InMemoryStorage, JournalError, JournalService,
    KeyGenerator, ReferenceResolver, Result,
};

const BUCKET: &str = "travel-media";
const ALICE: &str = "us-east-1:alice";

#[derive(Default)]
struct FakeImageSearch {
    queries: Mutex<Vec<String>>,
    failure: Option<JournalError>,
}

#[async_trait]
impl ImageSearch for FakeImageSearch {
    async fn search(&self, location: &str) -> Result<Vec<ImageResult>> {
        self.queries.lock().unwrap().push(location.to_string());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(vec![ImageResult {
            url: format!("https://img.example.com/{location}.jpg"),
            thumbnail_url: format!("https://img.example.com/{location}-thumb.jpg"),
            source: "https://example.com/article".to_string(),
        }])
    }
}

#[derive(Default)]
struct FakePlaceSearch {
    queries: Mutex<Vec<PlaceQuery>>,
    failure: Option<JournalError>,
}

#[async_trait]
impl PlaceSearch for FakePlaceSearch {
    fn ensure_configured(&self) -> Result<()> {
        match &self.failure {
            Some(err @ JournalError::Configuration(_)) => Err(err.clone()),
            _ => Ok(()),
        }
    }

    async fn search(&self, query: &PlaceQuery) -> Result<Vec<Place>> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(vec![Place {
            place_id: Some("place-1".to_string()),
            name: "Eiffel Tower".to_string(),
            address: "Paris, Île-de-France".to_string(),
            coordinates: [2.2945, 48.8584],
        }])
    }
}

struct FakeFetcher {
    failure: Option<JournalError>,
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchedImage> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(FetchedImage {
            bytes: vec![0xFF, 0xD8, 0xFF],
            content_type: Some("image/jpeg".to_string()),
        })
    }
}

struct TestApp {
    app: Router,
    storage: Arc<InMemoryStorage>,
    images: Arc<FakeImageSearch>,
    places: Arc<FakePlaceSearch>,
}

fn build(images: FakeImageSearch, places: FakePlaceSearch, fetcher: FakeFetcher) -> TestApp {
    let storage = Arc::new(InMemoryStorage::new(BUCKET));
    let reconciler = ImageSetReconciler::new(storage.clone(), Arc::new(KeyGenerator::new()));
    let journal = JournalService::new(
        Arc::new(InMemoryEntryStore::new()),
        ReferenceResolver::new(storage.clone()),
        reconciler.clone(),
        Some(BUCKET.to_string()),
    );
    let images = Arc::new(images);
    let places = Arc::new(places);
    let state = AppState {
        journal: Arc::new(journal),
        images: images.clone(),
        places: places.clone(),
        importer: Arc::new(ImageImporter::new(
            Arc::new(fetcher),
            reconciler,
            Some(BUCKET.to_string()),
        )),
    };
    TestApp {
        app: router(state, 1024 * 1024),
        storage,
        images,
        places,
    }
}

fn test_app() -> TestApp {
    build(
        FakeImageSearch::default(),
        FakePlaceSearch::default(),
        FakeFetcher { failure: None },
    )
}

fn get(uri: &str, identity: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(identity) = identity {
        builder = builder.header(IDENTITY_HEADER, identity);
    }
    builder.body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, identity: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(identity) = identity {
        builder = builder.header(IDENTITY_HEADER, identity);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn encoded(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[tokio::test]
async fn test_image_search_requires_location() {
    let t = test_app();

    let (status, body) = send(&t.app, get("/images", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing \"location\" query parameter.");
    assert_eq!(body["code"], "input_error");
    assert!(t.images.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_image_search_returns_reshaped_results() {
    let t = test_app();

    let (status, body) = send(&t.app, get("/images?location=Kyoto", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["images"][0]["url"], "https://img.example.com/Kyoto.jpg");
    assert_eq!(body["images"][0]["thumbnailUrl"], "https://img.example.com/Kyoto-thumb.jpg");
    assert_eq!(*t.images.queries.lock().unwrap(), vec!["Kyoto".to_string()]);
}

#[tokio::test]
async fn test_image_search_reports_missing_credentials() {
    let t = build(
        FakeImageSearch {
            failure: Some(JournalError::Configuration(
                "API keys are not configured on the server.".to_string(),
            )),
            ..Default::default()
        },
        FakePlaceSearch::default(),
        FakeFetcher { failure: None },
    );

    let (status, body) = send(&t.app, get("/images?location=Kyoto", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "configuration_error");
    assert_eq!(body["error"], "API keys are not configured on the server.");
}

#[tokio::test]
async fn test_image_search_hides_upstream_detail() {
    let t = build(
        FakeImageSearch {
            failure: Some(JournalError::Upstream("quota exceeded for key abc".to_string())),
            ..Default::default()
        },
        FakePlaceSearch::default(),
        FakeFetcher { failure: None },
    );

    let (status, body) = send(&t.app, get("/images?location=Kyoto", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to fetch images.");
}

#[tokio::test]
async fn test_save_image_checks_body_before_identity() {
    let t = test_app();

    let (status, body) = send(&t.app, with_json("POST", "/save-image", None, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing \"imageUrl\" in request body.");

    // no body and no content type at all
    let empty = Request::builder()
        .method("POST")
        .uri("/save-image")
        .header(IDENTITY_HEADER, ALICE)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&t.app, empty).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing \"imageUrl\" in request body.");

    let (status, body) = send(
        &t.app,
        with_json(
            "POST",
            "/save-image",
            None,
            json!({ "imageUrl": "https://img.example.com/a.jpg" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User is not authenticated.");
    assert_eq!(t.storage.object_count().await, 0);
}

#[tokio::test]
async fn test_save_image_stores_copy_in_owner_scope() {
    let t = test_app();

    let (status, body) = send(
        &t.app,
        with_json(
            "POST",
            "/save-image",
            Some(ALICE),
            json!({ "imageUrl": "https://img.example.com/a.jpg" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Image saved successfully!");
    let url = body["newS3Url"].as_str().unwrap();
    let prefix = format!("https://{BUCKET}.s3.amazonaws.com/private/{ALICE}/");
    assert!(url.starts_with(&prefix), "unexpected reference {}", url);
    assert!(url.ends_with("-google-image.jpg"));
    assert_eq!(t.storage.calls_for(StorageOp::Upload).await.len(), 1);
}

#[tokio::test]
async fn test_save_image_download_failure() {
    let t = build(
        FakeImageSearch::default(),
        FakePlaceSearch::default(),
        FakeFetcher {
            failure: Some(JournalError::Download("status 404".to_string())),
        },
    );

    let (status, body) = send(
        &t.app,
        with_json(
            "POST",
            "/save-image",
            Some(ALICE),
            json!({ "imageUrl": "https://img.example.com/gone.jpg" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to save image.");
    assert_eq!(t.storage.object_count().await, 0);
}

#[tokio::test]
async fn test_place_search_parameters() {
    let t = test_app();

    let (status, body) = send(&t.app, get("/search", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing \"query\" or \"lat/lon\" parameters.");

    let (status, _) = send(&t.app, get("/search?lat=48.85", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&t.app, get("/search?lat=north&lon=2.29", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(t.places.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_place_search_by_text_and_position() {
    let t = test_app();

    let (status, body) = send(&t.app, get("/search?query=Eiffel%20Tower", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["places"][0]["name"], "Eiffel Tower");
    assert_eq!(body["places"][0]["placeId"], "place-1");

    let (status, _) = send(&t.app, get("/search?lat=48.8584&lon=2.2945", None)).await;
    assert_eq!(status, StatusCode::OK);

    let queries = t.places.queries.lock().unwrap().clone();
    assert_eq!(
        queries,
        vec![
            PlaceQuery::Text("Eiffel Tower".to_string()),
            PlaceQuery::Position {
                lat: 48.8584,
                lon: 2.2945
            },
        ]
    );
}

#[tokio::test]
async fn test_place_search_missing_index() {
    let t = build(
        FakeImageSearch::default(),
        FakePlaceSearch {
            failure: Some(JournalError::Configuration(
                "Place index is not configured on the server.".to_string(),
            )),
            ..Default::default()
        },
        FakeFetcher { failure: None },
    );

    let (status, body) = send(&t.app, get("/search?query=Rome", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "configuration_error");
    assert_eq!(body["error"], "Place index is not configured on the server.");

    // configuration is checked before the parameters
    let (status, body) = send(&t.app, get("/search", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "configuration_error");
    assert!(t.places.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_log_endpoints_require_identity() {
    let t = test_app();

    let (status, body) = send(&t.app, get("/logs", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");

    let (status, _) = send(&t.app, get("/logs", Some("bad/owner"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_log_lifecycle_over_http() {
    let t = test_app();

    let (status, created) = send(
        &t.app,
        with_json(
            "POST",
            "/logs",
            Some(ALICE),
            json!({
                "location": "Lisbon",
                "whatYouDidThere": "Rode tram 28",
                "funLevel": 4,
                "weather": ["sunny"],
                "newImages": [
                    { "filename": "tram.jpg", "data": encoded(b"tram") },
                    { "filename": "view.png", "contentType": "image/png", "data": encoded(b"view") }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    let image_urls = created["imageUrls"].as_array().unwrap().clone();
    assert_eq!(image_urls.len(), 2);
    assert_eq!(created["funLevel"], 4);

    let (status, listed) = send(&t.app, get("/logs", Some(ALICE))).await;
    assert_eq!(status, StatusCode::OK);
    let logs = listed["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["gallery"][0]["permanentReference"], image_urls[0]);
    assert!(logs[0]["gallery"][1]["ephemeralReference"]["url"].is_string());

    let (status, updated) = send(
        &t.app,
        with_json(
            "PUT",
            &format!("/logs/{id}"),
            Some(ALICE),
            json!({
                "location": "Lisbon",
                "funLevel": 5,
                "existingImageUrls": [image_urls[1].clone()],
                "newImages": [{ "filename": "beach.jpg", "data": encoded(b"beach") }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_urls = updated["imageUrls"].as_array().unwrap();
    assert_eq!(new_urls.len(), 2);
    assert_eq!(new_urls[0], image_urls[1]);
    assert!(new_urls[1].as_str().unwrap().ends_with("-beach.jpg"));
    assert_eq!(t.storage.calls_for(StorageOp::Delete).await.len(), 1);

    let (status, view) = send(&t.app, get(&format!("/logs/{id}"), Some(ALICE))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["gallery"].as_array().unwrap().len(), 2);

    let (status, _) = send(&t.app, get(&format!("/logs/{id}"), Some("us-east-1:bob"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/logs/{id}"))
        .header(IDENTITY_HEADER, ALICE)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&t.app, get(&format!("/logs/{id}"), Some(ALICE))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_requires_explicit_image_list() {
    let t = test_app();
    let (_, created) = send(
        &t.app,
        with_json("POST", "/logs", Some(ALICE), json!({ "location": "Porto" })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(
        &t.app,
        with_json("PUT", &format!("/logs/{id}"), Some(ALICE), json!({ "location": "Porto" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "input_error");
    assert!(body["error"].as_str().unwrap().contains("existingImageUrls"));
}

#[tokio::test]
async fn test_unreadable_json_bodies_are_json_errors() {
    let t = test_app();

    let broken = Request::builder()
        .method("POST")
        .uri("/profile")
        .header("content-type", "application/json")
        .header(IDENTITY_HEADER, ALICE)
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = send(&t.app, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "input_error");

    let untyped = Request::builder()
        .method("POST")
        .uri("/logs")
        .header(IDENTITY_HEADER, ALICE)
        .body(Body::from(json!({ "location": "Oporto" }).to_string()))
        .unwrap();
    let (status, body) = send(&t.app, untyped).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "input_error");
}

#[tokio::test]
async fn test_saved_image_can_be_attached_to_a_log() {
    let t = test_app();
    let (_, created) = send(
        &t.app,
        with_json("POST", "/logs", Some(ALICE), json!({ "location": "Hoi An" })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, saved) = send(
        &t.app,
        with_json(
            "POST",
            "/save-image",
            Some(ALICE),
            json!({ "imageUrl": "https://img.example.com/lanterns.jpg" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let saved_url = saved["newS3Url"].clone();

    let (status, updated) = send(
        &t.app,
        with_json(
            "PUT",
            &format!("/logs/{id}"),
            Some(ALICE),
            json!({
                "location": "Hoi An",
                "existingImageUrls": [],
                "importedImageUrls": [saved_url.clone()]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["imageUrls"], json!([saved_url.clone()]));

    let (status, view) = send(&t.app, get(&format!("/logs/{id}"), Some(ALICE))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["gallery"][0]["permanentReference"], saved_url);
    assert!(view["gallery"][0]["ephemeralReference"]["url"].is_string());

    // bob cannot attach alice's copy
    let (_, bobs) = send(
        &t.app,
        with_json("POST", "/logs", Some("us-east-1:bob"), json!({ "location": "Hue" })),
    )
    .await;
    let (status, body) = send(
        &t.app,
        with_json(
            "PUT",
            &format!("/logs/{}", bobs["id"].as_str().unwrap()),
            Some("us-east-1:bob"),
            json!({
                "location": "Hue",
                "existingImageUrls": [],
                "importedImageUrls": [saved_url]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "input_error");
}

#[tokio::test]
async fn test_update_with_foreign_reference_is_rejected() {
    let t = test_app();
    let (_, created) = send(
        &t.app,
        with_json("POST", "/logs", Some(ALICE), json!({ "location": "Porto" })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(
        &t.app,
        with_json(
            "PUT",
            &format!("/logs/{id}"),
            Some(ALICE),
            json!({
                "location": "Porto",
                "existingImageUrls": [format!("https://{BUCKET}.s3.amazonaws.com/private/us-east-1:bob/1-x.jpg")]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "input_error");
    assert!(t.storage.calls().await.is_empty());
}

#[tokio::test]
async fn test_invalid_base64_is_rejected() {
    let t = test_app();

    let (status, _) = send(
        &t.app,
        with_json(
            "POST",
            "/logs",
            Some(ALICE),
            json!({
                "location": "Nice",
                "newImages": [{ "filename": "x.jpg", "data": "***not base64***" }]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.storage.object_count().await, 0);
}

#[tokio::test]
async fn test_resolve_endpoint_is_owner_scoped() {
    let t = test_app();
    let mine = format!("private/{ALICE}/1-mine.jpg");
    let theirs = "private/us-east-1:bob/1-theirs.jpg";
    t.storage.put_object(mine.clone(), vec![1u8]).await;
    t.storage.put_object(theirs, vec![2u8]).await;

    let (status, body) = send(
        &t.app,
        with_json(
            "POST",
            "/resolve",
            Some(ALICE),
            json!({
                "references": [
                    format!("https://{BUCKET}.s3.amazonaws.com/{mine}"),
                    format!("https://{BUCKET}.s3.amazonaws.com/{theirs}"),
                    "not-a-reference"
                ]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let pairs = body["pairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 3);
    assert!(pairs[0]["ephemeralReference"]["url"].is_string());
    assert!(pairs[1]["ephemeralReference"].is_null());
    assert!(pairs[2]["ephemeralReference"].is_null());
}

#[tokio::test]
async fn test_profile_endpoints() {
    let t = test_app();

    let (status, _) = send(&t.app, get("/profile", Some(ALICE))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, created) = send(
        &t.app,
        with_json(
            "POST",
            "/profile",
            Some(ALICE),
            json!({ "username": "alice", "firstName": "Alice", "birthdate": "1990-04-01" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["username"], "alice");
    assert_eq!(created["birthdate"], "1990-04-01");

    let (status, _) = send(
        &t.app,
        with_json("POST", "/profile", Some(ALICE), json!({ "username": "again" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = send(
        &t.app,
        with_json("PUT", "/profile", Some(ALICE), json!({ "username": "alice-w", "bio": "Hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["username"], "alice-w");

    let (status, fetched) = send(&t.app, get("/profile", Some(ALICE))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["bio"], "Hi");

    let (status, _) = send(
        &t.app,
        with_json("POST", "/profile", Some("us-east-1:bob"), json!({ "username": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
