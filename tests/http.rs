use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Method, Request, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::Response,
};
use modjulie::{
    application::Builder,
    domain::library::LibraryLayout,
    infra::{
        http::{CACHE_STATUS_HEADER, HttpState, REQUEST_ID_HEADER, build_router},
        library::FsLibrary,
    },
};
use tower::ServiceExt;

const MAX_AGE_SECONDS: u64 = 5;

fn library_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("example/library")
}

fn library_file(relative: &str) -> String {
    std::fs::read_to_string(library_root().join(relative))
        .unwrap_or_else(|err| panic!("fixture {relative} should be readable: {err}"))
}

fn router() -> Router {
    let library = Arc::new(FsLibrary::new(library_root()));
    let builder = Arc::new(Builder::with_defaults(library, LibraryLayout::default()));
    build_router(HttpState::new(builder, MAX_AGE_SECONDS))
}

async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    app.clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
}

fn v2_headers() -> String {
    [
        library_file("v2/headers/namespace.js"),
        library_file("v2/headers/init.js"),
    ]
    .join("\n")
}

#[tokio::test]
async fn serves_preset_bundles() {
    let app = router();
    let response = get(&app, "/v1/default?modules=moduleA,moduleB").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).expect("content type"),
        "text/javascript"
    );
    assert_eq!(
        response.headers().get(CACHE_CONTROL).expect("cache control"),
        "public, max-age=5"
    );
}

#[tokio::test]
async fn header_modules_lead_the_bundle() {
    let app = router();
    let body = body_text(get(&app, "/v1/default?modules=moduleA,moduleB").await).await;

    assert!(body.starts_with(&library_file("v1/headers/namespace.js")));
}

#[tokio::test]
async fn multiple_header_modules_follow_manifest_order() {
    let app = router();
    let body = body_text(get(&app, "/v2/default?modules=moduleA,moduleB").await).await;

    assert!(body.starts_with(&v2_headers()));
}

#[tokio::test]
async fn serves_requests_without_a_preset() {
    let app = router();
    let body = body_text(get(&app, "/v2?modules=moduleA").await).await;

    assert_eq!(
        body,
        [v2_headers(), library_file("v2/modules/moduleA/module.js")].join("\n")
    );
}

#[tokio::test]
async fn modules_repeated_between_query_and_preset_appear_once() {
    let app = router();
    let body = body_text(get(&app, "/v2/default?modules=moduleC").await).await;

    assert_eq!(
        body,
        [v2_headers(), library_file("v2/modules/moduleC/module.js")].join("\n")
    );
}

#[tokio::test]
async fn repeated_query_modules_appear_once() {
    let app = router();
    let body = body_text(get(&app, "/v2?modules=moduleA,moduleA").await).await;

    assert_eq!(
        body,
        [v2_headers(), library_file("v2/modules/moduleA/module.js")].join("\n")
    );
}

#[tokio::test]
async fn bare_version_serves_headers_alone() {
    let app = router();
    let response = get(&app, "/v1").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CACHE_STATUS_HEADER).expect("cache header"),
        "false"
    );
    assert_eq!(
        body_text(response).await,
        library_file("v1/headers/namespace.js")
    );
}

#[tokio::test]
async fn missing_module_fails_with_server_error() {
    let app = router();
    let response = get(&app, "/v2/default?modules=moduleX").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value =
        serde_json::from_str(&body_text(response).await).expect("json error body");
    let message = body["error"].as_str().expect("error message");
    assert!(message.contains("moduleX"), "{message}");

    let retry = get(&app, "/v2/default?modules=moduleX").await;
    assert_eq!(retry.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unknown_version_fails_with_server_error() {
    let app = router();
    let response = get(&app, "/v9").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn path_like_names_are_rejected() {
    let app = router();
    let response = get(&app, "/v1/default?modules=..%2F..%2Fsecret").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_requests_are_served_from_the_cache() {
    let app = router();

    let first = get(&app, "/v2/cachetest").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        first.headers().get(CACHE_STATUS_HEADER).expect("cache header"),
        "false"
    );
    let first_body = body_text(first).await;

    let second = get(&app, "/v2/cachetest").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        second.headers().get(CACHE_STATUS_HEADER).expect("cache header"),
        "true"
    );
    assert_eq!(body_text(second).await, first_body);
}

#[tokio::test]
async fn module_order_does_not_split_the_cache() {
    let app = router();

    let first = get(&app, "/v2?modules=moduleB,moduleA").await;
    assert_eq!(
        first.headers().get(CACHE_STATUS_HEADER).expect("cache header"),
        "false"
    );

    let second = get(&app, "/v2?modules=moduleA,moduleB").await;
    assert_eq!(
        second.headers().get(CACHE_STATUS_HEADER).expect("cache header"),
        "true"
    );
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = router();

    let ok = get(&app, "/v1").await;
    let failed = get(&app, "/v9").await;

    for response in [ok, failed] {
        let id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .expect("request id header")
            .to_str()
            .expect("ascii request id");
        assert_eq!(id.len(), 36);
    }
}

#[tokio::test]
async fn cached_builds_do_not_answer_for_other_versions() {
    let app = router();

    let built = get(&app, "/v2?modules=moduleA").await;
    assert_eq!(built.status(), StatusCode::OK);

    let merged_name = get(&app, "/v2moduleA").await;
    assert_eq!(merged_name.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let split_name = get(&app, "/v/2?modules=moduleA").await;
    assert_eq!(split_name.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
