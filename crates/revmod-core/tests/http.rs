use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use http_body_util::BodyExt;
use revmod_core::{router, MemoryStore, ModuleService};
use serde_json::Value;
use tower::ServiceExt;

fn app(store: MemoryStore) -> axum::Router {
    router(ModuleService::new(Arc::new(store)))
}

async fn get(router: axum::Router, uri: &str) -> Response<Body> {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .unwrap()
}

fn sample_store() -> (MemoryStore, String) {
    let store = MemoryStore::new();
    let revision = store.commit(
        "site",
        &[
            (
                "deno.json",
                r#"{
                    "exports": { ".": "./mod.ts", "./utils": "./src/utils.ts" },
                    "imports": {
                        "react": "https://esm.example/react@18",
                        "std/": "https://deno.example/std@0.200.0/"
                    }
                }"#,
            ),
            ("mod.ts", "import React from \"react\";\nexport { React };\n"),
            (
                "src/utils.ts",
                "import { join } from 'std/path/mod.ts';\nexport const j = join;\n",
            ),
            ("static/logo.svg", "<svg/>"),
        ],
    );
    (store, revision.short().to_string())
}

#[tokio::test]
async fn root_prints_usage() {
    let (store, _) = sample_store();
    let response = get(app(store), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("GET /{app}"));
}

#[tokio::test]
async fn bare_app_redirects_to_root_export() {
    let (store, short) = sample_store();
    let response = get(app(store), "/site").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/site@{short}/mod.ts"));
}

#[tokio::test]
async fn symbolic_reference_redirects_to_short_revision() {
    let (store, short) = sample_store();
    let response = get(app(store), "/site@HEAD/src/utils.ts").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/site@{short}/src/utils.ts"));
}

#[tokio::test]
async fn export_subpath_redirects_to_target() {
    let (store, short) = sample_store();
    let response = get(app(store), &format!("/site@{short}/utils")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/site@{short}/src/utils.ts"));
}

#[tokio::test]
async fn canonical_source_is_rewritten() {
    let (store, short) = sample_store();
    let response = get(app(store), &format!("/site@{short}/src/utils.ts")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/typescript; charset=utf-8"
    );
    assert_eq!(
        body_text(response).await,
        "import { join } from 'https://deno.example/std@0.200.0/path/mod.ts';\nexport const j = join;\n"
    );
}

#[tokio::test]
async fn assets_pass_through() {
    let (store, short) = sample_store();
    let response = get(app(store), &format!("/site@{short}/static/logo.svg")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/svg+xml"
    );
    assert_eq!(body_text(response).await, "<svg/>");
}

#[tokio::test]
async fn missing_file_is_a_json_404() {
    let (store, short) = sample_store();
    let response = get(app(store), &format!("/site@{short}/missing.ts")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["success"], Value::Bool(false));
    assert_eq!(body["status"], 404);
    assert!(body["message"].as_str().unwrap().contains("missing.ts"));
}

#[tokio::test]
async fn unknown_app_and_reference_are_404() {
    let (store, _) = sample_store();
    let router = app(store);
    let response = get(router.clone(), "/ghost").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = get(router, "/site@no-such-tag/mod.ts").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn app_without_entrypoint_is_404() {
    let store = MemoryStore::new();
    store.commit("docs", &[("README.md", "# docs")]);
    let response = get(app(store), "/docs").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["message"].as_str().unwrap().contains("docs"));
}

#[tokio::test]
async fn unparsable_source_is_a_json_500() {
    let store = MemoryStore::new();
    let revision = store.commit("broken", &[("mod.js", "export const = ;")]);
    let response = get(app(store), &format!("/broken@{}/mod.js", revision.short())).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], 500);
    assert_eq!(body["success"], Value::Bool(false));
}

#[tokio::test]
async fn branches_resolve_independently() {
    let store = MemoryStore::new();
    let first = store.commit("lib", &[("mod.ts", "export const v = 1;")]);
    store.set_ref("lib", "v1", &first);
    let second = store.commit("lib", &[("mod.ts", "export const v = 2;")]);
    let router = app(store);

    let response = get(router.clone(), "/lib@v1").await;
    assert_eq!(location(&response), format!("/lib@{}/mod.ts", first.short()));
    let response = get(router.clone(), "/lib").await;
    assert_eq!(location(&response), format!("/lib@{}/mod.ts", second.short()));

    let response = get(router, &format!("/lib@{}/mod.ts", first.short())).await;
    assert_eq!(body_text(response).await, "export const v = 1;");
}

#[tokio::test]
async fn redirects_keep_reserved_characters_encoded() {
    let store = MemoryStore::new();
    let revision = store.commit(
        "site",
        &[("a#b.ts", "export const hash = 1;\n"), ("notes 1?.txt", "n")],
    );
    let router = app(store);

    let response = get(router.clone(), "/site@HEAD/a%23b.ts").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let target = location(&response).to_string();
    assert_eq!(target, format!("/site@{}/a%23b.ts", revision.short()));

    let response = get(router.clone(), &target).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "export const hash = 1;\n");

    let response = get(router.clone(), "/site/notes%201%3F.txt").await;
    let target = location(&response).to_string();
    assert_eq!(target, format!("/site@{}/notes%201%3F.txt", revision.short()));
    let response = get(router, &target).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "n");
}

#[tokio::test]
async fn trailing_slash_is_a_json_404() {
    let (store, short) = sample_store();
    let router = app(store);
    for uri in ["/site/".to_string(), format!("/site@{short}/")] {
        let response = get(router.clone(), &uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["success"], Value::Bool(false));
        assert_eq!(body["status"], 404);
    }
}

#[tokio::test]
async fn not_found_messages_name_app_and_reference() {
    let (store, _) = sample_store();
    let router = app(store);
    let response = get(router.clone(), "/ghost@v3/mod.ts").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("ghost") && message.contains("v3"), "{message}");

    let response = get(router, "/.hidden@v3").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    let message = body["message"].as_str().unwrap();
    assert!(message.contains(".hidden") && message.contains("v3"), "{message}");
}
