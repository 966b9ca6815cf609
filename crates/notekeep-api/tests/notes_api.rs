mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use common::{Services, call, send};
use notekeep_api::cached_notes::author_key;
use notekeep_cache::Cache;
use serde_json::{Value, json};

async fn create(svc: &Services, token: &str, name: &str, content: &str) -> Value {
    let (status, body) = call(
        &svc.notes,
        Method::POST,
        "/notes",
        Some(token),
        Some(json!({ "name": name, "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["note"].clone()
}

async fn list(svc: &Services, token: &str) -> Value {
    let (status, body) = call(&svc.notes, Method::GET, "/notes", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn auth_tokens_work_against_the_notes_service() {
    let svc = Services::new();
    let (id, access, _) = svc.sign_up("alice", "hunter2").await;

    let note = create(&svc, &access, "groceries", "milk").await;
    assert_eq!(note["author_id"], id);
    assert_eq!(note["name"], "groceries");
    assert!(note["id"].as_str().unwrap().parse::<uuid::Uuid>().is_ok());

    let body = list(&svc, &access).await;
    assert_eq!(body["message"], "Notes retrieved successfully");
    assert_eq!(body["count"], 1);
    assert_eq!(body["author_id"], id);
    assert_eq!(body["notes"][0], note);
}

#[tokio::test]
async fn client_supplied_author_is_ignored() {
    let svc = Services::new();
    let (id, access, _) = svc.sign_up("alice", "hunter2").await;

    let (status, body) = call(
        &svc.notes,
        Method::POST,
        "/notes",
        Some(&access),
        Some(json!({ "name": "n", "content": "c", "author_id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["note"]["author_id"], id);
}

#[tokio::test]
async fn other_users_notes_are_forbidden() {
    let svc = Services::new();
    let (_, alice, _) = svc.sign_up("alice", "hunter2").await;
    let (_, bob, _) = svc.sign_up("bob", "pw").await;

    let note = create(&svc, &alice, "private", "secret").await;
    let uri = format!("/notes/{}", note["id"].as_str().unwrap());

    let (status, body) = call(&svc.notes, Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, Value::Null);

    let (status, _) = call(
        &svc.notes,
        Method::PUT,
        &uri,
        Some(&bob),
        Some(json!({ "name": "pwned", "content": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&svc.notes, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&svc.notes, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["note"], note);

    // Bob's own list never sees it.
    assert_eq!(list(&svc, &bob).await["count"], 0);
}

fn malformed_put(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap()
}

#[tokio::test]
async fn ownership_is_checked_before_the_body() {
    let svc = Services::new();
    let (_, alice, _) = svc.sign_up("alice", "hunter2").await;
    let (_, bob, _) = svc.sign_up("bob", "pw").await;

    let note = create(&svc, &alice, "private", "secret").await;
    let uri = format!("/notes/{}", note["id"].as_str().unwrap());

    let (status, body) = send(&svc.notes, malformed_put(&uri, &bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&svc.notes, malformed_put(&uri, &alice)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid request data");

    let (_, body) = call(&svc.notes, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(body["note"], note);
}

#[tokio::test]
async fn update_and_delete_keep_the_list_coherent() {
    let svc = Services::new();
    let (id, access, _) = svc.sign_up("alice", "hunter2").await;
    let note = create(&svc, &access, "draft", "v1").await;
    let uri = format!("/notes/{}", note["id"].as_str().unwrap());

    // Warm the cache.
    assert_eq!(list(&svc, &access).await["count"], 1);
    assert!(svc.cache.get(&author_key(id)).await.unwrap().is_some());

    let (status, body) = call(
        &svc.notes,
        Method::PUT,
        &uri,
        Some(&access),
        Some(json!({ "name": "final", "content": "v2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note updated successfully");
    assert_eq!(body["note"]["author_id"], id);

    let body = list(&svc, &access).await;
    assert_eq!(body["notes"][0]["name"], "final");
    assert_eq!(body["notes"][0]["content"], "v2");

    let (status, body) = call(&svc.notes, Method::DELETE, &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note deleted successfully");

    assert_eq!(list(&svc, &access).await["count"], 0);

    let (status, _) = call(&svc.notes, Method::DELETE, &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn new_notes_show_up_after_a_cached_list() {
    let svc = Services::new();
    let (_, access, _) = svc.sign_up("alice", "hunter2").await;

    assert_eq!(list(&svc, &access).await["count"], 0);
    create(&svc, &access, "a", "1").await;
    create(&svc, &access, "b", "2").await;

    let body = list(&svc, &access).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["notes"][0]["name"], "a");
    assert_eq!(body["notes"][1]["name"], "b");
}

#[tokio::test]
async fn note_ids_are_validated() {
    let svc = Services::new();
    let (_, access, _) = svc.sign_up("alice", "hunter2").await;

    let (status, body) = call(&svc.notes, Method::GET, "/notes/not-a-uuid", Some(&access), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid note id");

    let missing = format!("/notes/{}", uuid::Uuid::new_v4());
    let (status, body) = call(&svc.notes, Method::GET, &missing, Some(&access), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "note not found");
}

#[tokio::test]
async fn unauthenticated_requests_have_no_effect() {
    let svc = Services::new();
    let (id, access, refresh) = svc.sign_up("alice", "hunter2").await;

    let (status, _) = call(
        &svc.notes,
        Method::POST,
        "/notes",
        None,
        Some(json!({ "name": "n", "content": "c" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &svc.notes,
        Method::POST,
        "/notes",
        Some(&refresh),
        Some(json!({ "name": "n", "content": "c" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let body = list(&svc, &access).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["author_id"], id);
}

#[tokio::test]
async fn expired_tokens_are_rejected_by_the_notes_service() {
    let svc = Services::new();
    let (_, access, _) = svc.sign_up("alice", "hunter2").await;

    svc.clock.advance(3601);
    let (status, body) = call(&svc.notes, Method::GET, "/notes", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid or expired token");
}

#[tokio::test]
async fn health_is_public() {
    let svc = Services::new();
    let (status, body) = call(&svc.notes, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
