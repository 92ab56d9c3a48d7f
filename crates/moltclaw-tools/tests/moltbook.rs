//! Moltbook client tests against an in-process HTTP server.
//!
//! Run with: `cargo test -p moltclaw-tools --test moltbook`

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use moltclaw_core::config::{Config, MoltbookConfig};
use moltclaw_tools::moltbook::{MoltbookClient, MoltbookError};
use moltclaw_tools::{ToolContext, ToolRegistry, register_builtin_tools};

/// Serve `app` on a free local port and return the API base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn echo_post(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "id": "post-1",
        "auth": header(&headers, "authorization"),
        "content_type": header(&headers, "content-type"),
        "body": body,
    }))
}

async fn echo_comment(
    Path(post_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    Json(json!({
        "post_id": post_id,
        "auth": header(&headers, "authorization"),
        "body": body,
    }))
}

fn echo_app() -> Router {
    Router::new()
        .route("/api/v1/posts", post(echo_post))
        .route("/api/v1/posts/{post_id}/comments", post(echo_comment))
}

fn client_for(base_url: String, api_key: Option<&str>) -> MoltbookClient {
    MoltbookClient::new(&MoltbookConfig {
        base_url: Some(base_url),
        api_key: api_key.map(String::from),
        api_key_env: Some("NONEXISTENT_VAR_MC_MOLTBOOK_IT".into()),
        timeout_secs: Some(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_create_post_sends_bearer_and_json() {
    let base = serve(echo_app()).await;
    let client = client_for(base, Some("mb-secret"));

    let resp = client
        .create_post("general", "Hello", "First post")
        .await
        .unwrap();
    assert_eq!(resp["id"], "post-1");
    assert_eq!(resp["auth"], "Bearer mb-secret");
    assert_eq!(resp["content_type"], "application/json");
    assert_eq!(
        resp["body"],
        json!({"submolt": "general", "title": "Hello", "content": "First post"})
    );
}

#[tokio::test]
async fn test_add_comment_with_and_without_parent() {
    let base = serve(echo_app()).await;
    let client = client_for(base, Some("mb-secret"));

    let top = client.add_comment("p42", "nice", None).await.unwrap();
    assert_eq!(top["post_id"], "p42");
    assert_eq!(top["body"], json!({"content": "nice"}));

    let reply = client
        .add_comment("p42", "agreed", Some("c7"))
        .await
        .unwrap();
    assert_eq!(reply["body"], json!({"content": "agreed", "parent_id": "c7"}));

    let empty_parent = client.add_comment("p42", "hm", Some("")).await.unwrap();
    assert_eq!(empty_parent["body"], json!({"content": "hm"}));
}

#[tokio::test]
async fn test_not_found_propagates_status() {
    // No routes: every request gets a 404
    let base = serve(Router::new()).await;
    let client = client_for(base, Some("mb-secret"));

    let err = client.create_post("general", "t", "c").await.unwrap_err();
    assert!(matches!(err, MoltbookError::Status { status: 404, .. }));
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("404"));
}

async fn count_hit(State(hits): State<Arc<AtomicUsize>>) -> StatusCode {
    hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new().fallback(count_hit).with_state(hits.clone());
    let base = serve(app).await;
    let client = client_for(base, None);

    let post = client.create_post("general", "t", "c").await;
    assert!(matches!(post, Err(MoltbookError::MissingCredential)));
    let comment = client.add_comment("p1", "c", None).await;
    assert!(matches!(comment, Err(MoltbookError::MissingCredential)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_env_credential_makes_no_request() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new().fallback(count_hit).with_state(hits.clone());
    let base = serve(app).await;

    unsafe { std::env::set_var("MC_TEST_EMPTY_MOLTBOOK_KEY", "") };
    let client = MoltbookClient::new(&MoltbookConfig {
        base_url: Some(base),
        api_key: None,
        api_key_env: Some("MC_TEST_EMPTY_MOLTBOOK_KEY".into()),
        timeout_secs: Some(5),
    })
    .unwrap();
    unsafe { std::env::remove_var("MC_TEST_EMPTY_MOLTBOOK_KEY") };

    assert!(!client.has_credential());
    let post = client.create_post("general", "t", "c").await;
    assert!(matches!(post, Err(MoltbookError::MissingCredential)));
    let comment = client.add_comment("p1", "c", Some("c2")).await;
    assert!(matches!(comment, Err(MoltbookError::MissingCredential)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_tools_report_http_errors_as_tool_errors() {
    let base = serve(Router::new()).await;
    let config = Config {
        moltbook: Some(MoltbookConfig {
            base_url: Some(base),
            api_key: Some("mb-secret".into()),
            ..Default::default()
        }),
        ..Config::default()
    };
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry, &config).unwrap();
    let context = ToolContext {
        config: Arc::new(config),
    };

    let out = registry
        .get("create_post")
        .unwrap()
        .execute(
            json!({"submolt": "general", "title": "t", "content": "c"}),
            &context,
        )
        .await
        .unwrap();
    assert!(out.is_error);
    assert!(out.content.contains("404"), "{}", out.content);
}

#[tokio::test]
async fn test_comment_tool_success() {
    let base = serve(echo_app()).await;
    let config = Config {
        moltbook: Some(MoltbookConfig {
            base_url: Some(base),
            api_key: Some("mb-secret".into()),
            ..Default::default()
        }),
        ..Config::default()
    };
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry, &config).unwrap();
    let context = ToolContext {
        config: Arc::new(config),
    };

    let out = registry
        .get("add_comment")
        .unwrap()
        .execute(
            json!({"post_id": "p9", "content": "hi", "parent_id": "c1"}),
            &context,
        )
        .await
        .unwrap();
    assert!(!out.is_error);
    let resp: Value = serde_json::from_str(&out.content).unwrap();
    assert_eq!(resp["post_id"], "p9");
    assert_eq!(resp["body"]["parent_id"], "c1");
}
