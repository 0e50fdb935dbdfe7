use std::sync::Arc;

use agora_application::AdminRoleRepository;
use agora_core::{Principal, PrincipalId};
use agora_domain::{AdminRole, AdminRoleAssignment};
use agora_infrastructure::InMemoryAdminStore;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::build_router;
use crate::api_services::{AdminPorts, build_app_state};

const SUPER_ADMIN_TOKEN: &str = "super-admin-token";
const MODERATOR_TOKEN: &str = "moderator-token";
const SUPPORT_TOKEN: &str = "support-token";
const POST_ID: &str = "6a1f8d44-2f0b-4f0e-9d0c-3b7f8e2c1a10";

async fn seed_admin(store: &InMemoryAdminStore, token: &str, role: AdminRole) {
    let principal_id = PrincipalId::new();
    store
        .register_principal(token, Principal::new(principal_id, None))
        .await;
    let assigned = store
        .upsert_assignment(AdminRoleAssignment {
            principal_id,
            role,
            is_active: true,
            dm_access_enabled: false,
            created_by: None,
            created_at: None,
        })
        .await;
    assert!(assigned.is_ok());
}

async fn test_router() -> Router {
    let store = Arc::new(InMemoryAdminStore::new());
    seed_admin(&store, SUPER_ADMIN_TOKEN, AdminRole::SuperAdmin).await;
    seed_admin(&store, MODERATOR_TOKEN, AdminRole::Moderator).await;
    seed_admin(&store, SUPPORT_TOKEN, AdminRole::Support).await;

    let seeded = store
        .insert_post(json!({
            "id": POST_ID,
            "body": "buy cheap followers",
            "handle": "spammer",
            "created_at": "2026-01-05T10:00:00Z",
            "deleted_at": null,
        }))
        .await;
    assert!(seeded.is_ok());

    let state = build_app_state(AdminPorts::in_memory(store), None);
    let Ok(router) = build_router(state, "*") else {
        panic!("router should build");
    };
    router
}

async fn call(
    router: &Router,
    token: Option<&str>,
    function: &str,
    body: Value,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri(format!("/functions/v1/{function}"))
        .header("content-type", "application/json")
        .header("user-agent", "router-tests");
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    let Ok(request) = request.body(Body::from(body.to_string())) else {
        panic!("request should build");
    };

    send(router, request).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let Ok(response) = router.clone().oneshot(request).await else {
        panic!("router should respond");
    };
    let status = response.status();
    let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body should be readable");
    };
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, payload)
}

async fn audit_for_post(router: &Router) -> Vec<Value> {
    let (status, payload) = call(
        router,
        Some(SUPER_ADMIN_TOKEN),
        "admin-audit",
        json!({ "action": "list-for-target", "targetType": "post", "targetId": POST_ID }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    payload["data"].as_array().cloned().unwrap_or_default()
}

#[tokio::test]
async fn support_cannot_delete_plans() {
    let router = test_router().await;

    let (status, _) = call(
        &router,
        Some(SUPER_ADMIN_TOKEN),
        "admin-plans",
        json!({
            "action": "create",
            "plan": { "code": "pro", "name": "Pro", "is_active": true }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, payload) = call(
        &router,
        Some(SUPPORT_TOKEN),
        "admin-plans",
        json!({ "action": "delete", "code": "pro" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(payload["error"].is_string());

    let (_, plans) = call(
        &router,
        Some(SUPER_ADMIN_TOKEN),
        "admin-plans",
        json!({ "action": "list" }),
    )
    .await;
    assert_eq!(plans["data"].as_array().map(Vec::len), Some(1));

    let (_, audit) = call(
        &router,
        Some(SUPER_ADMIN_TOKEN),
        "admin-audit",
        json!({ "action": "list" }),
    )
    .await;
    let actions: Vec<&str> = audit["data"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry["action"].as_str())
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(actions, vec!["create-plan"]);
}

#[tokio::test]
async fn moderator_removes_post_with_single_audit_entry() {
    let router = test_router().await;

    let (status, payload) = call(
        &router,
        Some(MODERATOR_TOKEN),
        "admin-posts",
        json!({ "action": "remove", "postId": POST_ID, "reason": "Spam" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["data"]["ok"], json!(true));

    let (_, removed) = call(
        &router,
        Some(MODERATOR_TOKEN),
        "admin-posts",
        json!({ "action": "list", "status": "removed" }),
    )
    .await;
    let Some(removed) = removed["data"].as_array() else {
        panic!("removed posts should be a list");
    };
    assert_eq!(removed.len(), 1);
    assert!(removed[0]["deleted_at"].is_string());

    let entries = audit_for_post(&router).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], json!("remove-post"));
    assert_eq!(entries[0]["actor_role"], json!("moderator"));
    assert_eq!(entries[0]["after_json"]["reason"], json!("Spam"));
    assert_eq!(entries[0]["user_agent"], json!("router-tests"));
}

#[tokio::test]
async fn repeated_trending_override_keeps_one_row() {
    let router = test_router().await;

    for multiplier in [2.5, 0.8] {
        let (status, _) = call(
            &router,
            Some(SUPER_ADMIN_TOKEN),
            "admin-posts",
            json!({ "action": "set-trending", "postId": POST_ID, "multiplier": multiplier }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let entries = audit_for_post(&router).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["action"], json!("set-post-trending"));
    assert_eq!(entries[0]["after_json"]["trending_multiplier"], json!(0.8));
    assert_eq!(entries[0]["before_json"]["trending_multiplier"], json!(2.5));
    assert_eq!(entries[1]["before_json"], Value::Null);
}

#[tokio::test]
async fn out_of_range_multiplier_is_rejected() {
    let router = test_router().await;

    let (status, payload) = call(
        &router,
        Some(SUPER_ADMIN_TOKEN),
        "admin-posts",
        json!({ "action": "set-trending", "postId": POST_ID, "multiplier": 12.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(payload["error"].is_string());
    assert!(audit_for_post(&router).await.is_empty());
}

#[tokio::test]
async fn moderator_cannot_set_trending() {
    let router = test_router().await;

    let (status, _) = call(
        &router,
        Some(MODERATOR_TOKEN),
        "admin-posts",
        json!({ "action": "set-trending", "postId": POST_ID, "multiplier": 2.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(audit_for_post(&router).await.is_empty());
}

#[tokio::test]
async fn role_gate_runs_before_payload_validation() {
    let router = test_router().await;

    let cases = [
        (
            "admin-users",
            json!({ "action": "lock-user", "userId": "not-a-uuid", "banDuration": "forever" }),
        ),
        ("admin-admins", json!({ "action": "set-role", "role": "owner" })),
        ("admin-posts", json!({ "action": "set-trending", "postId": POST_ID })),
    ];
    for (function, body) in cases {
        let (status, payload) = call(&router, Some(SUPPORT_TOKEN), function, body).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{function}: {payload}");
    }

    let (status, _) = call(
        &router,
        Some(SUPER_ADMIN_TOKEN),
        "admin-posts",
        json!({ "action": "set-trending", "postId": POST_ID }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_post_methods_return_method_not_allowed() {
    let router = test_router().await;
    let Ok(request) = Request::builder()
        .method(Method::GET)
        .uri("/functions/v1/admin-posts")
        .body(Body::empty())
    else {
        panic!("request should build");
    };

    let (status, payload) = send(&router, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(payload, json!({ "error": "method not allowed" }));
}

#[tokio::test]
async fn preflight_is_answered_without_credentials() {
    let router = test_router().await;
    let Ok(request) = Request::builder()
        .method(Method::OPTIONS)
        .uri("/functions/v1/admin-posts")
        .header("origin", "https://admin.agora.test")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization,content-type")
        .body(Body::empty())
    else {
        panic!("request should build");
    };

    let Ok(response) = router.oneshot(request).await else {
        panic!("router should respond");
    };
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn missing_bearer_is_unauthorized() {
    let router = test_router().await;

    let (status, payload) = call(&router, None, "admin-posts", json!({ "action": "list" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(payload["error"].is_string());

    let (status, _) = call(
        &router,
        Some("not-a-known-token"),
        "admin-posts",
        json!({ "action": "list" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_action_is_a_validation_error() {
    let router = test_router().await;

    let (status, payload) = call(
        &router,
        Some(SUPER_ADMIN_TOKEN),
        "admin-posts",
        json!({ "action": "explode" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload, json!({ "error": "unknown action" }));
}

#[tokio::test]
async fn unknown_function_is_not_found() {
    let router = test_router().await;

    let (status, _) = call(
        &router,
        Some(SUPER_ADMIN_TOKEN),
        "admin-billing",
        json!({ "action": "list" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_disabled_postgres_in_memory_mode() {
    let router = test_router().await;
    let Ok(request) = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
    else {
        panic!("request should build");
    };

    let (status, payload) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["postgres"]["status"], json!("disabled"));
    assert_eq!(payload["ready"], json!(true));
}
