use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use http_body_util::BodyExt;
use recallr::Config;
use tower::ServiceExt;

/// Credentials seeded by the initial migration.
const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "admin";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.database.path = "sqlite::memory:".to_string();

    let state = recallr::api::create_app_state(config)
        .await
        .expect("Failed to create app state");
    recallr::api::router(state)
}

fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
}

fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}

fn json_body(value: &serde_json::Value) -> Body {
    Body::from(serde_json::to_string(value).unwrap())
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a user and return its id.
async fn register(app: &Router, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/users")
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(json_body(
                    &serde_json::json!({"username": username, "password": password}),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

/// Exchange credentials for a bearer token via the basic scheme.
async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/users/login")
                .header(header::AUTHORIZATION, basic_auth(username, password))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn create_question(app: &Router, admin_token: &str, question: &str, answer: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/questions")
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(json_body(
                    &serde_json::json!({"question": question, "answer": answer}),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_system_status_is_open() {
    let app = spawn_app().await;

    let response = app
        .oneshot(
            request("GET", "/api/system/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], "recallr");
    assert_eq!(body["data"]["database"], true);
}

#[tokio::test]
async fn test_registration_and_login_round_trip() {
    let app = spawn_app().await;

    let user_id = register(&app, "alice", "secret").await;
    let token = login(&app, "alice", "secret").await;

    // The token resolves back to the same identity.
    let response = app
        .clone()
        .oneshot(
            request("GET", &format!("/api/users/{user_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["username"], "alice");
    // Presentation projection never exposes credential material.
    assert!(body["data"].get("pw_hash").is_none());
    assert!(body["data"].get("pw_salt").is_none());
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let app = spawn_app().await;

    register(&app, "alice", "secret").await;

    let response = app
        .oneshot(
            request("POST", "/api/users")
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(json_body(
                    &serde_json::json!({"username": "alice", "password": "other"}),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_failures_carry_challenge_and_do_not_enumerate() {
    let app = spawn_app().await;
    register(&app, "alice", "secret").await;

    let mut bodies = Vec::new();
    for auth in [
        basic_auth("alice", "wrong-password"),
        basic_auth("no-such-user", "whatever"),
    ] {
        let response = app
            .clone()
            .oneshot(
                request("POST", "/api/users/login")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .expect("challenge header")
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(challenge, "Basic realm=\"127.0.0.1\"");
        bodies.push(body_json(response).await);
    }

    // Unknown username and wrong password are indistinguishable.
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn test_bearer_challenge_hints_at_login() {
    let app = spawn_app().await;

    let response = app
        .oneshot(
            request("GET", "/api/questions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .expect("challenge header")
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(challenge, "Bearer realm=\"127.0.0.1\"");

    let body = body_json(response).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("/api/users/login")
    );
}

#[tokio::test]
async fn test_privilege_enforcement_on_admin_routes() {
    let app = spawn_app().await;

    register(&app, "alice", "secret").await;
    let user_token = login(&app, "alice", "secret").await;

    // A valid token lacking "admin" is forbidden, not unauthorized.
    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/questions")
                .header(header::AUTHORIZATION, format!("Bearer {user_token}"))
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(json_body(&serde_json::json!({"question": "q", "answer": "a"})))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // No question was created.
    let admin_token = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/questions")
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Garbage tokens stay unauthorized.
    let response = app
        .oneshot(
            request("GET", "/api/questions")
                .header(header::AUTHORIZATION, "Bearer deadbeef")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_question_crud_lifecycle() {
    let app = spawn_app().await;
    let admin_token = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let question_id = create_question(&app, &admin_token, "2+2?", "4").await;

    // The admin also holds "user", so listing works with its token.
    let response = app
        .clone()
        .oneshot(
            request("GET", &format!("/api/questions/{question_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["question"], "2+2?");
    assert_eq!(body["data"]["answer"], "4");

    // Update in place.
    let response = app
        .clone()
        .oneshot(
            request("PUT", &format!("/api/questions/{question_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(json_body(&serde_json::json!({"question": "2+3?", "answer": "5"})))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["question"], "2+3?");

    // Soft delete succeeds once.
    let response = app
        .clone()
        .oneshot(
            request("DELETE", &format!("/api/questions/{question_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The second delete is a 404, never a second success.
    let response = app
        .clone()
        .oneshot(
            request("DELETE", &format!("/api/questions/{question_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // And the deleted row is gone from reads.
    let response = app
        .oneshot(
            request("GET", &format!("/api/questions/{question_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_question_is_404_but_update_is_400() {
    let app = spawn_app().await;
    let admin_token = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/questions/no-such-id")
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            request("PUT", "/api/questions/no-such-id")
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(json_body(&serde_json::json!({"question": "q", "answer": "a"})))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_outcome_stats_accumulate() {
    let app = spawn_app().await;
    let admin_token = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let question_id = create_question(&app, &admin_token, "capital of France?", "Paris").await;

    register(&app, "alice", "secret").await;
    let token = login(&app, "alice", "secret").await;

    for correct in [true, true, true, false] {
        let response = app
            .clone()
            .oneshot(
                request("POST", &format!("/api/questions/{question_id}/submit"))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                    .body(json_body(&serde_json::json!({"correct": correct})))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/user/questions")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], question_id.as_str());
    assert_eq!(entries[0]["nb_correct"], 3);
    assert_eq!(entries[0]["nb_wrong"], 1);

    // The plain listing carries no per-user counts.
    let response = app
        .oneshot(
            request("GET", "/api/questions")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["data"][0].get("nb_correct").is_none());
}

#[tokio::test]
async fn test_submitting_against_unknown_question_is_404() {
    let app = spawn_app().await;
    register(&app, "alice", "secret").await;
    let token = login(&app, "alice", "secret").await;

    let response = app
        .oneshot(
            request("POST", "/api/questions/no-such-id/submit")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(json_body(&serde_json::json!({"correct": true})))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_self_or_admin_rule_on_user_reads() {
    let app = spawn_app().await;

    register(&app, "alice", "secret").await;
    let bob_id = register(&app, "bob", "secret").await;
    let alice_token = login(&app, "alice", "secret").await;

    // Alice cannot read Bob.
    let response = app
        .clone()
        .oneshot(
            request("GET", &format!("/api/users/{bob_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {alice_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The admin can.
    let admin_token = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let response = app
        .clone()
        .oneshot(
            request("GET", &format!("/api/users/{bob_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Listing users is admin-only.
    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/users")
                .header(header::AUTHORIZATION, format!("Bearer {alice_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(
            request("GET", "/api/users")
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let usernames: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert!(usernames.contains(&"alice"));
    assert!(usernames.contains(&"bob"));
}

#[tokio::test]
async fn test_user_soft_delete_and_logout() {
    let app = spawn_app().await;

    let alice_id = register(&app, "alice", "secret").await;
    let alice_token = login(&app, "alice", "secret").await;
    let admin_token = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    // Logout revokes the session.
    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/users/logout")
                .header(header::AUTHORIZATION, format!("Bearer {alice_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(
            request("GET", "/api/questions")
                .header(header::AUTHORIZATION, format!("Bearer {alice_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Admin soft-deletes the account; a second delete is a 404.
    let response = app
        .clone()
        .oneshot(
            request("DELETE", &format!("/api/users/{alice_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(
            request("DELETE", &format!("/api/users/{alice_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Deleted users can no longer log in.
    let response = app
        .oneshot(
            request("POST", "/api/users/login")
                .header(header::AUTHORIZATION, basic_auth("alice", "secret"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_validates_input() {
    let app = spawn_app().await;

    let response = app
        .oneshot(
            request("POST", "/api/users")
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(json_body(&serde_json::json!({"username": "", "password": "x"})))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
