//! Registration, sign-in, and session lifecycle tests.

mod common;

use axum::http::StatusCode;
use common::setup;
use serde_json::json;

#[tokio::test]
async fn test_sign_up_creates_verified_user() {
    let ctx = setup().await;

    let (status, body) = ctx.sign_up("alice@example.com", "password123").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["verified"], true);
    assert!(body["id"].as_str().is_some());

    // A verification message was queued for the new address
    let message = ctx.last_message();
    assert_eq!(message.kind(), "email_verification");
    assert_eq!(message.email(), "alice@example.com");
}

#[tokio::test]
async fn test_sign_up_normalizes_email() {
    let ctx = setup().await;

    let (status, body) = ctx.sign_up("  ALICE@Example.COM ", "password123").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "alice@example.com");

    // And the normalized credentials authenticate
    let (status, _) = ctx.sign_in("alice@example.com", "password123").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_sign_up_validation_errors() {
    let ctx = setup().await;

    // Short password
    let (status, body) = ctx.sign_up("alice@example.com", "short").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["password"][0], "must be at least 8 characters");

    // Mismatched confirmation
    let (status, body) = ctx
        .request(
            "POST",
            "/sign_up",
            None,
            Some(json!({
                "email": "alice@example.com",
                "password": "password123",
                "password_confirmation": "different123",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["password_confirmation"][0], "does not match password");

    // Missing everything: field-level messages for each input
    let (status, body) = ctx.request("POST", "/sign_up", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["email"][0], "is required");
    assert_eq!(body["password"][0], "is required");
    assert_eq!(body["password_confirmation"][0], "is required");

    // Malformed email
    let (status, body) = ctx.sign_up("not-an-email", "password123").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["email"][0], "is invalid");
}

#[tokio::test]
async fn test_sign_up_duplicate_email() {
    let ctx = setup().await;

    ctx.sign_up("alice@example.com", "password123").await;

    let (status, body) = ctx.sign_up("alice@example.com", "password456").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["email"][0], "is already taken");

    // Case-insensitive collision
    let (status, body) = ctx.sign_up("ALICE@example.com", "password456").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["email"][0], "is already taken");
}

#[tokio::test]
async fn test_sign_in_returns_token_and_header() {
    let ctx = setup().await;
    ctx.sign_up("alice@example.com", "password123").await;

    let (status, headers, body) = ctx
        .request_full(
            "POST",
            "/sign_in",
            None,
            Some(json!({ "email": "alice@example.com", "password": "password123" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    assert!(!token.is_empty());
    assert_eq!(
        headers.get("x-session-token").and_then(|v| v.to_str().ok()),
        Some(token)
    );
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["session"]["id"].as_str().is_some());
}

#[tokio::test]
async fn test_sign_in_failure_is_generic() {
    let ctx = setup().await;
    ctx.sign_up("alice@example.com", "password123").await;

    // Wrong password and unknown email produce byte-identical outcomes
    let (status_wrong, body_wrong) = ctx.sign_in("alice@example.com", "wrong-password").await;
    let (status_unknown, body_unknown) = ctx.sign_in("nobody@example.com", "password123").await;

    assert_eq!(status_wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(status_unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(body_wrong, body_unknown);
}

#[tokio::test]
async fn test_sessions_require_auth() {
    let ctx = setup().await;

    let (status, _) = ctx.request("GET", "/sessions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.request("GET", "/sessions", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_listing_is_scoped_and_newest_first() {
    let ctx = setup().await;
    ctx.sign_up("alice@example.com", "password123").await;
    ctx.sign_up("bob@example.com", "password123").await;

    let b1 = ctx.bearer("alice@example.com", "password123").await;
    let b2 = ctx.bearer("alice@example.com", "password123").await;
    ctx.bearer("bob@example.com", "password123").await;

    let (status, body) = ctx.request("GET", "/sessions", Some(&b2), None).await;
    assert_eq!(status, StatusCode::OK);
    let sessions = body.as_array().unwrap();
    // Only Alice's two sessions, newest first
    assert_eq!(sessions.len(), 2);
    let first = sessions[0]["id"].as_str().unwrap();
    let second = sessions[1]["id"].as_str().unwrap();
    assert_ne!(first, second);

    // The newest session is the one b2 resolves to
    let (_, shown) = ctx
        .request("GET", &format!("/sessions/{}", first), Some(&b2), None)
        .await;
    assert_eq!(shown["id"], *first);

    // b1 still resolves too
    let (status, _) = ctx.request("GET", "/sessions", Some(&b1), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_foreign_session_is_not_found() {
    let ctx = setup().await;
    ctx.sign_up("alice@example.com", "password123").await;
    ctx.sign_up("bob@example.com", "password123").await;

    let alice = ctx.bearer("alice@example.com", "password123").await;
    let bob = ctx.bearer("bob@example.com", "password123").await;

    let (_, body) = ctx.request("GET", "/sessions", Some(&bob), None).await;
    let bob_session = body[0]["id"].as_str().unwrap().to_string();

    // Not forbidden: indistinguishable from a session that does not exist
    let (status, _) = ctx
        .request("GET", &format!("/sessions/{}", bob_session), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/sessions/{}", bob_session),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Bob's session survived the attempts
    let (status, _) = ctx.request("GET", "/sessions", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_sign_out_invalidates_bearer() {
    let ctx = setup().await;
    ctx.sign_up("alice@example.com", "password123").await;
    let token = ctx.bearer("alice@example.com", "password123").await;

    let (_, body) = ctx.request("GET", "/sessions", Some(&token), None).await;
    let session_id = body[0]["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/sessions/{}", session_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The bearer value itself still carries a valid signature, but the
    // session row is gone
    let (status, _) = ctx.request("GET", "/sessions", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_change_revokes_other_sessions() {
    let ctx = setup().await;
    ctx.sign_up("u@example.com", "password123").await;

    let b1 = ctx.bearer("u@example.com", "password123").await;
    let b2 = ctx.bearer("u@example.com", "password123").await;

    // Change the password from the first session with a correct challenge
    let (status, _) = ctx
        .request(
            "PATCH",
            "/password",
            Some(&b1),
            Some(json!({
                "password": "new-password-456",
                "password_confirmation": "new-password-456",
                "password_challenge": "password123",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // B2 no longer resolves, B1 still does
    let (status, _) = ctx.request("GET", "/sessions", Some(&b2), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = ctx.request("GET", "/sessions", Some(&b1), None).await;
    assert_eq!(status, StatusCode::OK);

    // And the new credentials work
    let (status, _) = ctx.sign_in("u@example.com", "new-password-456").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx.sign_in("u@example.com", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_change_challenge_messages() {
    let ctx = setup().await;
    ctx.sign_up("alice@example.com", "password123").await;
    let token = ctx.bearer("alice@example.com", "password123").await;

    // Absent challenge: "required"
    let (status, body) = ctx
        .request(
            "PATCH",
            "/password",
            Some(&token),
            Some(json!({
                "password": "new-password-456",
                "password_confirmation": "new-password-456",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["password_challenge"][0], "is required");

    // Wrong challenge: "incorrect" - a distinct message
    let (status, body) = ctx
        .request(
            "PATCH",
            "/password",
            Some(&token),
            Some(json!({
                "password": "new-password-456",
                "password_confirmation": "new-password-456",
                "password_challenge": "wrong-password",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["password_challenge"][0], "is incorrect");

    // Failed attempts revoked nothing
    let (status, _) = ctx.request("GET", "/sessions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_resubmitting_same_password_revokes_nothing() {
    let ctx = setup().await;
    ctx.sign_up("alice@example.com", "password123").await;

    let b1 = ctx.bearer("alice@example.com", "password123").await;
    let b2 = ctx.bearer("alice@example.com", "password123").await;

    let (status, _) = ctx
        .request(
            "PATCH",
            "/password",
            Some(&b1),
            Some(json!({
                "password": "password123",
                "password_confirmation": "password123",
                "password_challenge": "password123",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The hash did not change, so no cascade fired
    let (status, _) = ctx.request("GET", "/sessions", Some(&b2), None).await;
    assert_eq!(status, StatusCode::OK);
}
