//! API router tests against in-memory stores.

mod common;

use common::{ISSUER, TestApp, request, token_for};
use greek_study_platform_access::IdpProfile;
use greek_study_platform_access::testing::sign;
use serde_json::json;

fn ch1() -> serde_json::Value {
    json!({
        "title": "Ch1",
        "description": "John 1:1",
        "details": { "word": "λόγος", "parsing": { "case": "nominative" } }
    })
}

#[tokio::test]
async fn missing_token_is_401_json() {
    let app = TestApp::new();

    for (method, uri) in [
        ("GET", "/api/analyses"),
        ("POST", "/api/analyses"),
        ("GET", "/api/analyses/1"),
        ("PATCH", "/api/analyses/1"),
        ("DELETE", "/api/analyses/1"),
        ("GET", "/api/user/1"),
        ("POST", "/api/user"),
    ] {
        let (status, body) = app.send(request(method, uri, None, None)).await;
        assert_eq!(status, 401, "{method} {uri}");
        assert_eq!(body["error"], "unauthenticated", "{method} {uri}");
    }
}

#[tokio::test]
async fn bad_tokens_are_401() {
    let app = TestApp::new();
    app.login("sub-123").await;
    let now = chrono::Utc::now().timestamp();

    let expired = sign(&json!({
        "sub": "sub-123", "iss": ISSUER, "aud": [common::AUDIENCE],
        "exp": now - 3600, "iat": now - 7200
    }));
    let wrong_issuer = sign(&json!({
        "sub": "sub-123", "iss": "https://evil.example.com/", "aud": [common::AUDIENCE],
        "exp": now + 3600, "iat": now
    }));
    let wrong_audience = sign(&json!({
        "sub": "sub-123", "iss": ISSUER, "aud": ["https://other-api"],
        "exp": now + 3600, "iat": now
    }));
    let mut tampered = token_for("sub-123");
    tampered.push('A');

    for (token, kind) in [
        (expired, "token_expired"),
        (wrong_issuer, "issuer_mismatch"),
        (wrong_audience, "audience_mismatch"),
        (tampered, "invalid_token"),
    ] {
        let (status, body) = app
            .send(request("GET", "/api/analyses", Some(&token), None))
            .await;
        assert_eq!(status, 401);
        assert_eq!(body["error"], kind);
    }
}

#[tokio::test]
async fn valid_token_without_account_is_401() {
    let app = TestApp::new();
    let token = token_for("sub-never-logged-in");

    let (status, body) = app
        .send(request("GET", "/api/analyses", Some(&token), None))
        .await;

    assert_eq!(status, 401);
    assert_eq!(body["error"], "user_not_found");
}

#[tokio::test]
async fn first_login_scenario() {
    let app = TestApp::new();
    let (_, token) = app.login("sub-123").await;

    let (status, body) = app
        .send(request("GET", "/api/analyses", Some(&token), None))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!([]));

    let (status, body) = app
        .send(request("GET", "/api/analyses/0", Some(&token), None))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn create_then_read_by_id_and_most_recent() {
    let app = TestApp::new();
    let (user_id, token) = app.login("sub-123").await;

    let (status, body) = app
        .send(request("POST", "/api/analyses", Some(&token), Some(ch1())))
        .await;
    assert_eq!(status, 201);
    let id = body["id"].as_i64().expect("id");

    let (status, analysis) = app
        .send(request("GET", &format!("/api/analyses/{id}"), Some(&token), None))
        .await;
    assert_eq!(status, 200);
    assert_eq!(analysis["title"], "Ch1");
    assert_eq!(analysis["user_id"], json!(user_id.get()));
    assert_eq!(analysis["details"], ch1()["details"]);
    assert_eq!(analysis["details"]["word"], "λόγος");

    let (status, recent) = app
        .send(request("GET", "/api/analyses/0", Some(&token), None))
        .await;
    assert_eq!(status, 200);
    assert_eq!(recent["id"], json!(id));
}

#[tokio::test]
async fn list_is_most_recently_updated_first_without_details() {
    let app = TestApp::new();
    let (_, token) = app.login("sub-123").await;

    let mut ids = Vec::new();
    for title in ["first", "second"] {
        let body = json!({ "title": title, "details": {} });
        let (_, created) = app
            .send(request("POST", "/api/analyses", Some(&token), Some(body)))
            .await;
        ids.push(created["id"].as_i64().expect("id"));
    }

    let (_, list) = app
        .send(request("GET", "/api/analyses", Some(&token), None))
        .await;
    let listed: Vec<_> = list
        .as_array()
        .expect("array")
        .iter()
        .map(|a| a["id"].as_i64().expect("id"))
        .collect();
    assert_eq!(listed, vec![ids[1], ids[0]]);
    assert!(list[0].get("details").is_none());

    let (status, body) = app
        .send(request(
            "PATCH",
            &format!("/api/analyses/{}", ids[0]),
            Some(&token),
            Some(json!({ "title": "first, revised", "details": { "n": 1 } })),
        ))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "success": true }));

    let (_, list) = app
        .send(request("GET", "/api/analyses", Some(&token), None))
        .await;
    assert_eq!(list[0]["id"], json!(ids[0]));
    assert_eq!(list[0]["title"], "first, revised");
}

#[tokio::test]
async fn other_users_analyses_are_not_found() {
    let app = TestApp::new();
    let (_, alice) = app.login("sub-alice").await;
    let (_, bob) = app.login("sub-bob").await;

    let (_, created) = app
        .send(request("POST", "/api/analyses", Some(&alice), Some(ch1())))
        .await;
    let uri = format!("/api/analyses/{}", created["id"]);

    let (status, _) = app.send(request("GET", &uri, Some(&bob), None)).await;
    assert_eq!(status, 404);
    let (status, _) = app
        .send(request("PATCH", &uri, Some(&bob), Some(json!({ "title": "mine", "details": {} }))))
        .await;
    assert_eq!(status, 404);
    let (status, body) = app.send(request("DELETE", &uri, Some(&bob), None)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not_found");

    let (status, analysis) = app.send(request("GET", &uri, Some(&alice), None)).await;
    assert_eq!(status, 200);
    assert_eq!(analysis["title"], "Ch1");

    let (_, bobs) = app.send(request("GET", "/api/analyses", Some(&bob), None)).await;
    assert_eq!(bobs, json!([]));
}

#[tokio::test]
async fn missing_and_foreign_ids_look_the_same() {
    let app = TestApp::new();
    let (_, alice) = app.login("sub-alice").await;
    let (_, bob) = app.login("sub-bob").await;
    let (_, created) = app
        .send(request("POST", "/api/analyses", Some(&alice), Some(ch1())))
        .await;

    let foreign = app
        .send(request("GET", &format!("/api/analyses/{}", created["id"]), Some(&bob), None))
        .await;
    let missing = app
        .send(request("GET", "/api/analyses/999999", Some(&bob), None))
        .await;

    assert_eq!(foreign, missing);
}

#[tokio::test]
async fn delete_removes_analysis() {
    let app = TestApp::new();
    let (_, token) = app.login("sub-123").await;
    let (_, created) = app
        .send(request("POST", "/api/analyses", Some(&token), Some(ch1())))
        .await;
    let uri = format!("/api/analyses/{}", created["id"]);

    let (status, _) = app.send(request("DELETE", &uri, Some(&token), None)).await;
    assert_eq!(status, 204);
    let (status, _) = app.send(request("GET", &uri, Some(&token), None)).await;
    assert_eq!(status, 404);
    let (status, _) = app.send(request("DELETE", &uri, Some(&token), None)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn malformed_bodies_are_400() {
    let app = TestApp::new();
    let (_, token) = app.login("sub-123").await;

    let long_title = json!({ "title": "α".repeat(101), "details": {} });
    let array_details = json!({ "title": "Ch1", "details": [1, 2] });
    let missing_details = json!({ "title": "Ch1" });

    for body in [long_title, array_details, missing_details] {
        let (status, response) = app
            .send(request("POST", "/api/analyses", Some(&token), Some(body)))
            .await;
        assert_eq!(status, 400);
        assert_eq!(response["error"], "validation_error");
    }

    let (status, _) = app
        .send(request("GET", "/api/analyses/not-a-number", Some(&token), None))
        .await;
    assert_eq!(status, 400);

    let (_, list) = app
        .send(request("GET", "/api/analyses", Some(&token), None))
        .await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn title_of_exactly_100_chars_is_accepted() {
    let app = TestApp::new();
    let (_, token) = app.login("sub-123").await;

    let body = json!({ "title": "λ".repeat(100), "details": {} });
    let (status, _) = app
        .send(request("POST", "/api/analyses", Some(&token), Some(body)))
        .await;
    assert_eq!(status, 201);
}

#[tokio::test]
async fn provisioning_creates_account_from_userinfo() {
    let app = TestApp::new();
    let token = token_for("sub-123");
    app.profiles.insert(
        &token,
        IdpProfile {
            name: Some("A. User".to_string()),
            email: Some("a@x.com".to_string()),
            ..IdpProfile::new("sub-123")
        },
    );

    let (status, body) = app.send(request("POST", "/api/user", Some(&token), None)).await;
    assert_eq!(status, 200);
    let user_id = body["userId"].as_i64().expect("userId");

    let (status, again) = app.send(request("POST", "/api/user", Some(&token), None)).await;
    assert_eq!(status, 200);
    assert_eq!(again["userId"], json!(user_id));
    assert_eq!(app.users.count().await, 1);

    let (status, list) = app
        .send(request("GET", "/api/analyses", Some(&token), None))
        .await;
    assert_eq!(status, 200);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn provisioning_rejects_userinfo_for_another_subject() {
    let app = TestApp::new();
    let token = token_for("sub-123");
    app.profiles.insert(&token, IdpProfile::new("sub-someone-else"));

    let (status, body) = app.send(request("POST", "/api/user", Some(&token), None)).await;

    assert_eq!(status, 401);
    assert_eq!(body["error"], "authentication_failed");
    assert_eq!(app.users.count().await, 0);
}

#[tokio::test]
async fn provisioning_fails_when_provider_rejects_token() {
    let app = TestApp::new();
    let token = token_for("sub-123");

    let (status, _) = app.send(request("POST", "/api/user", Some(&token), None)).await;

    assert_eq!(status, 401);
    assert_eq!(app.users.count().await, 0);
}

#[tokio::test]
async fn user_profile_is_visible_only_to_its_owner() {
    let app = TestApp::new();
    let (alice_id, alice) = app.login("sub-alice").await;
    let (bob_id, _) = app.login("sub-bob").await;

    let (status, body) = app
        .send(request("GET", &format!("/api/user/{alice_id}"), Some(&alice), None))
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "id": alice_id.get(),
            "name": "sub-alice name",
            "nickname": "sub-alice",
            "picture": null
        })
    );

    let (status, _) = app
        .send(request("GET", &format!("/api/user/{bob_id}"), Some(&alice), None))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn unknown_api_path_is_json_404() {
    let app = TestApp::new();

    let (status, body) = app.send(request("GET", "/api/nothing/here", None, None)).await;

    assert_eq!(status, 404);
    assert_eq!(body["error"], "not_found");
}
