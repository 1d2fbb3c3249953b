use parley_memory::Database;
use parley_server::state::AppState;
use parley_server::create_router;
use serde_json::{json, Value};

/// Bind the router to an ephemeral port and return its base URL plus the
/// state handle for direct store access in assertions.
async fn spawn_app() -> (String, AppState) {
    let db = Database::open_in_memory().expect("open db");
    let state = AppState::new(&db);
    let router = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });

    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn chat_replies_with_matching_rule() {
    let (base, state) = spawn_app().await;
    state.rules.upsert("hello", "Hi!").await.expect("seed rule");

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{base}/api/chat"))
        .json(&json!({ "message": "Hello there" }))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.expect("json");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["userMessage"], "Hello there");
    assert_eq!(body["data"]["botReply"], "Hi!");
    assert!(body["data"]["timestamp"].is_string());
}

#[tokio::test]
async fn chat_falls_back_when_nothing_matches() {
    let (base, _state) = spawn_app().await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{base}/api/chat"))
        .json(&json!({ "message": "completely unknown input" }))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.expect("json");
    assert_eq!(
        body["data"]["botReply"],
        "I'm sorry, I didn't understand that. Can you please rephrase?"
    );
}

#[tokio::test]
async fn chat_validates_the_message_at_the_boundary() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    // Missing / non-string message.
    let res = client
        .post(format!("{base}/api/chat"))
        .json(&json!({ "message": 42 }))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.expect("json");
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"]["message"],
        "Message is required and must be a string"
    );

    // Whitespace-only message.
    let res = client
        .post(format!("{base}/api/chat"))
        .json(&json!({ "message": "   " }))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 400);

    // Over the 500-character cap.
    let res = client
        .post(format!("{base}/api/chat"))
        .json(&json!({ "message": "x".repeat(501) }))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.expect("json");
    assert_eq!(
        body["error"]["message"],
        "Message is too long (max 500 characters)"
    );
}

#[tokio::test]
async fn chat_history_pages_recorded_turns() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    for message in ["first message", "second message"] {
        client
            .post(format!("{base}/api/chat"))
            .json(&json!({ "message": message }))
            .send()
            .await
            .expect("chat");
    }

    let res = client
        .get(format!("{base}/api/chat/history?limit=10"))
        .send()
        .await
        .expect("history");
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.expect("json");
    assert_eq!(body["data"]["total"], 2);
    let chats = body["data"]["chats"].as_array().expect("chats array");
    assert_eq!(chats.len(), 2);
    assert_eq!(chats[0]["userMessage"], "first message");
    assert_eq!(chats[1]["userMessage"], "second message");
}

#[tokio::test]
async fn admin_create_then_update_splits_status_codes() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/admin/rules"))
        .json(&json!({ "keyword": "Hello", "response": "Hi!" }))
        .send()
        .await
        .expect("create");
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.expect("json");
    assert_eq!(body["message"], "Rule added successfully");
    assert_eq!(body["data"]["rule"]["keyword"], "hello");

    let res = client
        .post(format!("{base}/api/admin/rules"))
        .json(&json!({ "keyword": "hello", "response": "Howdy!" }))
        .send()
        .await
        .expect("update");
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.expect("json");
    assert_eq!(
        body["message"],
        "Rule updated successfully (keyword already existed)"
    );
    assert_eq!(body["data"]["rule"]["response"], "Howdy!");

    let res = client
        .get(format!("{base}/api/admin/rules"))
        .send()
        .await
        .expect("list");
    let body: Value = res.json().await.expect("json");
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn admin_rejects_empty_rule_fields() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/admin/rules"))
        .json(&json!({ "keyword": "   ", "response": "something" }))
        .send()
        .await
        .expect("request");
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.expect("json");
    assert_eq!(body["error"]["message"], "Keyword cannot be empty");
}

#[tokio::test]
async fn admin_delete_reports_missing_rules() {
    let (base, state) = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .delete(format!(
            "{base}/api/admin/rules/00000000-0000-0000-0000-000000000000"
        ))
        .send()
        .await
        .expect("delete missing");
    assert_eq!(res.status(), 404);

    let rule = state.rules.upsert("bye", "See ya").await.expect("seed");
    let res = client
        .delete(format!("{base}/api/admin/rules/{}", rule.id))
        .send()
        .await
        .expect("delete");
    assert_eq!(res.status(), 200);
    assert_eq!(state.rules.count().await.expect("count"), 0);
}

#[tokio::test]
async fn auth_register_login_me_logout_flow() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({ "username": "Alice", "password": "hunter22" }))
        .send()
        .await
        .expect("register");
    assert_eq!(res.status(), 200);
    let cookie = res
        .headers()
        .get("set-cookie")
        .expect("session cookie")
        .to_str()
        .expect("cookie str")
        .split(';')
        .next()
        .expect("cookie pair")
        .to_owned();
    let body: Value = res.json().await.expect("json");
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    // Session cookie resolves to the user.
    let res = client
        .get(format!("{base}/api/auth/me"))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("me");
    assert_eq!(res.status(), 200);

    // Bad password is a 401, not an error page.
    let res = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "username": "alice", "password": "wrong-password" }))
        .send()
        .await
        .expect("bad login");
    assert_eq!(res.status(), 401);

    // Fresh login works and issues a new session.
    let res = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "username": "ALICE", "password": "hunter22" }))
        .send()
        .await
        .expect("login");
    assert_eq!(res.status(), 200);

    // Logout invalidates the original session.
    let res = client
        .post(format!("{base}/api/auth/logout"))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("logout");
    assert_eq!(res.status(), 200);

    let res = client
        .get(format!("{base}/api/auth/me"))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("me after logout");
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn auth_rejects_duplicates_and_weak_passwords() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({ "username": "bob", "password": "short" }))
        .send()
        .await
        .expect("weak password");
    assert_eq!(res.status(), 400);

    client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({ "username": "bob", "password": "longenough" }))
        .send()
        .await
        .expect("register");

    let res = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({ "username": " BOB ", "password": "longenough" }))
        .send()
        .await
        .expect("duplicate");
    assert_eq!(res.status(), 409);
    let body: Value = res.json().await.expect("json");
    assert_eq!(body["error"]["message"], "Username already exists");
}

#[tokio::test]
async fn profile_update_requires_session_and_merges_fields() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{base}/api/auth/profile"))
        .json(&json!({ "displayName": "Nobody" }))
        .send()
        .await
        .expect("unauthenticated");
    assert_eq!(res.status(), 401);

    let res = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({ "username": "carol", "password": "longenough" }))
        .send()
        .await
        .expect("register");
    let cookie = res
        .headers()
        .get("set-cookie")
        .expect("cookie")
        .to_str()
        .expect("cookie str")
        .split(';')
        .next()
        .expect("pair")
        .to_owned();

    let res = client
        .put(format!("{base}/api/auth/profile"))
        .header("cookie", &cookie)
        .json(&json!({ "displayName": "Carol C.", "email": "Carol@Example.com" }))
        .send()
        .await
        .expect("update");
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.expect("json");
    assert_eq!(body["data"]["user"]["displayName"], "Carol C.");
    assert_eq!(body["data"]["user"]["email"], "carol@example.com");
}

#[tokio::test]
async fn unknown_api_route_returns_envelope_404() {
    let (base, _state) = spawn_app().await;

    let res = reqwest::get(format!("{base}/api/does-not-exist"))
        .await
        .expect("request");
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.expect("json");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["message"], "Route not found");
}

#[tokio::test]
async fn frontend_serves_embedded_chat_page() {
    let (base, _state) = spawn_app().await;

    let res = reqwest::get(format!("{base}/")).await.expect("request");
    assert_eq!(res.status(), 200);
    let content_type = res
        .headers()
        .get("content-type")
        .expect("content type")
        .to_str()
        .expect("str")
        .to_owned();
    assert!(content_type.starts_with("text/html"));
    let html = res.text().await.expect("body");
    assert!(html.contains("Parley Chat"));
}
