//! End-to-end tests: spin up a real server on a free port and drive it
//! over HTTP.

use serde_json::{json, Value};
use std::sync::Arc;
use taskd::{config::TaskdConfig, rest, storage::Storage, AppContext};

async fn start_test_server() -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let port = get_free_port();

    let config = TaskdConfig::load(
        Some(port),
        Some(dir.path().to_path_buf()),
        Some("warn".to_string()),
        Some("test-secret".to_string()),
        None,
    )
    .unwrap();
    let storage = Arc::new(Storage::new(&config.data_dir).await.unwrap());
    let ctx = Arc::new(AppContext::new(Arc::new(config), storage));

    tokio::spawn(async move {
        rest::start_rest_server(ctx).await.ok();
    });

    // Give the server a moment to bind
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}/api/v1"), dir)
}

fn get_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn register(base: &str, username: &str) -> String {
    let res = reqwest::Client::new()
        .post(format!("{base}/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter22",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_needs_no_auth() {
    let (base, _dir) = start_test_server().await;
    let res = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_login_me_flow() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let token = register(&base, "alice").await;

    let res = client
        .get(format!("{base}/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@example.com");

    // Duplicate username rejected.
    let res = client
        .post(format!("{base}/auth/register"))
        .json(&json!({
            "username": "alice",
            "email": "alice2@example.com",
            "password": "hunter22",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    // Wrong password is an undifferentiated 401.
    let res = client
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": "alice@example.com", "password": "wrong!!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    // Unknown email gets the identical message.
    let res = client
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": "ghost@example.com", "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid email or password");

    let res = client
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": "alice@example.com", "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn task_routes_reject_missing_and_garbage_tokens() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{base}/tasks")).send().await.unwrap();
    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "No token provided, authorization denied");

    let res = client
        .get(format!("{base}/tasks"))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid token, authorization denied");
}

#[tokio::test]
async fn create_then_complete_scenario() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let token = register(&base, "alice").await;

    let res = client
        .post(format!("{base}/tasks"))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Write report",
            "priority": "high",
            "dueDate": "2024-01-01",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["task"]["status"], "todo");
    assert_eq!(body["task"]["completed"], false);
    assert_eq!(body["task"]["priority"], "high");
    let id = body["task"]["id"].as_str().unwrap().to_string();

    let res = client
        .patch(format!("{base}/tasks/{id}/status"))
        .bearer_auth(&token)
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Task marked as completed");
    assert_eq!(body["task"]["completed"], true);
    assert_eq!(body["task"]["completionPercentage"], 100);
    assert!(body["task"]["completionDate"].as_str().is_some());
}

#[tokio::test]
async fn cross_user_delete_is_not_found() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let alice = register(&base, "alice").await;
    let bob = register(&base, "bob").await;

    let res = client
        .post(format!("{base}/tasks"))
        .bearer_auth(&alice)
        .json(&json!({ "title": "private", "dueDate": "2024-01-01" }))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let id = body["task"]["id"].as_str().unwrap().to_string();

    let res = client
        .delete(format!("{base}/tasks/{id}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    // Still retrievable by the owner afterward.
    let res = client
        .get(format!("{base}/tasks/{id}"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn validation_failure_enumerates_fields() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let token = register(&base, "alice").await;

    let res = client
        .post(format!("{base}/tasks"))
        .bearer_auth(&token)
        .json(&json!({ "priority": "urgent", "estimatedHours": 900 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"dueDate"));
    assert!(fields.contains(&"priority"));
    assert!(fields.contains(&"estimatedHours"));
}

#[tokio::test]
async fn list_and_stats_end_to_end() {
    let (base, _dir) = start_test_server().await;
    let client = reqwest::Client::new();
    let token = register(&base, "alice").await;

    for (title, priority) in [("a", "high"), ("b", "critical"), ("c", "low")] {
        let res = client
            .post(format!("{base}/tasks"))
            .bearer_auth(&token)
            .json(&json!({ "title": title, "priority": priority, "dueDate": "2024-01-01" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 201);
    }

    let res = client
        .get(format!("{base}/tasks?priority=high"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["tasks"][0]["title"], "a");

    // Unknown sort field is a 400, not a silent passthrough.
    let res = client
        .get(format!("{base}/tasks?sortBy=ownerId"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = client
        .get(format!("{base}/tasks/stats/overview"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["stats"]["totalTasks"], 3);
    assert_eq!(body["stats"]["highPriority"], 1);
    assert_eq!(body["stats"]["criticalPriority"], 1);
    assert_eq!(body["stats"]["completedTasks"], 0);
    let breakdown = body["statusStats"].as_array().unwrap();
    assert_eq!(breakdown.len(), 1);
    assert_eq!(breakdown[0]["status"], "todo");
    assert_eq!(breakdown[0]["count"], 3);
}
