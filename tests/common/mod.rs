#![allow(dead_code)]

use serde_json::{json, Value};
use tempfile::TempDir;

use registrar::config::Config;
use registrar::routes;
use registrar::state::AppState;

/// Boot the full router on an ephemeral port backed by a scratch data dir.
/// The TempDir guard must outlive the test.
pub async fn spawn_app() -> (String, TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.database.path = Some(tmp.path().join("registrar.db"));
    config.storage.path = Some(tmp.path().join("uploads"));
    std::fs::create_dir_all(config.uploads_path()).unwrap();

    let pool = registrar::db::create_pool(config.db_path()).unwrap();
    registrar::db::run_migrations(&pool).unwrap();

    let state = AppState { db: pool, config };
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), tmp)
}

/// Register a user with the given role and log in, returning the bearer token.
pub async fn register_and_login(
    client: &reqwest::Client,
    base: &str,
    username: &str,
    role: &str,
) -> String {
    let response = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@school.example"),
            "name": username,
            "role": role,
            "password": "pw123456",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "register {username}");

    let response = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "username": username, "password": "pw123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "login {username}");

    let token: Value = response.json().await.unwrap();
    token["access_token"].as_str().unwrap().to_string()
}

/// Create a school year as admin, returning its id.
pub async fn create_school_year(
    client: &reqwest::Client,
    base: &str,
    token: &str,
    year: &str,
) -> String {
    let response = client
        .post(format!("{base}/api/school-years"))
        .bearer_auth(token)
        .json(&json!({
            "year": year,
            "start_date": "2024-04-01",
            "end_date": "2025-03-31",
            "is_current": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "create school year");
    let year: Value = response.json().await.unwrap();
    year["id"].as_str().unwrap().to_string()
}

/// Create a class in the given school year, returning its id.
pub async fn create_class(
    client: &reqwest::Client,
    base: &str,
    token: &str,
    name: &str,
    numeric: i64,
    school_year_id: &str,
) -> String {
    let response = client
        .post(format!("{base}/api/classes"))
        .bearer_auth(token)
        .json(&json!({
            "name": name,
            "numeric": numeric,
            "school_year_id": school_year_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "create class");
    let class: Value = response.json().await.unwrap();
    class["id"].as_str().unwrap().to_string()
}
