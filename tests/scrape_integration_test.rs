// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

// End-to-end tests of the HTTP surface against fake scrapers.
// The fakes are /bin/sh scripts, so these only run on unix.
#![cfg(unix)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use vinted_agent::app::{create_router, AppState};
use vinted_agent::models::settings::{InvocationStyle, ScraperConfig};
use vinted_agent::services::scrape::ScrapeService;

struct Harness {
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Build a SQLite file the fake scraper will hand back as its output.
    async fn database(&self, statements: &[&str]) -> PathBuf {
        let path = self.path("fixture.db");
        let mut conn = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();
        for statement in statements {
            sqlx::query(statement).execute(&mut conn).await.unwrap();
        }
        conn.close().await.unwrap();
        path
    }

    /// Router whose scraper is `/bin/sh` running `body`.
    ///
    /// Every run appends its workspace directory to `workspaces.log`.
    fn app(&self, body: &str, style: InvocationStyle, timeout_secs: u64) -> Router {
        let script = self.path("fake_scraper.sh");
        let record = match style {
            InvocationStyle::ExplicitPaths => format!(
                "dirname \"$2\" >> {}\n",
                self.path("workspaces.log").display()
            ),
            InvocationStyle::WorkingDir => {
                format!("pwd -P >> {}\n", self.path("workspaces.log").display())
            }
        };
        std::fs::write(&script, format!("{}{}", record, body)).unwrap();

        let config = ScraperConfig {
            program: "/bin/sh".to_string(),
            args: script.to_string_lossy().into_owned(),
            invocation: style,
            timeout_secs,
            ..ScraperConfig::default()
        };
        create_router(AppState {
            scrape_service: Arc::new(ScrapeService::new(config)),
            cors_allowed_origins: None,
        })
    }

    fn workspaces(&self) -> Vec<PathBuf> {
        std::fs::read_to_string(self.path("workspaces.log"))
            .unwrap_or_default()
            .lines()
            .map(PathBuf::from)
            .collect()
    }

    fn assert_workspaces_removed(&self, expected_runs: usize) {
        let workspaces = self.workspaces();
        assert_eq!(workspaces.len(), expected_runs);
        for workspace in workspaces {
            assert!(
                !workspace.exists(),
                "workspace {} survived the request",
                workspace.display()
            );
        }
    }
}

fn copy_database(fixture: &Path) -> String {
    format!("cp {} \"$4\"\n", fixture.display())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

const PRODUCTS_SCHEMA: &str = "CREATE TABLE products (id INTEGER PRIMARY KEY, user_id TEXT, \
     username TEXT, title TEXT, description TEXT, price REAL, currency TEXT, size TEXT, \
     brand TEXT, condition TEXT, category TEXT, color TEXT, material TEXT, image_urls TEXT)";

#[tokio::test]
async fn test_scrape_returns_products_in_identifier_order() {
    let harness = Harness::new();
    let fixture = harness
        .database(&[
            PRODUCTS_SCHEMA,
            "INSERT INTO products (id, username, title, price, brand, image_urls) \
             VALUES (3, 'alice', 'Linen shirt', 18.0, 'Zara', '[\"https://img.example/3.jpg\"]')",
            "INSERT INTO products (id, username, title, price, size, image_urls) \
             VALUES (1, 'alice', 'Denim jacket', NULL, 'M', 'https://img.example/1a.jpg,https://img.example/1b.jpg')",
            "INSERT INTO products (id, username, title) VALUES (2, 'bob', 'Not alice')",
        ])
        .await;
    let app = harness.app(&copy_database(&fixture), InvocationStyle::ExplicitPaths, 10);

    let (status, body) = get_json(app, "/scrape/alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["count"], 2);

    let products = body["products"].as_array().unwrap();
    assert_eq!(products[0]["id"], "1");
    assert_eq!(products[0]["title"], "Denim jacket");
    assert_eq!(products[0]["price"], 0.0);
    assert_eq!(products[0]["brand"], "");
    assert_eq!(products[0]["currency"], "EUR");
    assert_eq!(products[0]["isSelected"], true);
    assert_eq!(
        products[0]["imageUrls"],
        serde_json::json!(["https://img.example/1a.jpg", "https://img.example/1b.jpg"])
    );
    assert_eq!(products[1]["id"], "3");
    assert_eq!(products[1]["price"], 18.0);
    assert_eq!(products[1]["brand"], "Zara");
    assert_eq!(products[1]["size"], "");

    harness.assert_workspaces_removed(1);
}

#[tokio::test]
async fn test_scrape_user_without_results_is_empty_success() {
    let harness = Harness::new();
    let fixture = harness.database(&[PRODUCTS_SCHEMA]).await;
    let app = harness.app(&copy_database(&fixture), InvocationStyle::ExplicitPaths, 10);

    let (status, body) = get_json(app, "/scrape/nobody").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["products"], serde_json::json!([]));
    assert_eq!(body["count"], 0);
    harness.assert_workspaces_removed(1);
}

#[tokio::test]
async fn test_scrape_without_output_file_is_empty_success() {
    let harness = Harness::new();
    let app = harness.app("exit 0\n", InvocationStyle::ExplicitPaths, 10);

    let (status, body) = get_json(app, "/scrape/alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    harness.assert_workspaces_removed(1);
}

#[tokio::test]
async fn test_scraper_failure_is_500_with_stderr() {
    let harness = Harness::new();
    let app = harness.app(
        "echo 'network error' >&2\nexit 1\n",
        InvocationStyle::ExplicitPaths,
        10,
    );

    let (status, body) = get_json(app, "/scrape/alice").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        serde_json::json!({"success": false, "error": "Scraper failed: network error"})
    );
    harness.assert_workspaces_removed(1);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_scraper_timeout_is_408_and_child_is_killed() {
    let harness = Harness::new();
    let pid_file = harness.path("scraper.pid");
    let app = harness.app(
        &format!("echo $$ > {}\nexec sleep 30\n", pid_file.display()),
        InvocationStyle::ExplicitPaths,
        1,
    );

    let (status, body) = get_json(app, "/scrape/alice").await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Scraping timeout"));
    assert!(body.get("products").is_none());

    let pid = std::fs::read_to_string(&pid_file).unwrap();
    assert!(
        !Path::new(&format!("/proc/{}", pid.trim())).exists(),
        "scraper still running after timeout"
    );
    harness.assert_workspaces_removed(1);
}

#[tokio::test]
async fn test_scrape_is_repeatable() {
    let harness = Harness::new();
    let fixture = harness
        .database(&[
            PRODUCTS_SCHEMA,
            "INSERT INTO products (id, user_id, title, price) VALUES (7, 'alice', 'Belt', '5')",
            "INSERT INTO products (id, user_id, title, price) VALUES (4, 'alice', 'Cap', 'n/a')",
        ])
        .await;
    let app = harness.app(&copy_database(&fixture), InvocationStyle::ExplicitPaths, 10);

    let (_, first) = get_json(app.clone(), "/scrape/alice").await;
    let (_, second) = get_json(app, "/scrape/alice").await;

    assert_eq!(first["products"], second["products"]);
    assert_eq!(first["count"], 2);
    harness.assert_workspaces_removed(2);
}

#[tokio::test]
async fn test_working_dir_invocation_with_data_layout() {
    let harness = Harness::new();
    let fixture = harness
        .database(&[
            "CREATE TABLE Data (ID, User_id, Sold, Gender, Category, subcategory, size, State, \
             Brand, Colors, Price, Image, Images, Description, Title, Platform)",
            "INSERT INTO Data (ID, User_id, Title, Price, State, Image) \
             VALUES (11, 'alice', 'Trench coat', '60.0', 'Good', 'https://img.example/t.jpg')",
        ])
        .await;
    let body = format!(
        "grep -qx alice users.txt || exit 2\ncp {} scraped_data.db\n",
        fixture.display()
    );
    let app = harness.app(&body, InvocationStyle::WorkingDir, 10);

    let (status, body) = get_json(app, "/scrape/alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let product = &body["products"][0];
    assert_eq!(product["id"], "11");
    assert_eq!(product["title"], "Trench coat");
    assert_eq!(product["condition"], "Good");
    assert_eq!(product["price"], 60.0);
    assert_eq!(product["material"], "");
    assert_eq!(
        product["imageUrls"],
        serde_json::json!(["https://img.example/t.jpg"])
    );
    harness.assert_workspaces_removed(1);
}

#[tokio::test]
async fn test_concurrent_requests_use_separate_workspaces() {
    let harness = Harness::new();
    let fixture = harness
        .database(&[
            PRODUCTS_SCHEMA,
            "INSERT INTO products (id, username, title) VALUES (1, 'alice', 'Bag')",
        ])
        .await;
    let app = harness.app(&copy_database(&fixture), InvocationStyle::ExplicitPaths, 10);

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { get_json(app, "/scrape/alice").await })
        })
        .collect();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
    }

    let mut workspaces = harness.workspaces();
    workspaces.sort();
    workspaces.dedup();
    assert_eq!(workspaces.len(), 5);
    harness.assert_workspaces_removed(5);
}
