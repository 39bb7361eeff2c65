//! Common test utilities for in-process API testing.
//!
//! Builds the full router against a temporary SQLite database so tests
//! exercise the real stores, service and middleware without binding a
//! socket.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use gatehouse_core::audit::{create_activity_system, ActivityStore, SqliteActivityStore};
use gatehouse_core::config::{
    AuthConfig, Config, DatabaseConfig, FacilityConfig, ServerConfig,
};
use gatehouse_core::notify::{NotificationStore, Notifier, SqliteNotificationStore};
use gatehouse_core::ticket::{QueueStore, SqliteQueueStore};
use gatehouse_core::{create_authenticator, AuthMethod, Authenticator, QueueService};

use gatehouse_server::api::{create_router, WsBroadcaster};
use gatehouse_server::state::AppState;

/// Test fixture wrapping an in-process server.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Temporary directory holding the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Knobs for fixture construction.
pub struct TestConfig {
    pub staging_zones: u32,
    pub auth: AuthConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            staging_zones: 2,
            auth: AuthConfig {
                method: AuthMethod::None,
                api_key: None,
            },
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with defaults.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            auth: test_config.auth,
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            facility: FacilityConfig {
                staging_zones: test_config.staging_zones,
                ..Default::default()
            },
        };

        let activity_store: Arc<dyn ActivityStore> = Arc::new(
            SqliteActivityStore::new(&db_path).expect("Failed to create activity store"),
        );
        let queue_store: Arc<dyn QueueStore> = Arc::new(
            SqliteQueueStore::new(&db_path).expect("Failed to create queue store"),
        );
        let notifications: Arc<dyn NotificationStore> = Arc::new(
            SqliteNotificationStore::new(&db_path).expect("Failed to create notification store"),
        );

        let (activity_handle, activity_writer) =
            create_activity_system(Arc::clone(&activity_store), 100);
        tokio::spawn(activity_writer.run());

        let queue = Arc::new(QueueService::new(
            queue_store,
            activity_handle.clone(),
            Notifier::new(Arc::clone(&notifications)),
            config.facility.clone(),
        ));
        queue.recover().await.expect("Failed to recover queue");

        let authenticator: Arc<dyn Authenticator> = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            queue,
            activity_handle,
            activity_store,
            notifications,
            WsBroadcaster::default(),
        ));

        let router = create_router(state);

        Self { router, temp_dir }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a DELETE request with JSON body.
    pub async fn delete_with_body(&self, path: &str, body: Value) -> TestResponse {
        self.request("DELETE", path, Some(body)).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let request = match body {
            Some(json) => {
                request_builder = request_builder.header("Content-Type", "application/json");
                request_builder
                    .body(Body::from(json.to_string()))
                    .unwrap()
            }
            None => request_builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Give the spawned activity writer a moment to drain its channel.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}
