use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse_core::audit::{create_activity_system, ActivityEvent, ActivityStore, SqliteActivityStore};
use gatehouse_core::notify::{NotificationStore, Notifier, SqliteNotificationStore};
use gatehouse_core::ticket::{QueueStore, SqliteQueueStore};
use gatehouse_core::{
    create_authenticator, load_config, validate_config, Authenticator, QueueService,
};

use gatehouse_server::api::{create_router, WsBroadcaster};
use gatehouse_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for activity event channel
const ACTIVITY_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("GATEHOUSE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);
    info!("Staging zones: {}", config.facility.staging_zones);

    // Compute config hash for the activity log
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Create SQLite stores
    let activity_store: Arc<dyn ActivityStore> = Arc::new(
        SqliteActivityStore::new(&config.database.path)
            .context("Failed to create activity store")?,
    );
    info!("Activity store initialized");

    let queue_store: Arc<dyn QueueStore> = Arc::new(
        SqliteQueueStore::new(&config.database.path).context("Failed to create queue store")?,
    );
    info!("Queue store initialized");

    let notification_store: Arc<dyn NotificationStore> = Arc::new(
        SqliteNotificationStore::new(&config.database.path)
            .context("Failed to create notification store")?,
    );
    info!("Notification store initialized");

    // Create activity log system
    let (activity_handle, activity_writer) =
        create_activity_system(Arc::clone(&activity_store), ACTIVITY_BUFFER_SIZE);

    // Spawn activity writer task
    let writer_handle = tokio::spawn(activity_writer.run());

    // Emit ServiceStarted event
    activity_handle
        .emit(ActivityEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted activity event");

    // Create the queue service and rebuild zone state from the database
    let queue = Arc::new(QueueService::new(
        queue_store,
        activity_handle.clone(),
        Notifier::new(Arc::clone(&notification_store)),
        config.facility.clone(),
    ));
    queue
        .recover()
        .await
        .context("Failed to recover queue state")?;
    info!("Queue service started");

    // Create WebSocket broadcaster for real-time updates
    let ws_broadcaster = WsBroadcaster::default();
    info!("WebSocket broadcaster initialized");

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        queue,
        activity_handle.clone(),
        activity_store,
        notification_store,
        ws_broadcaster,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Emit ServiceStopped event
    info!("Server shutting down...");
    activity_handle
        .emit(ActivityEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // Drop all holders of ActivityHandle so the writer's channel closes.
    // The queue service inside AppState holds a clone, and AppState is
    // already dropped with the router by this point.
    drop(activity_handle);

    // Wait for writer to finish processing remaining events
    let _ = writer_handle.await;
    info!("Activity writer stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
