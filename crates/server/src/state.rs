use std::sync::Arc;

use gatehouse_core::audit::{ActivityHandle, ActivityStore};
use gatehouse_core::notify::NotificationStore;
use gatehouse_core::queue::QueueService;
use gatehouse_core::{Authenticator, Config, SanitizedConfig};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    queue: Arc<QueueService>,
    activity_handle: ActivityHandle,
    activity_store: Arc<dyn ActivityStore>,
    notifications: Arc<dyn NotificationStore>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        queue: Arc<QueueService>,
        activity_handle: ActivityHandle,
        activity_store: Arc<dyn ActivityStore>,
        notifications: Arc<dyn NotificationStore>,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            authenticator,
            queue,
            activity_handle,
            activity_store,
            notifications,
            ws_broadcaster,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn queue(&self) -> &QueueService {
        &self.queue
    }

    #[allow(dead_code)]
    pub fn activity_handle(&self) -> &ActivityHandle {
        &self.activity_handle
    }

    pub fn activity_store(&self) -> &dyn ActivityStore {
        self.activity_store.as_ref()
    }

    pub fn notifications(&self) -> &dyn NotificationStore {
        self.notifications.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
