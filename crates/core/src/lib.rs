pub mod audit;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod notify;
pub mod queue;
pub mod ticket;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use queue::{QueueError, QueueService};
