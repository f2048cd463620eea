pub mod client;
pub mod config;
pub mod dispatcher;
pub mod domains;
pub mod envelope;
pub mod error;
pub mod otp;
pub mod poller;
pub mod resource;
pub mod status;
pub mod storage;

pub use client::{list_from, Endpoints, ResourceClient};
pub use config::{config_dir, ApiConfig, ClientConfig, RefreshConfig};
pub use dispatcher::{Body, Chained, Dispatcher, FormField, Intent};
pub use envelope::Payload;
pub use error::{ApiError, ConfigError, StorageError, TaskError};
pub use otp::{validate_code, Focus, OtpInput, OtpPhase, OtpState, OtpWorkflow, OTP_LEN};
pub use poller::{refresh_resource, spawn_inbox, spawn_refresher, PollerHandle};
pub use resource::{shared_resource, Identified, Resource, SharedResource};
pub use status::{MutationKind, Slot, Status, Ticket, DEFAULT_LANE};
pub use storage::{KeyValueStore, FCM_TOKEN_KEY, TOKEN_KEY};
