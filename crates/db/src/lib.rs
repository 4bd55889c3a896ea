pub mod connection;
pub mod coordinator;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use coordinator::{TransitionCoordinator, DEFAULT_MAX_ATTEMPTS};
pub use repositories::{
    InMemoryEntityStateStore, RecordingDispatcher, RepositoryError, SqlEntityStateStore,
};
