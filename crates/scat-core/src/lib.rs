//! SCAT Core
//!
//! Editing sessions and the project lifecycle around the SCAT record.
//!
//! # Architecture
//!
//! ```text
//! UI events ──> RecordHandle ──> EditingSession ──> PersistenceGateway
//!                                     │ autosave tick
//! ProjectLifecycleStore ──> KeyValueStore (active / trash lists)
//! ```
//!
//! - [`EditingSession`]: load, autosave, save, retry and exit a saved project
//! - [`ProjectLifecycleStore`]: create, trash, restore and purge projects
//! - [`PersistenceGateway`] and [`Confirmation`]: async seams to the outside
//! - [`ScatConfig`]: TOML configuration

#![warn(unreachable_pub)]

pub mod config;
pub mod confirm;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod session;

pub use config::ScatConfig;
pub use confirm::{Confirmation, ConfirmationRequest, FixedConfirmation, Outcome};
pub use error::{ConfigError, GatewayError, LifecycleError, SessionError, StorageError};
pub use gateway::{PersistenceGateway, SaveAck};
pub use lifecycle::{
    JsonFileStore, KeyValueStore, LocalGateway, MemoryKeyValueStore, ProjectLifecycleStore,
    ProjectQuery, ProjectSort, StorageKeys,
};
pub use session::{
    EditingSession, EditingSessionInfo, SaveOutcome, SaveTrigger, SessionConfig, SessionEvent,
    SessionStatus,
};

/// Re-exported record and catalog crates
pub use scat_catalog as catalog;
pub use scat_record as record;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
