//! Configuration management
//!
//! - **path**: dotted keys and nested-mapping traversal
//! - **store**: `ConfigStore`, current document over read-only defaults
//! - **listeners**: change notification
//! - **storage**: where the current document is persisted

pub mod error;
pub mod listeners;
pub mod path;
pub mod storage;
pub mod store;

pub use error::{ConfigError, ListenerFailure, PersistenceError, Result, ValidationError};
pub use listeners::{ChangeEvent, ListenerId, ListenerScope};
pub use path::ConfigPath;
pub use storage::{DocumentStorage, JsonFileStorage, MemoryStorage, load_defaults};
pub use store::{ConfigStore, ToConfigPath};
