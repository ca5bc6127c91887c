//! Carina State Management
//!
//! This crate provides state management for the Carina infrastructure tool.
//! State is the only place where remote identifiers and computed attributes
//! (ids, generated emails, timestamps) survive between runs.
//!
//! # Overview
//!
//! - **StateFile**: The main state structure containing all managed resources
//! - **StateBackend**: A trait for state storage backends
//! - **LockInfo**: Information about state locks for concurrent access control
//!
//! # Example
//!
//! ```ignore
//! use carina_state::{create_backend, BackendConfig};
//!
//! let config = BackendConfig {
//!     backend_type: "local".to_string(),
//!     attributes: [
//!         ("path".to_string(), Value::String("carina.state.json".to_string())),
//!     ].into_iter().collect(),
//! };
//!
//! let backend = create_backend(&config).await?;
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//!
//! // ... apply changes, then record them ...
//!
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

// Re-export main types for convenience
pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
