//! # Push-Relay Core
//!
//! Domain logic for the push-relay webhook gateway: the typed push-event
//! view, tracked-file relevance filtering against the collaborator registry,
//! and dispatch payload construction.
//!
//! The only I/O in this crate is the read-only collaborator-store lookup
//! behind [`RegistryStore`]; everything else is a pure decision over the
//! parsed payload.
//!
//! ## Usage
//!
//! ```rust
//! use push_relay_core::{DispatchPayload, TrackedPattern};
//!
//! let pattern = TrackedPattern::new("**/package.json")?;
//! assert!(pattern.matches("packages/widget/package.json"));
//! # Ok::<(), push_relay_core::PatternError>(())
//! ```

// Public modules
pub mod dispatch;
pub mod events;
pub mod filter;
pub mod registry;

// Re-export commonly used types at crate root for convenience
pub use dispatch::{ClientPayload, DispatchPayload};
pub use events::{Commit, CommitAuthor, EventParseError, PushEvent, Pusher, Repository};
pub use filter::{EventFilter, PatternError, Relevance, SkipReason, TrackedPattern};
pub use registry::{
    HttpRegistryStore, RegistryConfig, RegistryEntry, RegistryError, RegistryStatus, RegistryStore,
};
