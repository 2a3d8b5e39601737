//! hostscope: runtime introspection for live managed host processes
//!
//! This library inspects and edits the object graph of a running host whose
//! layout is only discoverable through reflection. It is built for the
//! behavior trees and finite-state machines that third-party plugins keep
//! inside the host.
//!
//! # Architecture
//!
//! - **Host Layer**: Capability traits the embedding hook implements (type lookup, member access, scene enumeration)
//! - **Reflection Layer**: Typed field/method accessors resolved once and cached
//! - **Graph Layer**: Behavior tree capture, index-path resolution, text dumps and FSM helpers
//! - **Diagnostics**: Dedup-once and cooldown-gated trace logs that never take the host down
//! - **Session**: Per-attachment context owning every cache above

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod graph;
pub mod host;
pub mod reflection;
pub mod scene;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use diagnostics::DiagnosticSink;
pub use graph::{BehaviorGraph, Node, NodeKind, TaskPath};
pub use host::{HostRuntime, HostScene, ObjectRef, Value, Visibility};
pub use reflection::{AccessorResolver, FieldAccessor, MethodAccessor};
pub use session::Session;

/// Result type used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for hostscope
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Host capability error
    #[error("Host error: {0}")]
    Host(#[from] host::HostError),

    /// Member lookup failed at resolution time
    #[error("{kind} '{member}' ({visibility}) not found in type '{owner}'")]
    MemberNotFound {
        /// Full name of the owning type
        owner: String,
        /// Requested member, including the signature for methods
        member: String,
        /// "Field" or "Method"
        kind: &'static str,
        /// Visibility class that was searched
        visibility: Visibility,
    },

    /// An index fell outside its valid bound
    #[error("Index {index} out of range (valid: 0..{len})")]
    IndexOutOfRange {
        /// The rejected index
        index: usize,
        /// Exclusive upper bound
        len: usize,
    },

    /// A typed accessor received a value of another kind
    #[error("Invalid cast: expected {expected}, got {actual}")]
    InvalidCast {
        /// Type requested at the call site
        expected: &'static str,
        /// Kind of the value the host returned
        actual: &'static str,
    },

    /// An instance member was used without an instance
    #[error("'{member}' is an instance member and needs a target object")]
    MissingInstance {
        /// Member name
        member: String,
    },

    /// A static member was used with an instance
    #[error("'{member}' is static and must not be given a target object")]
    UnexpectedInstance {
        /// Member name
        member: String,
    },

    /// Graph traversal error
    #[error("Path error: {0}")]
    Path(#[from] graph::PathError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging for the library
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hostscope=info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();
}
