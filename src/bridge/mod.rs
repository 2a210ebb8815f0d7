//! Message bridge: connection lifecycle, inbound normalization, contact
//! directory, and outbound composition.
//!
//! # Directory access
//!
//! The [`contacts::ContactDirectory`] is the only shared mutable state. It is
//! written solely by the connection task's inbound path and by
//! [`session::BridgeSession::load`], and read by the composer when rendering
//! mentions. It sits behind a `tokio::sync::RwLock` because the runtime is
//! multi-threaded.

pub mod composer;
pub mod connection;
pub mod contacts;
pub mod host;
pub mod media;
pub mod normalize;
pub mod segment;
pub mod session;

pub use connection::{connect, BridgeHandle, ConnectionManager, ConnectionState};

use crate::backend::BackendError;

/// Errors surfaced to callers of the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Forward bundles nested beyond the configured limit.
    #[error("forward nodes nested deeper than {max} levels")]
    ForwardTooDeep {
        /// Configured maximum depth.
        max: usize,
    },

    /// The host asked for an operation this bridge does not offer.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
