//! wxbridge: bridges a MimicWX chat backend to a host event bus.
//!
//! The backend is reached over REST plus one WebSocket stream. Inbound
//! frames become canonical message events; host sends are decomposed into
//! ordered backend calls.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;

pub mod backend;
pub mod bridge;
