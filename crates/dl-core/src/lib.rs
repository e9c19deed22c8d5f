//! dl-core: Core abstractions and configuration for devlink
//!
//! This crate provides the configuration structures, error taxonomy, shared
//! domain types, and the transport/timer traits the connection manager is
//! written against.

pub mod config;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::DlError;
pub use types::{ConnectionId, Endpoint, LinkStatus};
