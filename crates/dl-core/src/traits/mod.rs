//! Core trait definitions

mod transport;

pub use transport::{Connector, Scheduler, TimerHandle, TransportEvent, TransportHandle};
