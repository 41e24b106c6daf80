//! Command client for the WakeMATE companion server.
//!
//! Sends `{command, params}` bodies to the server address held in the
//! address cache.

pub mod client;
pub mod error;

pub use client::CommandClient;
pub use error::CommandError;
