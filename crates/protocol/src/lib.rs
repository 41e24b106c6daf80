//! Wire contract between WakeMATE clients and the companion server.
//!
//! The companion server listens on port 7777 and exposes two endpoints:
//! `GET /status` for liveness and `POST /` for commands.

pub mod commands;
pub mod constants;
pub mod messages;

// Re-export primary types for convenience.
pub use commands::{Command, CommandError, DeviceTarget, MouseButton};
pub use constants::{DEFAULT_PORT, SERVER_ADDRESS_KEY, command_url, status_url};
pub use messages::{CommandRequest, StatusResponse};
