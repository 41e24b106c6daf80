//! Catalogue of commands understood by the companion server.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::messages::CommandRequest;

/// Errors building a command request.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("MAC address is required for wake operation")]
    MissingMac,
}

/// Mouse button for click commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
        }
    }
}

/// The device a command is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub device_id: String,
    pub ip: String,
}

/// A command for the companion server.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    MouseMove { dx: i32, dy: i32 },
    MouseClick { button: MouseButton },
    MouseScroll { amount: i32 },
    KeyboardInput { text: String },
    KeyboardSpecial { key: String },
    MediaPlayPause,
    MediaNext,
    MediaPrevious,
    VolumeUp,
    VolumeDown,
    VolumeMute,
    Shutdown,
    Restart,
    Sleep,
    Wake { mac: String },
    GetStatus,
}

impl Command {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::MouseMove { .. } => "mouse_move",
            Command::MouseClick { .. } => "mouse_click",
            Command::MouseScroll { .. } => "mouse_scroll",
            Command::KeyboardInput { .. } => "keyboard_input",
            Command::KeyboardSpecial { .. } => "keyboard_special",
            Command::MediaPlayPause => "media_play_pause",
            Command::MediaNext => "media_next",
            Command::MediaPrevious => "media_prev",
            Command::VolumeUp => "volume_up",
            Command::VolumeDown => "volume_down",
            Command::VolumeMute => "volume_mute",
            Command::Shutdown => "shutdown",
            Command::Restart => "restart",
            Command::Sleep => "sleep",
            Command::Wake { .. } => "wake",
            Command::GetStatus => "get_status",
        }
    }

    /// Builds the request body for this command.
    ///
    /// Device commands carry `deviceId` and `targetIp`; `wake` carries
    /// `deviceId` and `mac` instead, since the target is asleep.
    pub fn to_request(&self, target: Option<&DeviceTarget>) -> Result<CommandRequest, CommandError> {
        let mut req = CommandRequest::new(self.name());

        if let Some(t) = target {
            req = req.with_param("deviceId", t.device_id.as_str());
            if !matches!(self, Command::Wake { .. }) {
                req = req.with_param("targetIp", t.ip.as_str());
            }
        }

        req = match self {
            Command::MouseMove { dx, dy } => req.with_param("dx", *dx).with_param("dy", *dy),
            Command::MouseClick { button } => req.with_param("button", button.to_string()),
            Command::MouseScroll { amount } => req.with_param("amount", *amount),
            Command::KeyboardInput { text } => req.with_param("text", text.as_str()),
            Command::KeyboardSpecial { key } => req.with_param("key", key.as_str()),
            Command::Wake { mac } => {
                if mac.trim().is_empty() {
                    return Err(CommandError::MissingMac);
                }
                req.with_param("mac", mac.as_str())
            }
            _ => req,
        };

        Ok(req)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
