//! Error types for wire parsing, decoding, and the command surface.
//!
//! Split along §7's error kinds: [`FrameError`] and [`DecodeError`] are
//! data-shape problems (thiserror, field-carrying for diagnostics);
//! [`CommandError`] is a synchronous rejection of a command by
//! configuration; [`TransportError`] wraps the host's transport I/O.

use thiserror::Error;

/// Errors raised while assembling or validating a frame (§4.1, §4.2).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short ({len} bytes, minimum 4)")]
    TooShort { len: usize },

    #[error("missing start marker (expected 0x0D, got 0x{got:02X})")]
    MissingStart { got: u8 },

    #[error("missing end marker (expected 0x0A, got 0x{got:02X})")]
    MissingEnd { got: u8 },

    #[error("checksum mismatch (expected 0x{expected:02X}, computed 0x{computed:02X})")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("unknown message type 0x{type_id:02X}")]
    UnknownType { type_id: u8 },
}

/// Errors raised while decoding a validated frame's payload into a typed
/// message (§4.7, §4.8). Always recovered silently per §7 policy: logged via
/// [`crate::event::Event::DecodeError`] and the frame is otherwise ignored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload too short for {msg}: need {need} bytes, got {got}")]
    PayloadTooShort { msg: &'static str, need: usize, got: usize },

    #[error("unknown sub-type 0x{sub_type:02X} for {msg}")]
    UnknownSubType { msg: &'static str, sub_type: u8 },

    #[error("unknown zone index {zone} (not present in current inventory)")]
    UnknownZone { zone: usize },

    #[error("invalid string payload: not valid UTF-8/ASCII")]
    InvalidString,
}

/// Synchronous rejection of a user command by configuration or state
/// (spec §7's `ConfigError`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("remote arm is disabled in configuration")]
    RemoteArmDisabled,

    #[error("sensor bypass is disabled (EPROM bypass-off flag set, or not in Powerlink)")]
    BypassDisabled,

    #[error("a pin is required: none supplied, no override configured, and no EPROM pin available")]
    PinRequired,

    #[error("zone {zone} is not a known sensor")]
    UnknownZone { zone: usize },

    #[error("arm state {0:?} is not valid for this command")]
    InvalidArmState(crate::model::ArmCommand),
}

/// Errors from the host-supplied [`crate::transport::Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport closed")]
    Closed,
}

pub type FrameResult<T> = Result<T, FrameError>;
pub type DecodeResult<T> = Result<T, DecodeError>;
pub type CommandResult<T> = Result<T, CommandError>;
