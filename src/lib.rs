//! Client-side protocol driver for Visonic PowerMax/PowerMaster alarm
//! control panels: frame reassembly, the Powerlink enrollment handshake,
//! paged EPROM download/decode, and a live mirror of panel state.
//!
//! [`engine::PanelLink`] is the entry point. Feed it bytes from the
//! transport via [`engine::PanelLink::on_bytes`], drive it periodically
//! with [`engine::PanelLink::poll`], and issue commands through its §4.9
//! command surface (`arm`, `bypass`, `get_event_log`, ...).

pub mod codec;
pub mod command;
pub mod config;
pub mod crc;
pub mod decode;
pub mod engine;
pub mod eprom;
pub mod error;
pub mod event;
pub mod frame;
pub mod model;
pub mod sender;
pub mod tables;
pub mod timers;
pub mod transport;
pub mod types;

pub use command::{Command, CommandDescriptor, OptionPatch, QueueEntry};
pub use config::Config;
pub use decode::eprom::Inventory;
pub use engine::PanelLink;
pub use error::{CommandError, DecodeError, FrameError, TransportError};
pub use event::Event;
pub use frame::{FeedOutcome, Framer, RawFrame};
pub use model::{ArmCommand, ArmState, PanelMode, PanelState, Sensor};
pub use transport::Transport;
