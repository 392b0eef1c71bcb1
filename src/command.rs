//! Command descriptors and queue entries (§3, §4.9).
//!
//! `Command` is the crate's own "named tuple" replacement (§9 design note):
//! one variant per outbound message kind, each knowing how to build its
//! [`CommandDescriptor`] and [`OptionPatch`]es. [`Sender`](crate::sender::Sender)
//! only ever deals in the resolved [`QueueEntry`].

use crate::types;

/// A `(offset, bytes)` patch applied to a copy of a descriptor's bytes
/// before framing (§3). This is how pin codes, zone masks, and EPROM read
/// coordinates get injected into an otherwise-constant command template.
#[derive(Debug, Clone)]
pub struct OptionPatch {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl OptionPatch {
    pub fn new(offset: usize, bytes: Vec<u8>) -> Self {
        OptionPatch { offset, bytes }
    }
}

/// `(bytes, expected_reply?, wait_for_ack, label)` (§3).
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    /// Unframed payload: type byte followed by the fixed body.
    pub bytes: Vec<u8>,
    /// Panel message type the sender should see before the next send is
    /// released, if any.
    pub expected_reply: Option<u8>,
    /// Gate the queue on receipt of a plain ack (type 0x02).
    pub wait_for_ack: bool,
    pub label: &'static str,
}

/// `(command_descriptor, option_patches)` (§3).
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub descriptor: CommandDescriptor,
    pub patches: Vec<OptionPatch>,
}

impl QueueEntry {
    /// Apply the option patches to a copy of the descriptor's bytes,
    /// producing the unframed payload ready for `frame::encode`.
    pub fn resolve(&self) -> Vec<u8> {
        let mut bytes = self.descriptor.bytes.clone();
        for patch in &self.patches {
            let end = patch.offset + patch.bytes.len();
            if end > bytes.len() {
                bytes.resize(end, 0);
            }
            bytes[patch.offset..end].copy_from_slice(&patch.bytes);
        }
        bytes
    }
}

/// One outbound message kind. Each variant knows its own fixed template and
/// patch offsets; `into_queue_entry` resolves it into a [`QueueEntry`].
#[derive(Debug, Clone)]
pub enum Command {
    Exit,
    Init,
    Download { code: [u8; 2] },
    Start,
    Restore,
    SetTime { second: u8, minute: u8, hour: u8, day: u8, month: u8, year_since_2000: u8 },
    Arm { wire_code: u8, pin: [u8; 2] },
    Bypass { pin: [u8; 2], mask: [u8; 4], enable: bool },
    BypassStatusRequest,
    EventLogRequest { pin: [u8; 2] },
    Enroll { code: [u8; 2] },
    KeepAlive,
    StatusRequest,
    EpromRead { index: u8, page: u8, length: u16 },
}

impl Command {
    pub fn into_queue_entry(self) -> QueueEntry {
        match self {
            Command::Exit => QueueEntry {
                descriptor: CommandDescriptor { bytes: vec![types::EXIT], expected_reply: None, wait_for_ack: true, label: "Exit" },
                patches: vec![],
            },
            Command::Init => QueueEntry {
                descriptor: CommandDescriptor { bytes: vec![types::INIT], expected_reply: None, wait_for_ack: true, label: "Init" },
                patches: vec![],
            },
            Command::Download { code } => QueueEntry {
                descriptor: CommandDescriptor {
                    bytes: vec![types::DOWNLOAD, 0x00, 0x00, 0x00, 0x00],
                    expected_reply: Some(types::PANEL_INFO),
                    wait_for_ack: true,
                    label: "Download",
                },
                patches: vec![OptionPatch::new(3, code.to_vec())],
            },
            Command::Start => QueueEntry {
                descriptor: CommandDescriptor { bytes: vec![types::START], expected_reply: None, wait_for_ack: true, label: "Start" },
                patches: vec![],
            },
            Command::Restore => QueueEntry {
                descriptor: CommandDescriptor { bytes: vec![types::RESTORE], expected_reply: Some(types::STATUS), wait_for_ack: true, label: "Restore" },
                patches: vec![],
            },
            Command::SetTime { second, minute, hour, day, month, year_since_2000 } => QueueEntry {
                descriptor: CommandDescriptor {
                    bytes: vec![types::SET_TIME, 0, 0, 0, 0, 0, 0],
                    expected_reply: None,
                    wait_for_ack: true,
                    label: "SetTime",
                },
                patches: vec![OptionPatch::new(1, vec![second, minute, hour, day, month, year_since_2000])],
            },
            Command::Arm { wire_code, pin } => QueueEntry {
                descriptor: CommandDescriptor {
                    bytes: vec![types::ARM, 0, 0, 0, 0, 0],
                    expected_reply: None,
                    wait_for_ack: true,
                    label: "Arm",
                },
                patches: vec![OptionPatch::new(3, vec![wire_code]), OptionPatch::new(4, pin.to_vec())],
            },
            Command::Bypass { pin, mask, enable } => {
                let mask_offset = if enable { 3 } else { 7 };
                QueueEntry {
                    descriptor: CommandDescriptor {
                        bytes: vec![types::BYPASS, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                        expected_reply: None,
                        wait_for_ack: true,
                        label: "Bypass",
                    },
                    patches: vec![OptionPatch::new(1, pin.to_vec()), OptionPatch::new(mask_offset, mask.to_vec())],
                }
            }
            Command::BypassStatusRequest => QueueEntry {
                descriptor: CommandDescriptor {
                    bytes: vec![types::BYPASS_STATUS_REQ],
                    expected_reply: Some(types::STATUS),
                    wait_for_ack: true,
                    label: "BypassStatusRequest",
                },
                patches: vec![],
            },
            Command::EventLogRequest { pin } => QueueEntry {
                descriptor: CommandDescriptor {
                    bytes: vec![types::EVENT_LOG, 0, 0, 0, 0, 0],
                    expected_reply: Some(types::EVENT_LOG),
                    wait_for_ack: true,
                    label: "EventLogRequest",
                },
                patches: vec![OptionPatch::new(4, pin.to_vec())],
            },
            Command::Enroll { code } => QueueEntry {
                descriptor: CommandDescriptor {
                    bytes: vec![types::POWERLINK, 0x0A, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x43],
                    expected_reply: None,
                    wait_for_ack: true,
                    label: "Enroll",
                },
                patches: vec![OptionPatch::new(4, code.to_vec())],
            },
            Command::KeepAlive => QueueEntry {
                descriptor: CommandDescriptor { bytes: vec![types::POWERLINK, 0x03], expected_reply: None, wait_for_ack: true, label: "KeepAlive" },
                patches: vec![],
            },
            Command::StatusRequest => QueueEntry {
                descriptor: CommandDescriptor { bytes: vec![types::STATUS], expected_reply: Some(types::STATUS), wait_for_ack: true, label: "StatusRequest" },
                patches: vec![],
            },
            Command::EpromRead { index, page, length } => {
                let len_bytes = length.to_le_bytes();
                QueueEntry {
                    descriptor: CommandDescriptor {
                        bytes: vec![types::DOWNLOAD_DATA, index, page, len_bytes[0], len_bytes[1]],
                        expected_reply: Some(types::DOWNLOAD_DATA),
                        wait_for_ack: true,
                        label: "EpromRead",
                    },
                    patches: vec![],
                }
            }
        }
    }
}
