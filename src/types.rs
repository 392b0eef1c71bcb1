//! Wire message type-byte constants and the receive-length descriptor table.
//!
//! Visonic's PowerMax/PowerMaster wire protocol reuses the same type byte
//! for a request and its matching reply in several cases (the panel answers
//! `0x3C` with `0x3C`, `0xA5` status polls are answered with `0xA5` status
//! messages, etc). Constants below are grouped by direction for clarity even
//! where the byte value is shared.

/// Plain acknowledgment. No payload. Does not require an ack itself.
pub const ACK: u8 = 0x02;
/// Spacer/filler frame with no semantic content. Does not require an ack.
pub const SPACER: u8 = 0x06;
/// Panel refused the last command (wrong pin, or Powerlink declined).
pub const ACCESS_DENIED: u8 = 0x08;
/// Panel confirms end of a Start/Stop download bracket.
pub const STOP: u8 = 0x0B;
/// Panel says "not ready, retry in N seconds" (download busy).
pub const DOWNLOAD_RETRY: u8 = 0x25;
/// Intermediate acknowledgment sent mid-download-sequence.
pub const DOWNLOAD_BLOCK_ACK: u8 = 0x33;
/// Panel identity/model reply (also used as the Init request's expected
/// reply, and the request byte the host sends for "Download").
pub const PANEL_INFO: u8 = 0x3C;
/// One page-region's worth of EPROM bytes. Shared by the read request
/// (host -> panel, `(index, page, len_lo, len_hi)` — up to 64K, spans
/// pages) and the variable-length data reply (panel -> host, payload
/// `(index, length, page, data...)` — `length` placed right after `index`
/// so the framer's "4th wire byte" rule (§4.2) can size the frame as soon
/// as it is read).
pub const DOWNLOAD_DATA: u8 = 0x3F;
/// Event log record(s). Shared by request and reply.
pub const EVENT_LOG: u8 = 0xA0;
/// Arm/disarm command (host -> panel only).
pub const ARM: u8 = 0xA1;
/// Live status update / status poll. Shared by request and reply.
pub const STATUS: u8 = 0xA5;
/// Panel state-change event notification (panel -> host only).
pub const PANEL_EVENT: u8 = 0xA7;
/// Set-time command (host -> panel only).
pub const SET_TIME: u8 = 0xAC;
/// Powerlink keepalive / enrollment control. Shared by the "I'm Alive"
/// keepalive the host emits and the panel's AB sub-type messages.
pub const POWERLINK: u8 = 0xAB;
/// Bypass set/clear command (host -> panel only).
pub const BYPASS: u8 = 0xAD;
/// Bypass status request (host -> panel only); answered with `STATUS`.
pub const BYPASS_STATUS_REQ: u8 = 0xAE;
/// PowerMaster extended command/reply envelope.
pub const POWERMASTER: u8 = 0xB0;
/// Filler frame exempt from the CRC-error counter.
pub const SPACER_F1: u8 = 0xF1;

/// Exit download/config mode (host -> panel only).
pub const EXIT: u8 = 0x0F;
/// Initial "hello" sent right after connect (host -> panel only).
pub const INIT: u8 = 0x00;
/// Begin a Powerlink download session; payload carries the 2-byte download
/// code. Expects a `PANEL_INFO` reply.
pub const DOWNLOAD: u8 = 0x24;
/// Bracket-open for an EPROM read burst (host -> panel only).
pub const START: u8 = 0x0A;
/// Restore/re-sync request sent after (re-)entering Powerlink, or by the
/// watchdog (host -> panel only).
pub const RESTORE: u8 = 0xA6;

/// A row of the receive-side framer length table (§4.2).
#[derive(Debug, Clone, Copy)]
pub struct RecvDescriptor {
    pub type_id: u8,
    /// Fixed payload length including the type byte, excluding preamble/
    /// CRC/terminator; 0 if variable-length.
    pub fixed_len: usize,
    pub variable_length: bool,
    pub ack_required: bool,
}

/// Receive-side type table (§6: "Receive types needing ack" / "not needing
/// ack" / "Variable-length: 0x3F").
///
/// `fixed_len` is the *total* wire frame length (preamble through
/// terminator, inclusive) for fixed-length types; 0 for the variable type.
pub const RECV_TABLE: &[RecvDescriptor] = &[
    RecvDescriptor { type_id: ACK, fixed_len: 4, variable_length: false, ack_required: false },
    RecvDescriptor { type_id: SPACER, fixed_len: 4, variable_length: false, ack_required: false },
    RecvDescriptor { type_id: ACCESS_DENIED, fixed_len: 5, variable_length: false, ack_required: true },
    RecvDescriptor { type_id: STOP, fixed_len: 4, variable_length: false, ack_required: true },
    RecvDescriptor { type_id: DOWNLOAD_RETRY, fixed_len: 5, variable_length: false, ack_required: true },
    RecvDescriptor { type_id: DOWNLOAD_BLOCK_ACK, fixed_len: 4, variable_length: false, ack_required: true },
    RecvDescriptor { type_id: PANEL_INFO, fixed_len: 10, variable_length: false, ack_required: true },
    RecvDescriptor { type_id: DOWNLOAD_DATA, fixed_len: 0, variable_length: true, ack_required: true },
    RecvDescriptor { type_id: EVENT_LOG, fixed_len: 15, variable_length: false, ack_required: true },
    RecvDescriptor { type_id: STATUS, fixed_len: 15, variable_length: false, ack_required: true },
    RecvDescriptor { type_id: PANEL_EVENT, fixed_len: 11, variable_length: false, ack_required: true },
    RecvDescriptor { type_id: POWERLINK, fixed_len: 14, variable_length: false, ack_required: true },
    RecvDescriptor { type_id: POWERMASTER, fixed_len: 15, variable_length: false, ack_required: true },
    RecvDescriptor { type_id: SPACER_F1, fixed_len: 4, variable_length: false, ack_required: false },
];

/// Look up a receive descriptor by type byte.
pub fn lookup(type_id: u8) -> Option<&'static RecvDescriptor> {
    RECV_TABLE.iter().find(|d| d.type_id == type_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_data_is_variable() {
        let d = lookup(DOWNLOAD_DATA).unwrap();
        assert!(d.variable_length);
    }

    #[test]
    fn ack_and_spacer_need_no_ack() {
        assert!(!lookup(ACK).unwrap().ack_required);
        assert!(!lookup(SPACER).unwrap().ack_required);
        assert!(!lookup(SPACER_F1).unwrap().ack_required);
    }

    #[test]
    fn status_needs_ack() {
        assert!(lookup(STATUS).unwrap().ack_required);
    }
}
