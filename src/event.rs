//! Host-visible occurrences (§6 "Event callbacks").
//!
//! Three distinct callback shapes are called for — a per-sensor update
//! stream, a panel-state snapshot accessor, and a disconnect relay — plus
//! the decode-local/auth/comm errors from §7 that are "logged" rather than
//! returned. All of these funnel through one `FnMut(Event)` sink
//! (`PanelLink::set_event_sink`) carrying decoded domain events instead of
//! raw envelopes.

use crate::error::{DecodeError, FrameError};
use crate::model::EventLogRecord;

/// One occurrence delivered to the host's event sink.
#[derive(Debug, Clone)]
pub enum Event {
    /// A zone's sensor record changed since the last snapshot (§4.9
    /// `GetSensorChanges`). The host reads the new record via `get_sensor`.
    SensorChanged(usize),
    /// The panel-state snapshot changed (mode, arm state, flags, ...).
    StateChanged,
    /// Access-Denied tied to a command frame (opcodes 0xA0..0xAF): wrong
    /// pin (§7 `AuthError` policy).
    WrongPin,
    /// The CRC-error counter advanced; carries the new total. Crossing the
    /// configured threshold also triggers `CommException` internally.
    CommException(u32),
    /// The handshake state machine re-entered `CommException` (§4.5).
    CommExceptionThresholdExceeded,
    /// The transport ended the session (§5 "Cancellation").
    Disconnected,
    /// A validated frame failed to decode; the frame is otherwise dropped
    /// (§7 policy: recovered silently, logged here).
    DecodeError(DecodeError),
    /// A byte sequence failed frame validation; counted towards
    /// `CommException` unless it was a `0xF1` filler.
    FrameError(FrameError),
    /// AB sub-type 10 action 0 offered a new download code. Logged only;
    /// not auto-adopted (§9 Open Question c).
    DownloadCodeOffered([u8; 2]),
    /// A new event-log record was appended (§4.8, A0).
    EventLogRecord(EventLogRecord),
}
