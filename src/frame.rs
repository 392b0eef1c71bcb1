//! Frame parsing, encoding, and the incremental byte-stream framer (§4.1, §4.2).
//!
//! Wire format: `0x0D | type | payload… | crc | 0x0A`. The wire never
//! escapes payload bytes — length discipline alone tells the framer where
//! a frame ends, with a documented trailing-0x43 quirk on some
//! fixed-length types (see [`Framer`]).

use std::time::{Duration, Instant};

use crate::crc;
use crate::error::FrameError;
use crate::types;

const PREAMBLE: u8 = 0x0D;
const TERMINATOR: u8 = 0x0A;
const TRAILER_QUIRK: u8 = 0x43;
/// Above this buffer length a failed validation is a real CRC error, not a
/// stray in-payload terminator byte (§4.2 rule 5).
const CRC_ERROR_ESCALATION_LEN: usize = 0xB0;
/// Hard cap on an unrecognised/unbounded frame before it is discarded
/// outright (§4.2 rule 6).
const MAX_BUFFER_LEN: usize = 0xC0;
/// Inter-byte staleness reset used by [`Framer::feed_byte_at`]: a 3s
/// mid-frame timeout once a preamble has been seen.
const INTER_BYTE_TIMEOUT: Duration = Duration::from_secs(3);

/// The standard-mode ack frame, `0D 02 FD 0A` (§6).
pub const ACK_STANDARD: [u8; 4] = [0x0D, 0x02, 0xFD, 0x0A];
/// The Powerlink-mode ack frame, `0D 02 43 BA 0A` — carries the trailing
/// 0x43 quirk inside the CRC-covered interior (§6).
pub const ACK_POWERLINK: [u8; 5] = [0x0D, 0x02, 0x43, 0xBA, 0x0A];

/// Build the ack frame the host writes back after receiving any frame whose
/// type is flagged `ack_required` in [`types::RECV_TABLE`].
pub fn ack_frame(powerlink: bool) -> &'static [u8] {
    if powerlink { &ACK_POWERLINK } else { &ACK_STANDARD }
}

/// A validated frame with the wire envelope stripped: no preamble, CRC, or
/// terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub type_id: u8,
    pub payload: Vec<u8>,
}

impl RawFrame {
    /// Parse a single complete wire frame (including the 0x0D/0x0A markers),
    /// validating CRC. Used by tests and by callers replaying a known-good
    /// byte sequence outside the incremental [`Framer`].
    pub fn parse(wire: &[u8]) -> Result<Self, FrameError> {
        if wire.len() < 4 {
            return Err(FrameError::TooShort { len: wire.len() });
        }
        if wire[0] != PREAMBLE {
            return Err(FrameError::MissingStart { got: wire[0] });
        }
        if wire[wire.len() - 1] != TERMINATOR {
            return Err(FrameError::MissingEnd { got: wire[wire.len() - 1] });
        }
        let interior = &wire[1..wire.len() - 2];
        let expected_crc = wire[wire.len() - 2];
        let computed = crc::compute(interior);
        if computed != expected_crc {
            return Err(FrameError::ChecksumMismatch { expected: expected_crc, computed });
        }
        Ok(RawFrame { type_id: interior[0], payload: interior[1..].to_vec() })
    }

    /// Encode into a complete wire frame: preamble, type, payload, CRC,
    /// terminator.
    pub fn encode(type_id: u8, payload: &[u8]) -> Vec<u8> {
        let mut interior = Vec::with_capacity(1 + payload.len());
        interior.push(type_id);
        interior.extend_from_slice(payload);
        let crc = crc::compute(&interior);

        let mut wire = Vec::with_capacity(interior.len() + 3);
        wire.push(PREAMBLE);
        wire.extend_from_slice(&interior);
        wire.push(crc);
        wire.push(TERMINATOR);
        wire
    }
}

/// Outcome of feeding one byte to the [`Framer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// No complete frame yet.
    Empty,
    /// A frame validated and was emitted.
    Frame(RawFrame),
    /// The buffer was discarded: CRC mismatch (above the escalation length)
    /// or a length-discipline violation (§7 `FrameError`, counted).
    Error(FrameError),
}

/// Incremental single-byte frame assembler (§4.2).
#[derive(Debug, Clone)]
pub struct Framer {
    buf: Vec<u8>,
    /// 0 = unknown/not yet determined.
    expected_len: usize,
    variable_length: bool,
    last_byte_at: Option<Instant>,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    pub fn new() -> Self {
        Framer { buf: Vec::new(), expected_len: 0, variable_length: false, last_byte_at: None }
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.expected_len = 0;
        self.variable_length = false;
    }

    /// Feed a full byte slice, returning every non-empty outcome in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<FeedOutcome> {
        bytes
            .iter()
            .filter_map(|&b| match self.feed_byte(b) {
                FeedOutcome::Empty => None,
                other => Some(other),
            })
            .collect()
    }

    /// Feed one byte with no timestamp tracking — the exact semantics
    /// §8 tests against.
    pub fn feed_byte(&mut self, byte: u8) -> FeedOutcome {
        // Rule 1: resync if the buffer has already grown past what was expected.
        if self.expected_len != 0 && self.buf.len() > self.expected_len {
            self.reset();
        }

        // Rule 2: buffer empty — only a preamble seeds it.
        if self.buf.is_empty() {
            if byte == PREAMBLE {
                self.buf.push(byte);
            }
            return FeedOutcome::Empty;
        }

        // Rule 3: second byte is the message type; look up length/ack/variable.
        if self.buf.len() == 1 {
            self.buf.push(byte);
            match types::lookup(byte) {
                Some(d) if d.variable_length => self.variable_length = true,
                Some(d) => self.expected_len = d.fixed_len,
                None => {}
            }
            return FeedOutcome::Empty;
        }

        self.buf.push(byte);

        // ACK's length is contextual: Standard mode acks with a bare 4-byte
        // `preamble type crc terminator`, Powerlink mode acks carry one extra
        // payload byte (0x43) ahead of the crc, making a 5-byte frame. The
        // third byte tells them apart.
        if self.buf.len() == 3 && self.buf[1] == types::ACK && byte == TRAILER_QUIRK {
            self.expected_len += 1;
        }

        // Rule 4: with the 4th byte in hand, a variable-length type's total
        // frame length is now known.
        if self.buf.len() == 4 && self.variable_length {
            let data_byte = self.buf[3];
            self.expected_len = 7 + data_byte as usize;
        }

        let at_expected_len = self.expected_len != 0 && self.buf.len() == self.expected_len;
        let guessing_terminator = self.expected_len == 0 && byte == TERMINATOR;

        if at_expected_len || guessing_terminator {
            if at_expected_len && byte == TRAILER_QUIRK {
                // Known quirk: a fixed-length frame carries a trailing 0x43
                // before the real terminator.
                self.expected_len += 1;
                return FeedOutcome::Empty;
            }

            match self.validate() {
                Ok(frame) => {
                    self.reset();
                    return FeedOutcome::Frame(frame);
                }
                Err(err) => {
                    if self.buf.len() < CRC_ERROR_ESCALATION_LEN {
                        // Treat the byte we just saw as in-payload data and
                        // keep accumulating.
                        return FeedOutcome::Empty;
                    }
                    self.reset();
                    return FeedOutcome::Error(err);
                }
            }
        }

        // Rule 6: cap unbounded growth.
        if self.buf.len() > MAX_BUFFER_LEN {
            let len = self.buf.len();
            self.reset();
            return FeedOutcome::Error(FrameError::TooShort { len });
        }

        FeedOutcome::Empty
    }

    /// Feed one byte, resetting the in-progress buffer if more than
    /// [`INTER_BYTE_TIMEOUT`] has elapsed since the previous byte while a
    /// preamble has already been seen.
    pub fn feed_byte_at(&mut self, byte: u8, now: Instant) -> FeedOutcome {
        if let Some(last) = self.last_byte_at {
            if !self.buf.is_empty() && now.saturating_duration_since(last) > INTER_BYTE_TIMEOUT {
                self.reset();
            }
        }
        self.last_byte_at = Some(now);
        self.feed_byte(byte)
    }

    fn validate(&self) -> Result<RawFrame, FrameError> {
        RawFrame::parse(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(bytes: &[u8]) -> Vec<FeedOutcome> {
        let mut framer = Framer::new();
        framer.feed(bytes)
    }

    #[test]
    fn encode_then_parse_round_trips() {
        let wire = RawFrame::encode(types::STATUS, &[0x00, 0x04, 0x00, 0x61, 0x03, 0x05, 0x00, 0x05, 0x00, 0x00]);
        let parsed = RawFrame::parse(&wire).unwrap();
        assert_eq!(parsed.type_id, types::STATUS);
    }

    #[test]
    fn standard_ack_literal_validates() {
        let parsed = RawFrame::parse(&ACK_STANDARD).unwrap();
        assert_eq!(parsed.type_id, types::ACK);
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn powerlink_ack_literal_validates_through_trailer_quirk() {
        let mut framer = Framer::new();
        let outcomes = framer.feed(&ACK_POWERLINK);
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            FeedOutcome::Frame(f) => {
                assert_eq!(f.type_id, types::ACK);
                assert_eq!(f.payload, vec![0x43]);
            }
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn happy_path_validation() {
        // spec §8 scenario 1.
        let wire: &[u8] = &[0x0D, 0xA5, 0x00, 0x04, 0x00, 0x61, 0x03, 0x05, 0x00, 0x05, 0x00, 0x00, 0x43, 0xA4, 0x0A];
        let outcomes = feed_all(wire);
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            FeedOutcome::Frame(f) => assert_eq!(f.type_id, types::STATUS),
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn resync_discards_junk_then_emits_next_frame() {
        // spec §8 scenario 2.
        let mut bytes = vec![0xFF, 0xFF, 0xFF];
        bytes.extend_from_slice(&ACK_STANDARD);
        let outcomes = feed_all(&bytes);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(&outcomes[0], FeedOutcome::Frame(f) if f.type_id == types::ACK));
    }

    #[test]
    fn trailer_quirk_extends_fixed_length_frame_by_one() {
        // spec §8 scenario 3: any fixed-length type carrying the 0x43 marker
        // at its expected terminator position.
        let mut framer = Framer::new();
        let outcomes = framer.feed(&ACK_POWERLINK);
        assert!(matches!(&outcomes[0], FeedOutcome::Frame(_)));
    }

    #[test]
    fn unknown_type_without_terminator_match_eventually_hits_the_cap_and_resyncs() {
        // Type 0x99 is not in the receive table, so expected_len stays 0;
        // with no 0x0A byte in the run the buffer just grows until rule 6's
        // cap discards it, after which the next real frame is unaffected.
        let mut bytes = vec![0x0D, 0x99];
        bytes.extend(std::iter::repeat(0x01).take(MAX_BUFFER_LEN + 4));
        bytes.extend_from_slice(&ACK_STANDARD);
        let outcomes = feed_all(&bytes);
        let frames: Vec<_> = outcomes
            .iter()
            .filter_map(|o| match o {
                FeedOutcome::Frame(f) => Some(f.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].type_id, types::ACK);
        assert!(outcomes.iter().any(|o| matches!(o, FeedOutcome::Error(_))));
    }

    #[test]
    fn variable_length_uses_seven_plus_data_byte_formula() {
        // DOWNLOAD_DATA payload layout: [index, length, page, data...].
        let data = [0xAA; 3];
        let mut payload = vec![0x01, data.len() as u8, 0x02];
        payload.extend_from_slice(&data);
        let wire = RawFrame::encode(types::DOWNLOAD_DATA, &payload);
        // total length must equal 7 + data.len()
        assert_eq!(wire.len(), 7 + data.len());
        let outcomes = feed_all(&wire);
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            FeedOutcome::Frame(f) => {
                assert_eq!(f.type_id, types::DOWNLOAD_DATA);
                assert_eq!(f.payload.len(), payload.len());
            }
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn no_byte_belongs_to_two_emitted_frames() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&ACK_STANDARD);
        bytes.extend_from_slice(&ACK_STANDARD);
        bytes.extend_from_slice(&ACK_POWERLINK);
        let outcomes = feed_all(&bytes);
        let frames: Vec<_> = outcomes
            .into_iter()
            .filter_map(|o| match o {
                FeedOutcome::Frame(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn inter_byte_timeout_resets_mid_frame() {
        let mut framer = Framer::new();
        let t0 = Instant::now();
        framer.feed_byte_at(PREAMBLE, t0);
        framer.feed_byte_at(types::ACK, t0);
        // Simulate a long gap before the rest of the frame arrives.
        let t1 = t0 + Duration::from_secs(5);
        let outcome = framer.feed_byte_at(0xFD, t1);
        assert_eq!(outcome, FeedOutcome::Empty);
        // Buffer was reset, so this stray byte is not treated as a CRC byte.
        assert_eq!(framer.buf, Vec::<u8>::new());
    }
}
