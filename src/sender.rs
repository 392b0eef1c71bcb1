//! Single-producer send queue with rate limiting, ack-wait, and
//! expected-reply tracking (§4.3).
//!
//! Writes go through the injected [`crate::transport::Transport`] rather
//! than an owned socket. The mutex discipline from §5 is applied by the
//! caller ([`crate::engine::PanelLink`]), which holds one `Mutex` around
//! every `Sender` method that touches queue state.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::command::QueueEntry;
use crate::frame::RawFrame;
use crate::transport::Transport;

/// Minimum inter-message spacing (§4.3, §5).
pub const MIN_SEND_SPACING: Duration = Duration::from_millis(500);

/// FIFO of queue entries plus the release-gating state (§4.3).
#[derive(Default)]
pub struct Sender {
    queue: VecDeque<QueueEntry>,
    waiting_for_ack: bool,
    expected_responses: Vec<u8>,
    last_sent_at: Option<Instant>,
    /// Tracked per §4.3 ("send-attempt retry count is tracked but not used
    /// to automatically resend") — exposed for diagnostics only.
    attempts: u32,
}

impl Sender {
    pub fn new() -> Self {
        Sender { queue: VecDeque::new(), waiting_for_ack: false, expected_responses: Vec::new(), last_sent_at: None, attempts: 0 }
    }

    /// Enqueue a command, skipping it if it is byte-identical to the
    /// current queue tail, so a watchdog restart doesn't double-stack an
    /// identical pending Restore.
    pub fn enqueue(&mut self, entry: QueueEntry) {
        if let Some(tail) = self.queue.back() {
            if tail.descriptor.label == entry.descriptor.label && tail.resolve() == entry.resolve() {
                return;
            }
        }
        self.queue.push_back(entry);
    }

    /// Drop every queued entry and release state (§4.3 "Clearing the queue
    /// resets the FIFO and the last-sent reference"; also used by the
    /// watchdog and `CommException` recovery in §4.5).
    pub fn clear(&mut self) {
        self.queue.clear();
        self.waiting_for_ack = false;
        self.expected_responses.clear();
        self.last_sent_at = None;
    }

    pub fn is_waiting_for_ack(&self) -> bool {
        self.waiting_for_ack
    }

    pub fn expected_responses(&self) -> &[u8] {
        &self.expected_responses
    }

    /// Clear the ack-wait flag; called when a plain ack (0x02) is received.
    pub fn ack_received(&mut self) {
        self.waiting_for_ack = false;
    }

    /// Remove one outstanding expected-reply entry matching `type_id`, if
    /// present; called when a frame of that type is received.
    pub fn reply_received(&mut self, type_id: u8) {
        if let Some(pos) = self.expected_responses.iter().position(|&t| t == type_id) {
            self.expected_responses.remove(pos);
        }
    }

    fn eligible(&self, now: Instant) -> bool {
        if self.waiting_for_ack || !self.expected_responses.is_empty() {
            return false;
        }
        match self.last_sent_at {
            Some(last) => now.saturating_duration_since(last) >= MIN_SEND_SPACING,
            None => true,
        }
    }

    /// Release the head of the queue, if eligible, by writing it to the
    /// transport (§4.3). Returns whether something was sent.
    pub fn tick(&mut self, now: Instant, transport: &mut dyn Transport) -> bool {
        if !self.eligible(now) {
            return false;
        }
        let Some(entry) = self.queue.pop_front() else {
            return false;
        };

        let bytes = entry.resolve();
        let type_id = bytes[0];
        let wire = RawFrame::encode(type_id, &bytes[1..]);

        self.attempts += 1;
        self.waiting_for_ack = entry.descriptor.wait_for_ack;
        if let Some(reply) = entry.descriptor.expected_reply {
            self.expected_responses.push(reply);
        }
        self.last_sent_at = Some(now);

        let _ = transport.write_bytes(&wire);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::error::TransportError;

    struct RecordingTransport {
        written: Vec<Vec<u8>>,
    }
    impl Transport for RecordingTransport {
        fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            self.written.push(bytes.to_vec());
            Ok(())
        }
    }

    #[test]
    fn first_send_has_no_spacing_requirement() {
        let mut sender = Sender::new();
        sender.enqueue(Command::Exit.into_queue_entry());
        let mut transport = RecordingTransport { written: vec![] };
        assert!(sender.tick(Instant::now(), &mut transport));
        assert_eq!(transport.written.len(), 1);
    }

    #[test]
    fn second_send_is_gated_by_minimum_spacing() {
        let mut sender = Sender::new();
        sender.enqueue(Command::Exit.into_queue_entry());
        sender.enqueue(Command::Init.into_queue_entry());
        let mut transport = RecordingTransport { written: vec![] };
        let t0 = Instant::now();
        assert!(sender.tick(t0, &mut transport));
        // Exit has wait_for_ack = true, so the next tick is also blocked on
        // the ack regardless of spacing.
        sender.ack_received();
        assert!(!sender.tick(t0 + Duration::from_millis(100), &mut transport));
        assert!(sender.tick(t0 + Duration::from_millis(600), &mut transport));
        assert_eq!(transport.written.len(), 2);
    }

    #[test]
    fn waiting_for_ack_blocks_release_until_cleared() {
        let mut sender = Sender::new();
        sender.enqueue(Command::Exit.into_queue_entry());
        sender.enqueue(Command::Init.into_queue_entry());
        let mut transport = RecordingTransport { written: vec![] };
        let t0 = Instant::now();
        sender.tick(t0, &mut transport);
        assert!(sender.is_waiting_for_ack());
        assert!(!sender.tick(t0 + Duration::from_secs(1), &mut transport));
        sender.ack_received();
        assert!(sender.tick(t0 + Duration::from_secs(1), &mut transport));
    }

    #[test]
    fn expected_reply_blocks_release_until_seen() {
        let mut sender = Sender::new();
        sender.enqueue(Command::Download { code: [0x56, 0x50] }.into_queue_entry());
        sender.enqueue(Command::Start.into_queue_entry());
        let mut transport = RecordingTransport { written: vec![] };
        let t0 = Instant::now();
        sender.tick(t0, &mut transport);
        sender.ack_received();
        assert!(!sender.tick(t0 + Duration::from_secs(1), &mut transport));
        sender.reply_received(crate::types::PANEL_INFO);
        assert!(sender.tick(t0 + Duration::from_secs(1), &mut transport));
    }

    #[test]
    fn duplicate_tail_entry_is_not_double_enqueued() {
        let mut sender = Sender::new();
        sender.enqueue(Command::Restore.into_queue_entry());
        sender.enqueue(Command::Restore.into_queue_entry());
        let mut transport = RecordingTransport { written: vec![] };
        let t0 = Instant::now();
        sender.tick(t0, &mut transport);
        sender.ack_received();
        sender.reply_received(crate::types::STATUS);
        assert!(!sender.tick(t0 + Duration::from_secs(1), &mut transport));
        assert!(sender.is_empty());
    }

    #[test]
    fn clear_resets_all_gating_state() {
        let mut sender = Sender::new();
        sender.enqueue(Command::Download { code: [0x56, 0x50] }.into_queue_entry());
        let mut transport = RecordingTransport { written: vec![] };
        sender.tick(Instant::now(), &mut transport);
        sender.clear();
        assert!(!sender.is_waiting_for_ack());
        assert!(sender.expected_responses().is_empty());
        assert!(sender.is_empty());
    }
}
