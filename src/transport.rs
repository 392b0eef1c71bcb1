//! The host-owned transport collaborator (§6).
//!
//! An injected trait rather than an owned `TcpStream`: the transport
//! (serial or TCP) is an external collaborator the core never owns.

use crate::error::TransportError;

/// A full-duplex, order-preserving byte transport (serial 9600 8N1, or
/// TCP). The core only ever calls `write_bytes`; receiving is the host's
/// responsibility, delivered back in via
/// [`crate::engine::PanelLink::on_bytes`].
pub trait Transport {
    /// Write bytes to the wire. Must not block past the caller's own I/O
    /// budget; errors here end the session (§5 "Cancellation").
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}
