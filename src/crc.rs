//! 8-bit additive-complement checksum (§4.1).
//!
//! `crc = 0xFF - (sum(bytes) mod 0xFF)`, with the computed value 0xFF
//! remapped to 0x00. Accumulates a streaming sum so the framer never has to
//! re-walk the buffer to validate a candidate frame.

/// Streaming accumulator for the additive-complement checksum.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc {
    sum: u32,
}

impl Crc {
    pub fn new() -> Self {
        Self { sum: 0 }
    }

    pub fn update(&mut self, byte: u8) {
        self.sum += byte as u32;
    }

    pub fn update_all(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.update(b);
        }
    }

    /// Finalize into the wire checksum byte.
    pub fn finish(self) -> u8 {
        let mod_sum = (self.sum % 0xFF) as u8;
        let crc = 0xFFu8.wrapping_sub(mod_sum);
        if crc == 0xFF { 0x00 } else { crc }
    }
}

/// Compute the checksum over a complete byte slice in one call.
pub fn compute(bytes: &[u8]) -> u8 {
    let mut crc = Crc::new();
    crc.update_all(bytes);
    crc.finish()
}
