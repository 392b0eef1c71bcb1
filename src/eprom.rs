//! Sparse EPROM map: `page(0..255) -> 256-byte array`, with paged read/write
//! and wraparound (§3, §4.6).

use std::collections::BTreeMap;

const PAGE_SIZE: usize = 256;

/// A 4-byte download-item record naming a region: `(index, page, length)`.
/// The reply's on-wire layout places `length` before `page` (§4.2's framer
/// rule); this descriptor keeps the natural field order for readability
/// since it's a request-side record, not the wire bytes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadItem {
    pub index: u8,
    pub page: u8,
    pub length: u16,
}

impl DownloadItem {
    pub const fn new(index: u8, page: u8, length: u16) -> Self {
        DownloadItem { index, page, length }
    }
}

/// The well-known EPROM regions requested during enrollment (§4.6).
pub mod catalogue {
    use super::DownloadItem;

    pub const TIME: DownloadItem = DownloadItem::new(0x00, 0x00, 6);
    pub const COMM_DEFAULTS: DownloadItem = DownloadItem::new(0x00, 0x01, 30);
    pub const PHONE_NUMBERS: DownloadItem = DownloadItem::new(0x00, 0x02, 32);
    pub const PIN_CODES: DownloadItem = DownloadItem::new(0x00, 0x03, 96);
    pub const PGM_X10: DownloadItem = DownloadItem::new(0x00, 0x04, 256);
    pub const PARTITIONS: DownloadItem = DownloadItem::new(0x00, 0x05, 96);
    pub const PANEL_FIRMWARE: DownloadItem = DownloadItem::new(0x00, 0x06, 33);
    pub const SERIAL: DownloadItem = DownloadItem::new(0x00, 0x07, 8);
    // Sized for the largest panel (PowerMaster33: 66 zones * 10-byte stride).
    pub const ZONES: DownloadItem = DownloadItem::new(0x00, 0x09, 660);
    pub const KEYFOBS: DownloadItem = DownloadItem::new(0x00, 0x0A, 32);
    pub const ONE_WAY_KEYPADS: DownloadItem = DownloadItem::new(0x00, 0x0B, 32);
    pub const TWO_WAY_KEYPADS: DownloadItem = DownloadItem::new(0x00, 0x0C, 32);
    pub const SIRENS: DownloadItem = DownloadItem::new(0x00, 0x0D, 16);
    pub const X10_NAMES: DownloadItem = DownloadItem::new(0x00, 0x0E, 144);
    // Sized for the largest panel's zone count (66 zones, 16-byte stride).
    pub const ZONE_NAMES: DownloadItem = DownloadItem::new(0x00, 0x10, 1056);
    pub const EVENT_LOG: DownloadItem = DownloadItem::new(0x00, 0x11, 2560);
    pub const ZONE_STRINGS: DownloadItem = DownloadItem::new(0x00, 0x1C, 128);
    pub const CUSTOM_ZONE_NAMES: DownloadItem = DownloadItem::new(0x00, 0x1D, 80);

    // PowerMaster-only regions (§4.6).
    pub const MR_ZONE_NAMES: DownloadItem = DownloadItem::new(0x00, 0x40, 1024);
    pub const MR_PIN_CODES: DownloadItem = DownloadItem::new(0x00, 0x41, 192);
    pub const MR_SIRENS: DownloadItem = DownloadItem::new(0x00, 0x42, 80);
    // Sized for one-way + two-way keypads combined (max 32 + 32, 10-byte stride).
    pub const MR_KEYPADS: DownloadItem = DownloadItem::new(0x00, 0x43, 640);
    pub const MR_ZONES: DownloadItem = DownloadItem::new(0x00, 0x44, 640);
    pub const MR_SIRENS_KEYPADS_ZONES: DownloadItem = DownloadItem::new(0x00, 0x45, 1184);
}

/// Sparse `page -> 256-byte array` store (§3). Missing pages read back as
/// all-0xFF without allocating.
#[derive(Debug, Clone, Default)]
pub struct EpromMap {
    pages: BTreeMap<u8, [u8; PAGE_SIZE]>,
}

impl EpromMap {
    pub fn new() -> Self {
        EpromMap { pages: BTreeMap::new() }
    }

    /// Write `bytes` starting at `(page, index)`, wrapping into the next
    /// page(s) when `index + bytes.len() > 256` (§4.6).
    pub fn write(&mut self, mut page: u8, mut index: usize, bytes: &[u8]) {
        let mut remaining = bytes;
        while !remaining.is_empty() {
            let room = PAGE_SIZE - index;
            let chunk_len = room.min(remaining.len());
            let entry = self.pages.entry(page).or_insert([0xFF; PAGE_SIZE]);
            entry[index..index + chunk_len].copy_from_slice(&remaining[..chunk_len]);
            remaining = &remaining[chunk_len..];
            page = page.wrapping_add(1);
            index = 0;
        }
    }

    /// Read `length` bytes starting at `(page, index)`, spanning pages as
    /// needed; missing pages yield 0xFF fill (§4.6).
    pub fn read(&self, mut page: u8, mut index: usize, length: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(length);
        while out.len() < length {
            let room = PAGE_SIZE - index;
            let want = room.min(length - out.len());
            match self.pages.get(&page) {
                Some(bytes) => out.extend_from_slice(&bytes[index..index + want]),
                None => out.extend(std::iter::repeat(0xFF).take(want)),
            }
            page = page.wrapping_add(1);
            index = 0;
        }
        out
    }

    /// Read a whole [`DownloadItem`] region.
    pub fn read_item(&self, item: DownloadItem) -> Vec<u8> {
        self.read(item.page, item.index as usize, item.length as usize)
    }
}
