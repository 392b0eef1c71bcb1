//! `PanelLink`: the handshake/download state machine (§4.5) plus the command
//! surface (§4.9), wired around the [`crate::sender::Sender`],
//! [`crate::frame::Framer`], and [`crate::eprom::EpromMap`].
//!
//! One stateful struct rather than free sequence functions: Visonic's
//! handshake is driven by asynchronous pushes from the panel, so there is
//! no blocking `send_recv` to build sequence functions around. `on_bytes`
//! is the one entry point driving everything — frame reassembly, dispatch,
//! and state transitions all happen inline, matching §5's "decoders must
//! finish before the next frame is pulled from the transport".

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::command::Command;
use crate::config::Config;
use crate::decode::eprom::{decode_eprom, Inventory};
use crate::decode::live::{EventLogMessage, FullStatus, LiveEffect, PanelEvent, PowerMasterMessage, PowerlinkMessage, TamperMasks, ZoneStatusMasks};
use crate::eprom::{catalogue, DownloadItem, EpromMap};
use crate::error::CommandError;
use crate::event::Event;
use crate::frame::{ack_frame, FeedOutcome, Framer, RawFrame};
use crate::model::{ArmCommand, EventLogRecord, PanelMode, PanelState, Sensor};
use crate::sender::Sender;
use crate::timers::{DownloadBackoff, Tick, Watchdog};
use crate::transport::Transport;
use crate::types;

/// Threshold at which a run of CRC errors escalates to `CommException`
/// (§4.5, §7; default 5).
const COMM_EXCEPTION_THRESHOLD: u32 = 5;

/// Internal handshake states (§4.5), more granular than the public
/// [`PanelMode`] projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    Starting,
    Init,
    Downloading,
    AwaitingPanelInfo,
    ReadingEprom,
    Enrolled,
    Standard,
    CommException,
}

/// Well-known EPROM regions requested after Panel-Info, batched in order
/// (§4.5: "issue a batch of EPROM read requests").
fn eprom_read_batch(powermaster: bool) -> Vec<DownloadItem> {
    let mut items = vec![
        catalogue::PANEL_FIRMWARE,
        catalogue::SERIAL,
        catalogue::ZONE_NAMES,
        catalogue::PHONE_NUMBERS,
        catalogue::COMM_DEFAULTS,
        catalogue::PIN_CODES,
        catalogue::PARTITIONS,
        catalogue::ZONES,
        catalogue::PGM_X10,
        catalogue::ONE_WAY_KEYPADS,
        catalogue::TWO_WAY_KEYPADS,
        catalogue::SIRENS,
        catalogue::KEYFOBS,
        catalogue::X10_NAMES,
        catalogue::ZONE_STRINGS,
        catalogue::CUSTOM_ZONE_NAMES,
    ];
    if powermaster {
        items.extend([
            catalogue::MR_ZONE_NAMES,
            catalogue::MR_PIN_CODES,
            catalogue::MR_SIRENS,
            catalogue::MR_KEYPADS,
            catalogue::MR_ZONES,
            catalogue::MR_SIRENS_KEYPADS_ZONES,
        ]);
    }
    items
}

/// The driver. Owns the framer, sender, EPROM map, timers, and the
/// published inventory/state; exposes `on_bytes` (the §6 "deliver-bytes"
/// callback contract) and the §4.9 command surface.
pub struct PanelLink {
    config: Config,
    framer: Framer,
    sender: Sender,
    eprom: EpromMap,
    handshake: HandshakeState,
    panel_type_nr: u8,
    powermaster: bool,
    inventory: Inventory,
    state: PanelState,
    tick: Tick,
    watchdog: Watchdog,
    backoff: DownloadBackoff,
    crc_errors: u32,
    auto_enrolled_this_session: bool,
    last_command_label: Option<&'static str>,
    last_command_type: Option<u8>,
    event_log: BTreeMap<u32, EventLogRecord>,
    event_log_expected_count: Option<u32>,
    sensor_snapshot: Vec<Sensor>,
    event_sink: Option<Box<dyn FnMut(Event) + Send>>,
}

impl PanelLink {
    pub fn new(config: Config) -> Self {
        PanelLink {
            config,
            framer: Framer::new(),
            sender: Sender::new(),
            eprom: EpromMap::new(),
            handshake: HandshakeState::Starting,
            panel_type_nr: 0,
            powermaster: false,
            inventory: Inventory::default(),
            state: PanelState::default(),
            tick: Tick::new(),
            watchdog: Watchdog::new(Duration::from_secs(60)),
            backoff: DownloadBackoff::new(),
            crc_errors: 0,
            auto_enrolled_this_session: false,
            last_command_label: None,
            last_command_type: None,
            event_log: BTreeMap::new(),
            event_log_expected_count: None,
            sensor_snapshot: Vec::new(),
            event_sink: None,
        }
    }

    pub fn set_event_sink(&mut self, sink: impl FnMut(Event) + Send + 'static) {
        self.event_sink = Some(Box::new(sink));
    }

    fn emit(&mut self, event: Event) {
        if let Some(sink) = self.event_sink.as_mut() {
            sink(event);
        }
    }

    /// Begin the session: send Exit, Init, arm the Powerlink watchdog, and
    /// either enqueue Download or (if `force_standard`) skip straight to
    /// Standard mode (§4.5 "Entry").
    pub fn start(&mut self, now: Instant, transport: &mut dyn Transport) {
        self.handshake = HandshakeState::Init;
        self.enqueue(Command::Exit);
        self.enqueue(Command::Init);
        self.watchdog.arm(now);
        self.tick.start(now);

        if self.config.force_standard {
            self.state.mode = PanelMode::Standard;
            self.handshake = HandshakeState::Standard;
            self.run_eprom_decode();
            self.enqueue(Command::StatusRequest);
        } else {
            self.handshake = HandshakeState::Downloading;
            self.enqueue(Command::Download { code: crate::config::DEFAULT_DOWNLOAD_CODE });
        }
        self.sender.tick(now, transport);
    }

    fn enqueue(&mut self, command: Command) {
        let entry = command.into_queue_entry();
        self.last_command_label = Some(entry.descriptor.label);
        self.last_command_type = entry.descriptor.bytes.first().copied();
        self.sender.enqueue(entry);
    }

    /// Drive the queue, the tick/idle keep-alive, the Powerlink watchdog,
    /// and the download-retry backoff. Call on every scheduler wakeup
    /// (≈ every tick interval); matches §4.4's "every tick also nudges the
    /// sender".
    pub fn poll(&mut self, now: Instant, transport: &mut dyn Transport) {
        if self.tick.poll(now) && self.sender.is_empty() && self.handshake != HandshakeState::Downloading {
            self.enqueue(Command::KeepAlive);
            self.enqueue(Command::StatusRequest);
        }

        if self.watchdog.poll_expired(now) {
            self.sender.clear();
            self.enqueue(Command::Restore);
            self.emit(Event::StateChanged);
        }

        if self.backoff.poll_expired(now) {
            self.sender.clear();
            self.handshake = HandshakeState::Downloading;
            self.enqueue(Command::Download { code: crate::config::DEFAULT_DOWNLOAD_CODE });
        }

        self.sender.tick(now, transport);
    }

    /// Feed freshly-arrived bytes from the transport (§6 "deliver-bytes").
    /// Decodes to completion per validated frame before the next byte is
    /// considered (§5 ordering contract).
    pub fn on_bytes(&mut self, data: &[u8], now: Instant, transport: &mut dyn Transport) {
        for outcome in self.framer.feed(data) {
            match outcome {
                FeedOutcome::Empty => {}
                FeedOutcome::Frame(frame) => self.dispatch(frame, now, transport),
                FeedOutcome::Error(err) => {
                    if frame_counts_toward_comm_exception(&err) {
                        self.crc_errors += 1;
                        self.emit(Event::CommException(self.crc_errors));
                        if self.crc_errors > COMM_EXCEPTION_THRESHOLD {
                            self.enter_comm_exception(transport);
                        }
                    }
                    self.emit(Event::FrameError(err));
                }
            }
        }
    }

    /// The host's transport ended the session (§5 "Cancellation"): cancel
    /// timers and clear the queue. There is no per-operation cancellation
    /// beyond this.
    pub fn on_disconnect(&mut self) {
        self.sender.clear();
        self.watchdog.poll_expired(Instant::now());
        self.backoff.poll_expired(Instant::now());
        self.emit(Event::Disconnected);
    }

    fn enter_comm_exception(&mut self, transport: &mut dyn Transport) {
        self.handshake = HandshakeState::CommException;
        self.sender.clear();
        self.crc_errors = 0;
        self.state.comm_exception_count += 1;
        self.enqueue(Command::Init);
        self.sender.tick(Instant::now(), transport);
        self.emit(Event::CommExceptionThresholdExceeded);
    }

    fn dispatch(&mut self, frame: RawFrame, now: Instant, transport: &mut dyn Transport) {
        if let Some(desc) = types::lookup(frame.type_id) {
            if desc.ack_required {
                let _ = transport.write_bytes(ack_frame(self.handshake == HandshakeState::Enrolled));
            }
        }

        self.sender.reply_received(frame.type_id);
        if frame.type_id == types::ACK {
            self.sender.ack_received();
        }

        match frame.type_id {
            types::ACCESS_DENIED => self.on_access_denied(transport),
            types::STOP => self.on_stop(now),
            types::DOWNLOAD_RETRY => self.on_download_retry(&frame.payload, now),
            types::DOWNLOAD_BLOCK_ACK => {}
            types::PANEL_INFO => self.on_panel_info(&frame.payload, now),
            types::DOWNLOAD_DATA => self.on_download_data(&frame.payload),
            types::STATUS => self.on_status(&frame.payload, now),
            types::PANEL_EVENT => self.on_panel_event(&frame.payload, now, transport),
            types::POWERLINK => self.on_powerlink(&frame.payload, now, transport),
            types::EVENT_LOG => self.on_event_log(&frame.payload),
            types::POWERMASTER => self.on_powermaster(&frame.payload),
            _ => {}
        }

        self.sender.tick(now, transport);
    }

    /// §4.5/§7 Access-Denied handling: Download-in-flight ⇒ fall back to
    /// Standard; any command frame in the 0xA0..=0xAF opcode range ⇒ wrong
    /// pin.
    fn on_access_denied(&mut self, _transport: &mut dyn Transport) {
        if self.last_command_label == Some("Download") {
            self.state.mode = PanelMode::Standard;
            self.handshake = HandshakeState::Standard;
            self.run_eprom_decode();
        } else if matches!(self.last_command_type, Some(t) if (0xA0..=0xAF).contains(&t)) {
            self.emit(Event::WrongPin);
        }
    }

    fn on_stop(&mut self, now: Instant) {
        if self.handshake == HandshakeState::ReadingEprom {
            self.state.mode = PanelMode::Powerlink;
            self.handshake = HandshakeState::Enrolled;
            self.watchdog.arm(now);
            self.run_eprom_decode();
            self.enqueue(Command::Restore);
            self.emit(Event::StateChanged);
        }
    }

    fn on_download_retry(&mut self, payload: &[u8], now: Instant) {
        let delay = payload.first().copied().unwrap_or(1) as u64;
        self.backoff.arm(now, Duration::from_secs(delay.max(1)));
    }

    /// §4.5 "On Panel-Info": record model/sub-model, issue the EPROM read
    /// batch, then Start, then Exit; optionally Set-Time.
    fn on_panel_info(&mut self, payload: &[u8], now: Instant) {
        self.handshake = HandshakeState::AwaitingPanelInfo;
        self.panel_type_nr = payload.first().copied().unwrap_or(0);
        self.powermaster = self.panel_type_nr >= 7;

        for item in eprom_read_batch(self.powermaster) {
            self.enqueue(Command::EpromRead { index: item.index, page: item.page, length: item.length });
        }
        self.enqueue(Command::Start);
        self.enqueue(Command::Exit);

        if self.config.auto_sync_time {
            if let Some(t) = wall_clock_fields(now) {
                self.enqueue(Command::SetTime {
                    second: t.0,
                    minute: t.1,
                    hour: t.2,
                    day: t.3,
                    month: t.4,
                    year_since_2000: t.5,
                });
            }
        }
        self.handshake = HandshakeState::ReadingEprom;
    }

    fn on_download_data(&mut self, payload: &[u8]) {
        // Wire layout: (index, length, page, data...) — `length` placed
        // right after `index` so the framer can size the frame at the 4th
        // byte (§4.2 rule 4, §6 DOWNLOAD_DATA doc comment).
        if payload.len() < 3 {
            self.emit(Event::DecodeError(crate::error::DecodeError::PayloadTooShort { msg: "0x3F", need: 3, got: payload.len() }));
            return;
        }
        let index = payload[0];
        let length = payload[1] as usize;
        let page = payload[2];
        let data = &payload[3..(3 + length).min(payload.len())];
        self.eprom.write(page, index as usize, data);
    }

    fn run_eprom_decode(&mut self) {
        self.inventory = decode_eprom(&self.eprom, self.panel_type_nr, self.config.plugin_language);
        self.sensor_snapshot = self.inventory.sensors.clone();
        self.emit(Event::StateChanged);
    }

    fn on_status(&mut self, payload: &[u8], now: Instant) {
        if payload.len() < 2 {
            return;
        }
        let sub_type = payload[1];
        let body = &payload[2..];
        match sub_type {
            0x02 => match ZoneStatusMasks::decode(body) {
                Ok(masks) => {
                    for zone in masks.apply(&mut self.inventory.sensors) {
                        self.emit(Event::SensorChanged(zone));
                    }
                }
                Err(e) => self.emit(Event::DecodeError(e)),
            },
            0x03 => match TamperMasks::decode(body) {
                Ok(masks) => {
                    for zone in masks.apply(&mut self.inventory.sensors) {
                        self.emit(Event::SensorChanged(zone));
                    }
                }
                Err(e) => self.emit(Event::DecodeError(e)),
            },
            0x04 => match FullStatus::decode(body) {
                Ok(status) => {
                    if let Some(zone) = status.apply(&mut self.state, &mut self.inventory.sensors, now) {
                        self.emit(Event::SensorChanged(zone));
                    }
                    self.emit(Event::StateChanged);
                }
                Err(e) => self.emit(Event::DecodeError(e)),
            },
            0x06 => match crate::decode::live::EnrollmentMasks::decode(body) {
                Ok(masks) => {
                    for zone in masks.apply(&mut self.inventory.sensors) {
                        self.emit(Event::SensorChanged(zone));
                    }
                }
                Err(e) => self.emit(Event::DecodeError(e)),
            },
            other => self.emit(Event::DecodeError(crate::error::DecodeError::UnknownSubType { msg: "A5", sub_type: other })),
        }
    }

    fn on_panel_event(&mut self, payload: &[u8], now: Instant, _transport: &mut dyn Transport) {
        match PanelEvent::decode(payload) {
            Ok(event) => {
                let bell = self.inventory.comm_defaults.bell_time_minutes;
                let effect = event.apply(&mut self.state, bell, now);
                self.emit(Event::StateChanged);
                if effect == LiveEffect::FreshDownload {
                    self.restart_download(now);
                }
            }
            Err(e) => self.emit(Event::DecodeError(e)),
        }
    }

    fn on_powerlink(&mut self, payload: &[u8], now: Instant, transport: &mut dyn Transport) {
        match PowerlinkMessage::decode(payload) {
            Ok(msg) => {
                let effect = msg.effect(self.handshake == HandshakeState::Enrolled);
                match effect {
                    LiveEffect::ResetWatchdog => {
                        self.watchdog.arm(now);
                        self.timeout_stale_triggers(now);
                    }
                    LiveEffect::ReenterDownload => {
                        self.watchdog.arm(now);
                        self.timeout_stale_triggers(now);
                        self.restart_download(now);
                    }
                    LiveEffect::AutoEnroll => self.run_auto_enroll(now, transport),
                    LiveEffect::FreshDownload | LiveEffect::None => {}
                }
                if let PowerlinkMessage::DownloadCodeOffered(code) = msg {
                    self.emit(Event::DownloadCodeOffered(code));
                }
            }
            Err(e) => self.emit(Event::DecodeError(e)),
        }
    }

    /// §4.8 AB/3: "timeout any triggered-sensor flags older than 30 s" for
    /// most kinds; a Motion sensor instead uses the host-configured
    /// `MotionOffDelay` (§6), since motion detectors have their own
    /// installer-set auto-clear period rather than the generic 30s
    /// stale-trigger floor.
    const GENERIC_TRIGGER_TIMEOUT: Duration = Duration::from_secs(30);

    fn timeout_stale_triggers(&mut self, now: Instant) {
        let motion_timeout = Duration::from_secs(self.config.motion_off_delay as u64);
        for sensor in self.inventory.sensors.iter_mut() {
            if sensor.triggered {
                if let Some(at) = sensor.last_trigger {
                    let timeout = if sensor.kind == crate::model::SensorKind::Motion {
                        motion_timeout
                    } else {
                        Self::GENERIC_TRIGGER_TIMEOUT
                    };
                    if now.saturating_duration_since(at) >= timeout {
                        sensor.triggered = false;
                    }
                }
            }
        }
    }

    /// §4.5 "On Auto-enroll request": once per session, clear queue, sleep
    /// briefly (modeled as immediate — the caller's scheduler already
    /// serializes sends at ≥500ms spacing), enqueue Enroll, restart
    /// Download.
    fn run_auto_enroll(&mut self, now: Instant, _transport: &mut dyn Transport) {
        if self.auto_enrolled_this_session {
            return;
        }
        self.auto_enrolled_this_session = true;
        self.sender.clear();
        self.enqueue(Command::Enroll { code: crate::config::DEFAULT_DOWNLOAD_CODE });
        self.restart_download(now);
    }

    fn restart_download(&mut self, _now: Instant) {
        self.handshake = HandshakeState::Downloading;
        self.enqueue(Command::Download { code: crate::config::DEFAULT_DOWNLOAD_CODE });
    }

    fn on_event_log(&mut self, payload: &[u8]) {
        if payload.len() < 2 {
            return;
        }
        let partitioned = tables_partition_count(&self.inventory) > 1;
        let is_first = self.event_log_expected_count.is_none();
        let index = self.event_log.len() as u32;
        match EventLogMessage::decode(&payload[2..], is_first, index, partitioned) {
            Ok(EventLogMessage::RecordCount(count)) => self.event_log_expected_count = Some(count),
            Ok(EventLogMessage::Record(record)) => {
                self.event_log.insert(record.index, record.clone());
                self.emit(Event::EventLogRecord(record));
            }
            Err(e) => self.emit(Event::DecodeError(e)),
        }
    }

    fn on_powermaster(&mut self, payload: &[u8]) {
        match PowerMasterMessage::decode(payload) {
            Ok(msg) => {
                if msg.needs_followup_query() {
                    self.enqueue(Command::StatusRequest);
                }
            }
            Err(e) => self.emit(Event::DecodeError(e)),
        }
    }

    // ----- §4.9 Command surface -----------------------------------------

    /// Resolve the pin to use for a command: caller-supplied, else the
    /// configured override, else (in Powerlink) the first EPROM-downloaded
    /// pin.
    fn resolve_pin(&self, pin: Option<u16>) -> Option<[u8; 2]> {
        if let Some(p) = pin {
            return Some(p.to_be_bytes());
        }
        if let Some(code) = self.config.override_code {
            return Some(code.to_be_bytes());
        }
        if self.handshake == HandshakeState::Enrolled {
            return self.inventory.user_pins.first().copied();
        }
        None
    }

    pub fn arm(&mut self, arm_state: ArmCommand, pin: Option<u16>) -> Result<(), CommandError> {
        if !self.config.enable_remote_arm {
            return Err(CommandError::RemoteArmDisabled);
        }
        let pin = self.resolve_pin(pin).ok_or(CommandError::PinRequired)?;
        self.enqueue(Command::Arm { wire_code: arm_state.wire_code(), pin });
        Ok(())
    }

    pub fn bypass(&mut self, zone: usize, set: bool, pin: Option<u16>) -> Result<(), CommandError> {
        if self.handshake != HandshakeState::Enrolled {
            return Err(CommandError::BypassDisabled);
        }
        if !self.config.enable_sensor_bypass || self.inventory.comm_defaults.bypass_disabled {
            return Err(CommandError::BypassDisabled);
        }
        if zone == 0 || !self.inventory.sensors.iter().any(|s| s.zone == zone) {
            return Err(CommandError::UnknownZone { zone });
        }
        let pin = self.resolve_pin(pin).ok_or(CommandError::PinRequired)?;
        let mask = (1u32 << (zone - 1)).to_be_bytes();
        self.enqueue(Command::Bypass { pin, mask, enable: set });
        self.enqueue(Command::BypassStatusRequest);
        Ok(())
    }

    pub fn get_event_log(&mut self, pin: Option<u16>) -> Result<(), CommandError> {
        let pin = self.resolve_pin(pin).ok_or(CommandError::PinRequired)?;
        self.event_log_expected_count = None;
        self.enqueue(Command::EventLogRequest { pin });
        Ok(())
    }

    /// §4.9 `GetSensorChanges`: zones whose record differs from the
    /// snapshot taken at the previous call; refreshes the snapshot on a
    /// non-empty result.
    pub fn get_sensor_changes(&mut self) -> Vec<usize> {
        let mut changed = Vec::new();
        for sensor in &self.inventory.sensors {
            let differs = match self.sensor_snapshot.iter().find(|s| s.zone == sensor.zone) {
                Some(prev) => sensor_differs(prev, sensor),
                None => true,
            };
            if differs {
                changed.push(sensor.zone);
            }
        }
        if !changed.is_empty() {
            self.sensor_snapshot = self.inventory.sensors.clone();
        }
        changed
    }

    pub fn get_sensor(&self, zone: usize) -> Option<Sensor> {
        self.inventory.sensors.iter().find(|s| s.zone == zone).cloned()
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn event_log(&self) -> impl Iterator<Item = &EventLogRecord> {
        self.event_log.values()
    }
}

fn sensor_differs(a: &Sensor, b: &Sensor) -> bool {
    a.enrolled != b.enrolled
        || a.bypassed != b.bypassed
        || a.open != b.open
        || a.tamper != b.tamper
        || a.low_battery != b.low_battery
        || a.triggered != b.triggered
}

fn frame_counts_toward_comm_exception(err: &crate::error::FrameError) -> bool {
    // §7: "only a 0xF1 frame is exempt from the count" — a framer-level
    // error has no type byte to exempt by, so every escalated error counts;
    // 0xF1 frames validate normally and never reach this path.
    let _ = err;
    true
}

/// `(second, minute, hour, day, month, year_since_2000)` for Set-Time
/// (§4.5: "local wall-clock ... year offset from 2000"). `std::time` gives
/// no calendar fields, so this is a best-effort UTC-epoch breakdown without
/// a chrono-style calendar dependency.
fn wall_clock_fields(_now: Instant) -> Option<(u8, u8, u8, u8, u8, u8)> {
    let secs = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).ok()?.as_secs();
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hour, rem) = (rem / 3600, rem % 3600);
    let (minute, second) = (rem / 60, rem % 60);
    let (year, month, day) = civil_from_days(days as i64);
    Some((second as u8, minute as u8, hour as u8, day as u8, month as u8, (year - 2000).clamp(0, 255) as u8))
}

/// Howard Hinnant's `civil_from_days`: days-since-epoch to `(year, month, day)`.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn tables_partition_count(inventory: &Inventory) -> usize {
    inventory
        .sensors
        .iter()
        .flat_map(|s| s.partitions.iter().copied())
        .collect::<std::collections::BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn fresh() -> (PanelLink, RecordingTransport) {
        (PanelLink::new(Config::default()), RecordingTransport { written: vec![] })
    }

    #[test]
    fn start_enqueues_exit_init_then_download() {
        let (mut link, mut t) = fresh();
        let t0 = Instant::now();
        link.start(t0, &mut t);
        assert_eq!(t.written.len(), 1); // Exit goes out immediately; rest wait on ack/spacing.
        assert_eq!(link.handshake, HandshakeState::Downloading);
    }

    #[test]
    fn force_standard_skips_straight_to_standard_mode() {
        let mut config = Config::default();
        config.force_standard = true;
        let mut link = PanelLink::new(config);
        let mut t = RecordingTransport { written: vec![] };
        link.start(Instant::now(), &mut t);
        assert_eq!(link.state().mode, PanelMode::Standard);
    }

    #[test]
    fn arm_rejected_when_remote_arm_disabled() {
        let mut config = Config::default();
        config.enable_remote_arm = false;
        let mut link = PanelLink::new(config);
        let err = link.arm(ArmCommand::Armed, Some(1234)).unwrap_err();
        assert_eq!(err, CommandError::RemoteArmDisabled);
    }

    #[test]
    fn arm_rejected_without_any_pin_source() {
        let mut link = PanelLink::new(Config::default());
        let err = link.arm(ArmCommand::Armed, None).unwrap_err();
        assert_eq!(err, CommandError::PinRequired);
    }

    #[test]
    fn bypass_rejected_outside_powerlink() {
        let mut link = PanelLink::new(Config::default());
        let err = link.bypass(1, true, Some(1234)).unwrap_err();
        assert_eq!(err, CommandError::BypassDisabled);
    }

    #[test]
    fn download_denied_falls_back_to_standard_mode() {
        let (mut link, mut t) = fresh();
        let t0 = Instant::now();
        link.start(t0, &mut t);
        link.last_command_label = Some("Download");
        link.handshake = HandshakeState::Downloading;
        link.on_access_denied(&mut t);
        assert_eq!(link.state().mode, PanelMode::Standard);
        assert_eq!(link.handshake, HandshakeState::Standard);
    }

    #[test]
    fn access_denied_on_axx_command_reports_wrong_pin() {
        use std::sync::{Arc, Mutex};
        let (mut link, mut t) = fresh();
        let seen = Arc::new(Mutex::new(false));
        let seen_clone = seen.clone();
        link.set_event_sink(move |e| {
            if let Event::WrongPin = e {
                *seen_clone.lock().unwrap() = true;
            }
        });
        link.last_command_label = Some("Arm");
        link.last_command_type = Some(types::ARM);
        link.on_access_denied(&mut t);
        assert!(*seen.lock().unwrap());
    }

    #[test]
    fn auto_enroll_runs_only_once_per_session() {
        let (mut link, mut t) = fresh();
        let t0 = Instant::now();
        link.run_auto_enroll(t0, &mut t);
        assert!(link.auto_enrolled_this_session);
        let queue_len_after_first = !link.sender.is_empty();
        link.sender.clear();
        link.run_auto_enroll(t0, &mut t);
        assert!(queue_len_after_first);
        assert!(link.sender.is_empty()); // second call is a no-op: nothing (re)queued
    }

    #[test]
    fn get_sensor_changes_is_empty_on_noop_tick() {
        let (mut link, _t) = fresh();
        link.inventory.sensors.push(Sensor::new(
            1,
            "Front Door".into(),
            crate::model::ZoneType::Perimeter,
            crate::model::ChimeMode::Off,
            crate::model::SensorKind::Magnet,
        ));
        link.sensor_snapshot = link.inventory.sensors.clone();
        assert!(link.get_sensor_changes().is_empty());
    }

    #[test]
    fn get_sensor_changes_reports_flipped_zone_once_and_advances_snapshot() {
        let (mut link, _t) = fresh();
        link.inventory.sensors.push(Sensor::new(
            1,
            "Front Door".into(),
            crate::model::ZoneType::Perimeter,
            crate::model::ChimeMode::Off,
            crate::model::SensorKind::Magnet,
        ));
        link.sensor_snapshot = link.inventory.sensors.clone();
        link.inventory.sensors[0].open = true;
        let changed = link.get_sensor_changes();
        assert_eq!(changed, vec![1]);
        assert!(link.get_sensor_changes().is_empty());
    }

    #[test]
    fn watchdog_expiry_writes_exactly_one_restore_frame() {
        let (mut link, mut t) = fresh();
        let t0 = Instant::now();
        link.start(t0, &mut t);
        t.written.clear();
        link.sender.clear();
        link.handshake = HandshakeState::Enrolled;
        link.poll(t0 + Duration::from_secs(61), &mut t);
        assert_eq!(t.written.len(), 1);
        let frame = RawFrame::parse(&t.written[0]).unwrap();
        assert_eq!(frame.type_id, types::RESTORE);
    }

    #[test]
    fn happy_path_status_frame_updates_arm_state() {
        let (mut link, mut t) = fresh();
        let wire: &[u8] = &[0x0D, 0xA5, 0x00, 0x04, 0x00, 0x61, 0x03, 0x05, 0x00, 0x05, 0x00, 0x00, 0x43, 0xA4, 0x0A];
        link.on_bytes(wire, Instant::now(), &mut t);
        assert_eq!(link.state().arm_state, crate::model::ArmState::Disarmed);
        assert!(link.state().flags.ready);
    }

    #[test]
    fn comm_exception_threshold_sends_init_and_resets_counter() {
        let (mut link, mut t) = fresh();
        // An unrecognised type byte (0x99) leaves `expected_len` at 0, so
        // the buffer grows unterminated until the framer's hard cap (rule
        // 6) discards it as a `FrameError` — the same construction as
        // `frame::tests::unknown_type_without_terminator_match_eventually_hits_the_cap_and_resyncs`.
        let mut bad = vec![0x0D, 0x99];
        bad.extend(std::iter::repeat(0x01).take(0xC0 + 4));
        for _ in 0..=COMM_EXCEPTION_THRESHOLD {
            link.on_bytes(&bad, Instant::now(), &mut t);
        }
        assert_eq!(link.handshake, HandshakeState::CommException);
        assert_eq!(link.crc_errors, 0);
    }
}
