//! Live-state decoder (§4.8): A5 status, A7 panel events, AB
//! keepalive/enroll, A0 event log, B0 PowerMaster envelope.
//!
//! Each message type is a small `decode`/`apply` pair: `decode` only
//! parses, `apply` mutates the live [`PanelState`]/`Sensor` records and
//! reports back what the caller (the handshake state machine) needs to act
//! on, since unlike a pure decoder this one drives watchdog resets,
//! download restarts, and auto-enroll.

use std::time::{Duration, Instant};

use crate::codec::{bit_set, read_u16, read_u32};
use crate::error::DecodeError;
use crate::model::{AlarmKind, EventLogRecord, PanelState, Sensor, StatusFlags, TroubleKind};
use crate::tables;

/// What the caller should do in response to a live message, beyond the
/// state/sensor mutation `apply` already performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveEffect {
    None,
    /// AB sub-type 3: reset the Powerlink watchdog.
    ResetWatchdog,
    /// AB sub-type 3 while not yet in Powerlink: re-enter Download (§4.5).
    ReenterDownload,
    /// AB sub-type 10 action 1: run the one-shot auto-enroll branch (§4.5).
    AutoEnroll,
    /// A7 event-type 0x60: system reset, run a fresh Download.
    FreshDownload,
}

/// A5/0x02: per-zone open/violated and low-battery masks.
#[derive(Debug, Clone, Copy)]
pub struct ZoneStatusMasks {
    pub open_mask: u32,
    pub battery_mask: u32,
}

impl ZoneStatusMasks {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(ZoneStatusMasks {
            open_mask: read_u32(payload, 2, "A5/0x02 open mask")?,
            battery_mask: read_u32(payload, 6, "A5/0x02 battery mask")?,
        })
    }

    /// Update only zones already present in `sensors`; returns the zone
    /// indices (1-based) whose live state changed.
    pub fn apply(&self, sensors: &mut [Sensor]) -> Vec<usize> {
        let mut changed = Vec::new();
        for sensor in sensors.iter_mut() {
            let bit = (sensor.zone - 1) as u32;
            let open = bit_set(self.open_mask, bit);
            let low_battery = bit_set(self.battery_mask, bit);
            if sensor.open != open || sensor.low_battery != low_battery {
                sensor.open = open;
                sensor.low_battery = low_battery;
                changed.push(sensor.zone);
            }
        }
        changed
    }
}

/// A5/0x03: tamper masks. The first 32-bit slot is documented as
/// unreliable and ignored (§4.8); only the second carries real data.
#[derive(Debug, Clone, Copy)]
pub struct TamperMasks {
    pub tamper_mask: u32,
}

impl TamperMasks {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(TamperMasks { tamper_mask: read_u32(payload, 6, "A5/0x03 tamper mask")? })
    }

    pub fn apply(&self, sensors: &mut [Sensor]) -> Vec<usize> {
        let mut changed = Vec::new();
        for sensor in sensors.iter_mut() {
            let tamper = bit_set(self.tamper_mask, (sensor.zone - 1) as u32);
            if sensor.tamper != tamper {
                sensor.tamper = tamper;
                changed.push(sensor.zone);
            }
        }
        changed
    }
}

/// A5/0x04: the full status tuple (§4.8).
#[derive(Debug, Clone, Copy)]
pub struct FullStatus {
    pub sys_status: u8,
    pub sys_flags: u8,
    pub event_zone: u8,
    pub event_type: u8,
    pub x10_status: u16,
}

impl FullStatus {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() < 9 {
            return Err(DecodeError::PayloadTooShort { msg: "A5/0x04", need: 9, got: payload.len() });
        }
        Ok(FullStatus {
            sys_status: payload[0],
            sys_flags: payload[1],
            event_zone: payload[3],
            event_type: payload[4],
            x10_status: read_u16(payload, 7, "A5/0x04 x10 status")?,
        })
    }

    /// Update `state` and, if the zone-event flag is set, the named
    /// sensor's `triggered`/`last_trigger` fields. Returns the changed
    /// zone (if any) for the sensor-delta stream.
    pub fn apply(&self, state: &mut PanelState, sensors: &mut [Sensor], now: Instant) -> Option<usize> {
        state.arm_state = tables::arm_state_for_sys_status(self.sys_status);
        state.flags = StatusFlags::from_byte(self.sys_flags);

        let mut touched = None;
        if state.flags.zone_event {
            if let Some(sensor) = sensors.iter_mut().find(|s| s.zone == self.event_zone as usize) {
                sensor.triggered = true;
                sensor.last_trigger = Some(now);
                touched = Some(sensor.zone);
            }
        }
        touched
    }

    /// X10/PGM device status: bit `i` -> slot `i` (slot 0 is the PGM
    /// output), per §4.8.
    pub fn x10_slot(&self, slot: u32) -> bool {
        self.x10_status & (1u16 << slot) != 0
    }
}

/// A5/0x06: per-zone enrolled and bypassed masks.
#[derive(Debug, Clone, Copy)]
pub struct EnrollmentMasks {
    pub enrolled_mask: u32,
    pub bypassed_mask: u32,
}

impl EnrollmentMasks {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(EnrollmentMasks {
            enrolled_mask: read_u32(payload, 2, "A5/0x06 enrolled mask")?,
            bypassed_mask: read_u32(payload, 6, "A5/0x06 bypassed mask")?,
        })
    }

    pub fn apply(&self, sensors: &mut [Sensor]) -> Vec<usize> {
        let mut changed = Vec::new();
        for sensor in sensors.iter_mut() {
            let bit = (sensor.zone - 1) as u32;
            let enrolled = bit_set(self.enrolled_mask, bit);
            let bypassed = bit_set(self.bypassed_mask, bit);
            if sensor.enrolled != enrolled || sensor.bypassed != bypassed {
                sensor.enrolled = enrolled;
                sensor.bypassed = bypassed;
                changed.push(sensor.zone);
            }
        }
        changed
    }
}

/// One `(event_zone, log_event)` pair from an A7 message.
#[derive(Debug, Clone, Copy)]
pub struct PanelEventEntry {
    pub event_zone: u8,
    pub log_event: u8,
}

impl PanelEventEntry {
    pub fn event_type(&self) -> u8 {
        self.log_event & 0x7F
    }
}

/// A7: up to 3 panel-event entries (§4.8).
#[derive(Debug, Clone)]
pub struct PanelEvent {
    pub entries: Vec<PanelEventEntry>,
}

impl PanelEvent {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let count = (payload.first().copied().unwrap_or(0) as usize).min(3);
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let offset = 1 + i * 2;
            if payload.len() < offset + 2 {
                break;
            }
            entries.push(PanelEventEntry { event_zone: payload[offset], log_event: payload[offset + 1] });
        }
        Ok(PanelEvent { entries })
    }

    /// Apply every entry to `state`; bell_time in minutes is needed to
    /// compute `siren_active_until`. Returns the effect the caller should
    /// take for the last entry that demands one (a fresh Download always
    /// wins, since it supersedes everything else in the batch).
    pub fn apply(&self, state: &mut PanelState, bell_time_minutes: u8, now: Instant) -> LiveEffect {
        let mut effect = LiveEffect::None;
        for entry in &self.entries {
            let event_type = entry.event_type();
            state.alarm_kind = tables::alarm_kind_for_event(event_type);
            state.trouble_kind = tables::trouble_kind_for_event(event_type);

            let panic = matches!(event_type, 0x0B | 0x0C);
            if state.alarm_kind != AlarmKind::None && event_type != 0x04 && !panic {
                state.siren_active_until = Some(now + Duration::from_secs(bell_time_minutes as u64 * 60));
            } else if event_type == 0x1B {
                state.siren_active_until = None;
            }

            if event_type == 0x60 {
                effect = LiveEffect::FreshDownload;
            }
        }
        effect
    }
}

/// AB (Powerlink) sub-type dispatch (§4.8).
#[derive(Debug, Clone, Copy)]
pub enum PowerlinkMessage {
    /// Sub-type 3: keep-alive.
    KeepAlive,
    /// Sub-type 5: phone-call notification (log only).
    PhoneCall,
    /// Sub-type 10, action 0: a new download code was offered (not
    /// auto-adopted — §9 open question (c)).
    DownloadCodeOffered([u8; 2]),
    /// Sub-type 10, action 1: auto-enroll request.
    AutoEnrollRequest,
    Other { sub_type: u8 },
}

impl PowerlinkMessage {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let sub_type = *payload.first().ok_or(DecodeError::PayloadTooShort { msg: "AB", need: 1, got: 0 })?;
        Ok(match sub_type {
            3 => PowerlinkMessage::KeepAlive,
            5 => PowerlinkMessage::PhoneCall,
            10 => {
                let action = payload.get(1).copied().unwrap_or(0);
                if action == 1 {
                    PowerlinkMessage::AutoEnrollRequest
                } else {
                    let code = [payload.get(2).copied().unwrap_or(0), payload.get(3).copied().unwrap_or(0)];
                    PowerlinkMessage::DownloadCodeOffered(code)
                }
            }
            other => PowerlinkMessage::Other { sub_type: other },
        })
    }

    /// `currently_powerlink` gates the "re-enter Download" branch of a
    /// keep-alive (§4.5: "if not yet in Powerlink mode re-enter Download").
    pub fn effect(&self, currently_powerlink: bool) -> LiveEffect {
        match self {
            PowerlinkMessage::KeepAlive if !currently_powerlink => LiveEffect::ReenterDownload,
            PowerlinkMessage::KeepAlive => LiveEffect::ResetWatchdog,
            PowerlinkMessage::AutoEnrollRequest => LiveEffect::AutoEnroll,
            _ => LiveEffect::None,
        }
    }
}

/// A0: event-log record count, or one decoded record.
#[derive(Debug, Clone)]
pub enum EventLogMessage {
    RecordCount(u32),
    Record(EventLogRecord),
}

impl EventLogMessage {
    /// `is_first` selects the count-vs-record interpretation (§4.8: "first
    /// message carries the record count"). `partitioned` selects the
    /// seconds-parity partition derivation vs. the single-partition label.
    pub fn decode(payload: &[u8], is_first: bool, index: u32, partitioned: bool) -> Result<Self, DecodeError> {
        if is_first {
            return Ok(EventLogMessage::RecordCount(payload.first().copied().unwrap_or(0) as u32));
        }
        if payload.len() < 8 {
            return Err(DecodeError::PayloadTooShort { msg: "A0 record", need: 8, got: payload.len() });
        }
        let second = payload[0];
        let partition = if partitioned {
            // 3-bit parity over the seconds field (§9 open question (d)
            // territory: untested against a real partitioned panel).
            let parity = (second & 0x07).count_ones() % 2;
            format!("{}", parity + 1)
        } else {
            "1".to_string()
        };
        Ok(EventLogMessage::Record(EventLogRecord {
            index,
            second,
            minute: payload[1],
            hour: payload[2],
            day: payload[3],
            month: payload[4],
            year: 2000 + payload[5] as u16,
            event_zone: payload[6],
            log_event: payload[7],
            partition,
        }))
    }
}

/// B0 (PowerMaster) envelope (§4.8).
#[derive(Debug, Clone)]
pub struct PowerMasterMessage {
    pub msg_type: u8,
    pub sub_type: u8,
    pub payload: Vec<u8>,
}

impl PowerMasterMessage {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() < 3 {
            return Err(DecodeError::PayloadTooShort { msg: "B0", need: 3, got: payload.len() });
        }
        let len = payload[2] as usize;
        let data = payload.get(3..3 + len).unwrap_or(&payload[3.min(payload.len())..]).to_vec();
        Ok(PowerMasterMessage { msg_type: payload[0], sub_type: payload[1], payload: data })
    }

    /// Sub-type 0x39 on a reply (`msg_type == 3`) should trigger further
    /// zone-stat queries; everything else is logged only (§4.8).
    pub fn needs_followup_query(&self) -> bool {
        self.msg_type == 3 && self.sub_type == 0x39
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChimeMode, SensorKind, ZoneType};

    fn sensor(zone: usize) -> Sensor {
        Sensor::new(zone, format!("Zone {zone}"), ZoneType::Interior, ChimeMode::Off, SensorKind::Motion)
    }

    #[test]
    fn zone_status_masks_only_touch_known_zones() {
        let masks = ZoneStatusMasks { open_mask: 0b1_0001, battery_mask: 0 }; // zones 1 and 5 open
        let mut sensors = vec![sensor(1), sensor(2), sensor(5)];
        let changed = masks.apply(&mut sensors);
        assert_eq!(changed, vec![1, 5]);
        assert!(sensors[0].open);
        assert!(!sensors[1].open);
        assert!(sensors[2].open);
    }

    #[test]
    fn full_status_decode_matches_happy_path_scenario_frame() {
        // A5 payload from spec §8 scenario 1 (type byte + CRC/terminator
        // stripped): 00 04 00 61 03 05 00 05 00 00 43. First byte is the
        // total-messages count, second is the sub-type (0x04); the status
        // tuple itself starts at the third byte.
        let payload = [0x00u8, 0x04, 0x00, 0x61, 0x03, 0x05, 0x00, 0x05, 0x00, 0x00, 0x43];
        let status = FullStatus::decode(&payload[2..]).unwrap();
        assert_eq!(status.sys_status, 0x00);
        assert_eq!(status.sys_flags, 0x61);
        assert_eq!(status.event_zone, 0x05);
        assert_eq!(status.event_type, 0x00);
    }

    #[test]
    fn full_status_sets_triggered_zone_on_zone_event_flag() {
        // sys_flags bit 5 (0x20) set -> zone_event.
        let status = FullStatus { sys_status: 4, sys_flags: 0x20, event_zone: 3, event_type: 0, x10_status: 0 };
        let mut state = PanelState::default();
        let mut sensors = vec![sensor(3)];
        let now = Instant::now();
        let touched = status.apply(&mut state, &mut sensors, now);
        assert_eq!(touched, Some(3));
        assert!(sensors[0].triggered);
        assert_eq!(sensors[0].last_trigger, Some(now));
        assert!(state.arm_state.is_armed());
    }

    #[test]
    fn panel_event_sets_siren_deadline_for_non_panic_alarm() {
        let event = PanelEvent { entries: vec![PanelEventEntry { event_zone: 3, log_event: 0x01 }] };
        let mut state = PanelState::default();
        let now = Instant::now();
        event.apply(&mut state, 4, now);
        assert_eq!(state.alarm_kind, AlarmKind::Intruder);
        assert_eq!(state.siren_active_until, Some(now + Duration::from_secs(240)));
    }

    #[test]
    fn panel_event_panic_does_not_set_siren() {
        let event = PanelEvent { entries: vec![PanelEventEntry { event_zone: 0, log_event: 0x0B }] };
        let mut state = PanelState::default();
        event.apply(&mut state, 4, Instant::now());
        assert_eq!(state.alarm_kind, AlarmKind::Panic);
        assert_eq!(state.siren_active_until, None);
    }

    #[test]
    fn panel_event_cancel_clears_siren() {
        let mut state = PanelState::default();
        state.siren_active_until = Some(Instant::now());
        let event = PanelEvent { entries: vec![PanelEventEntry { event_zone: 0, log_event: 0x1B } ] };
        event.apply(&mut state, 4, Instant::now());
        assert_eq!(state.siren_active_until, None);
    }

    #[test]
    fn panel_event_system_reset_triggers_fresh_download() {
        let event = PanelEvent { entries: vec![PanelEventEntry { event_zone: 0, log_event: 0x60 }] };
        let mut state = PanelState::default();
        let effect = event.apply(&mut state, 4, Instant::now());
        assert_eq!(effect, LiveEffect::FreshDownload);
    }

    #[test]
    fn powerlink_keepalive_resets_watchdog_when_already_powerlink() {
        let msg = PowerlinkMessage::decode(&[3]).unwrap();
        assert_eq!(msg.effect(true), LiveEffect::ResetWatchdog);
        assert_eq!(msg.effect(false), LiveEffect::ReenterDownload);
    }

    #[test]
    fn powerlink_auto_enroll_action_one_is_detected() {
        let msg = PowerlinkMessage::decode(&[10, 1]).unwrap();
        assert!(matches!(msg, PowerlinkMessage::AutoEnrollRequest));
        assert_eq!(msg.effect(true), LiveEffect::AutoEnroll);
    }

    #[test]
    fn event_log_first_message_is_a_count() {
        let msg = EventLogMessage::decode(&[42], true, 0, false).unwrap();
        assert!(matches!(msg, EventLogMessage::RecordCount(42)));
    }

    #[test]
    fn event_log_record_uses_single_partition_when_not_partitioned() {
        let payload = [10u8, 30, 14, 5, 6, 23, 3, 0x01];
        let msg = EventLogMessage::decode(&payload, false, 1, false).unwrap();
        match msg {
            EventLogMessage::Record(r) => {
                assert_eq!(r.partition, "1");
                assert_eq!(r.year, 2023);
            }
            _ => panic!("expected a record"),
        }
    }

    #[test]
    fn powermaster_envelope_flags_the_0x39_followup() {
        let msg = PowerMasterMessage::decode(&[3, 0x39, 0]).unwrap();
        assert!(msg.needs_followup_query());
        let other = PowerMasterMessage::decode(&[3, 0x10, 0]).unwrap();
        assert!(!other.needs_followup_query());
    }
}
