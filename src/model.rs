//! Domain model: panel identity, zones/sensors, and live panel state (§3).
//!
//! Plain data records throughout, per the design note in spec §9 ("replace
//! the ad-hoc named tuples with plain records"): no behavior lives here
//! beyond small predicates (`ArmState::is_armed`) and `Default` impls.

use std::collections::BTreeSet;
use std::time::Instant;

/// Coarse panel operating mode, as published in `PanelState` (§3). The
/// handshake state machine (`engine::HandshakeState`) is more granular;
/// this is the public projection of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PanelMode {
    Starting,
    Download,
    Standard,
    Powerlink,
}

/// A user-requested arm state (§4.9's `Arm(state, pin?)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArmCommand {
    Disarmed,
    Stay,
    Armed,
    UserTest,
    StayInstant,
    ArmedInstant,
    Night,
    NightInstant,
}

impl ArmCommand {
    /// The single byte patched at offset 3 of the Arm command descriptor.
    pub fn wire_code(self) -> u8 {
        match self {
            ArmCommand::Disarmed => 0x00,
            ArmCommand::Stay => 0x04,
            ArmCommand::Armed => 0x05,
            ArmCommand::UserTest => 0x06,
            ArmCommand::StayInstant => 0x14,
            ArmCommand::ArmedInstant => 0x15,
            ArmCommand::Night => 0x24,
            ArmCommand::NightInstant => 0x34,
        }
    }
}

/// The decoded, detailed arm label produced from an A5/0x04 `sys_status`
/// byte (§4.8; "table of 22"). Distinct from [`ArmCommand`], which is only
/// the small set of states a caller may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArmState {
    #[default]
    Disarmed,
    ExitDelayHome,
    ExitDelayAway,
    EntryDelay,
    ArmedHome,
    ArmedAway,
    UserTest,
    Downloading,
    Programming,
    Installer,
    ArmedHomeInstant,
    ArmedAwayInstant,
    ArmedHomeBypass,
    ArmedAwayBypass,
    ArmedHomeMinInstant,
    ArmedAwayMinInstant,
    NightHome,
    NightAway,
    Disarmed24h,
    Alarm,
    ArmedHomeBypassInstant,
    ArmedAwayBypassInstant,
    /// `sys_status` value outside the 22-row table.
    Unknown,
}

impl ArmState {
    /// Armed iff `sys_status ∈ {3,4,5,0x0A,0x0B,0x14,0x15}` (§4.8).
    pub fn is_armed(self) -> bool {
        matches!(
            self,
            ArmState::EntryDelay
                | ArmState::ArmedHome
                | ArmState::ArmedAway
                | ArmState::ArmedHomeInstant
                | ArmState::ArmedAwayInstant
                | ArmState::ArmedHomeBypassInstant
                | ArmState::ArmedAwayBypassInstant
        )
    }
}

/// Zone type, enumerated per §3 (low nibble of the EPROM info byte, 16
/// possible values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZoneType {
    NonAlarm,
    Emergency,
    Flood,
    Gas,
    Delay1,
    Delay2,
    InteriorFollow,
    Perimeter,
    PerimeterFollow,
    TwentyFourHourSilent,
    TwentyFourHourAudible,
    Fire,
    Interior,
    HomeDelay,
    Temperature,
    Outdoor,
}

impl ZoneType {
    /// Decode from the low nibble of a zone's EPROM info byte.
    pub fn from_nibble(nibble: u8) -> ZoneType {
        match nibble & 0x0F {
            0 => ZoneType::NonAlarm,
            1 => ZoneType::Emergency,
            2 => ZoneType::Flood,
            3 => ZoneType::Gas,
            4 => ZoneType::Delay1,
            5 => ZoneType::Delay2,
            6 => ZoneType::InteriorFollow,
            7 => ZoneType::Perimeter,
            8 => ZoneType::PerimeterFollow,
            9 => ZoneType::TwentyFourHourSilent,
            10 => ZoneType::TwentyFourHourAudible,
            11 => ZoneType::Fire,
            12 => ZoneType::Interior,
            13 => ZoneType::HomeDelay,
            14 => ZoneType::Temperature,
            _ => ZoneType::Outdoor,
        }
    }
}

/// Chime mode, bits 4-5 of the EPROM info byte (4 possible values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChimeMode {
    Off,
    Melody,
    Zone,
    Invisible,
}

impl ChimeMode {
    pub fn from_bits(info_byte: u8) -> ChimeMode {
        match (info_byte >> 4) & 0x03 {
            0 => ChimeMode::Off,
            1 => ChimeMode::Melody,
            2 => ChimeMode::Zone,
            _ => ChimeMode::Invisible,
        }
    }
}

/// Sensor-kind tag (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorKind {
    Motion,
    Magnet,
    Smoke,
    Gas,
    Camera,
    Temperature,
    Wired,
    Unknown,
}

/// Panel identity, assembled from the EPROM-derived firmware/model/serial
/// region (§3, §4.7 steps 5-6).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanelIdentity {
    pub model_id: u8,
    pub sub_model_id: u8,
    pub model_name: String,
    pub serial: String,
    pub firmware: String,
    pub eprom_label: String,
    pub powermaster: bool,
}

/// One zone/sensor record (§3). A record is created only by the EPROM
/// decoder (§4.7 step 8); runtime messages only flip its live booleans.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sensor {
    pub zone: usize,
    pub name: String,
    pub zone_type: ZoneType,
    pub chime: ChimeMode,
    pub kind: SensorKind,
    pub partitions: BTreeSet<u8>,
    pub enrolled: bool,
    pub bypassed: bool,
    pub open: bool,
    pub tamper: bool,
    pub low_battery: bool,
    pub triggered: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub last_trigger: Option<Instant>,
}

impl Sensor {
    pub fn new(zone: usize, name: String, zone_type: ZoneType, chime: ChimeMode, kind: SensorKind) -> Self {
        Sensor {
            zone,
            name,
            zone_type,
            chime,
            kind,
            partitions: BTreeSet::new(),
            enrolled: true,
            bypassed: false,
            open: false,
            tamper: false,
            low_battery: false,
            triggered: false,
            last_trigger: None,
        }
    }
}

/// Bitmask-shaped status flags from an A5/0x04 `sys_flags` byte (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusFlags {
    pub ready: bool,
    pub alert_in_memory: bool,
    pub trouble: bool,
    pub bypass_on: bool,
    pub last_10_seconds: bool,
    pub zone_event: bool,
    pub status_changed: bool,
    pub alarm_event: bool,
}

impl StatusFlags {
    pub fn from_byte(b: u8) -> StatusFlags {
        StatusFlags {
            ready: b & 0x01 != 0,
            alert_in_memory: b & 0x02 != 0,
            trouble: b & 0x04 != 0,
            bypass_on: b & 0x08 != 0,
            last_10_seconds: b & 0x10 != 0,
            zone_event: b & 0x20 != 0,
            status_changed: b & 0x40 != 0,
            alarm_event: b & 0x80 != 0,
        }
    }
}

/// Alarm kind derived from an A7 event type (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlarmKind {
    #[default]
    None,
    Intruder,
    Panic,
    Fire,
    Emergency,
    Gas,
    Flood,
    Tamper,
    TwentyFourHour,
}

/// Trouble kind derived from an A7 event type (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TroubleKind {
    #[default]
    None,
    AcFailure,
    BatteryLow,
    CommunicationFailure,
    Tamper,
    Jamming,
    LineFault,
}

/// One decoded event-log record (§4.8, A0).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventLogRecord {
    pub index: u32,
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
    pub event_zone: u8,
    pub log_event: u8,
    pub partition: String,
}

/// Live panel state (§3): everything the host sees in a state snapshot.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanelState {
    pub mode: PanelMode,
    pub arm_state: ArmState,
    pub flags: StatusFlags,
    pub last_event: String,
    pub alarm_kind: AlarmKind,
    pub trouble_kind: TroubleKind,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub siren_active_until: Option<Instant>,
    pub comm_exception_count: u32,
}

impl Default for PanelState {
    fn default() -> Self {
        PanelState {
            mode: PanelMode::Starting,
            arm_state: ArmState::default(),
            flags: StatusFlags::default(),
            last_event: String::new(),
            alarm_kind: AlarmKind::default(),
            trouble_kind: TroubleKind::default(),
            siren_active_until: None,
            comm_exception_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armed_set_matches_sys_status_predicate() {
        assert!(ArmState::EntryDelay.is_armed());
        assert!(ArmState::ArmedHome.is_armed());
        assert!(ArmState::ArmedAway.is_armed());
        assert!(ArmState::ArmedHomeInstant.is_armed());
        assert!(ArmState::ArmedAwayInstant.is_armed());
        assert!(ArmState::ArmedHomeBypassInstant.is_armed());
        assert!(ArmState::ArmedAwayBypassInstant.is_armed());
        assert!(!ArmState::Disarmed.is_armed());
        assert!(!ArmState::ExitDelayHome.is_armed());
        assert!(!ArmState::UserTest.is_armed());
    }

    #[test]
    fn zone_type_from_nibble_covers_all_sixteen() {
        let seen: Vec<ZoneType> = (0u8..16).map(ZoneType::from_nibble).collect();
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn status_flags_decode_each_bit_independently() {
        let f = StatusFlags::from_byte(0b0110_0001);
        assert!(f.ready);
        assert!(f.zone_event);
        assert!(f.status_changed);
        assert!(!f.alert_in_memory);
        assert!(!f.trouble);
        assert!(!f.bypass_on);
        assert!(!f.last_10_seconds);
        assert!(!f.alarm_event);
    }

    #[test]
    fn arm_command_wire_codes_are_distinct() {
        let all = [
            ArmCommand::Disarmed,
            ArmCommand::Stay,
            ArmCommand::Armed,
            ArmCommand::UserTest,
            ArmCommand::StayInstant,
            ArmCommand::ArmedInstant,
            ArmCommand::Night,
            ArmCommand::NightInstant,
        ];
        let mut codes: Vec<u8> = all.iter().map(|a| a.wire_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
