//! Static decoder tables (§4.7, §4.8): panel sizing, model names, zone-type
//! display strings, and the sys_status → [`ArmState`] / event-type → kind
//! lookups. All `const` data, per the design note in spec §9 ("tables can be
//! `const` data").

use crate::model::{AlarmKind, ArmState, TroubleKind, ZoneType};

/// User-facing language selection (§6 `PluginLanguage`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Language {
    En,
    Nl,
}

impl Language {
    pub fn from_code(code: &str) -> Language {
        match code {
            "NL" | "nl" => Language::Nl,
            _ => Language::En,
        }
    }
}

/// Per-panel-type sizing row (§4.7: "panel sizing is table-driven by
/// `panel_type_nr ∈ 0..8`").
#[derive(Debug, Clone, Copy)]
pub struct PanelTypeRow {
    pub partitions: usize,
    pub events: usize,
    pub keyfobs: usize,
    pub one_way_keypads: usize,
    pub two_way_keypads: usize,
    pub sirens: usize,
    pub user_codes: usize,
    pub prox_tags: usize,
    pub wireless_zones: usize,
    pub wired_zones: usize,
    pub custom_zone_names: usize,
}

impl PanelTypeRow {
    pub fn zone_count(&self) -> usize {
        self.wireless_zones + self.wired_zones
    }
}

/// Rows for `panel_type_nr` 0..=8, smallest (PowerMax) to largest
/// (PowerMaster 33) panels.
pub const PANEL_TYPE_TABLE: [PanelTypeRow; 9] = [
    // 0: PowerMax
    PanelTypeRow { partitions: 1, events: 250, keyfobs: 8, one_way_keypads: 8, two_way_keypads: 2, sirens: 2, user_codes: 8, prox_tags: 8, wireless_zones: 28, wired_zones: 2, custom_zone_names: 0 },
    // 1: PowerMax+
    PanelTypeRow { partitions: 1, events: 250, keyfobs: 8, one_way_keypads: 8, two_way_keypads: 2, sirens: 2, user_codes: 8, prox_tags: 8, wireless_zones: 28, wired_zones: 2, custom_zone_names: 0 },
    // 2: PowerMax Pro
    PanelTypeRow { partitions: 3, events: 250, keyfobs: 8, one_way_keypads: 8, two_way_keypads: 2, sirens: 2, user_codes: 8, prox_tags: 8, wireless_zones: 28, wired_zones: 2, custom_zone_names: 5 },
    // 3: PowerMax Complete
    PanelTypeRow { partitions: 3, events: 250, keyfobs: 8, one_way_keypads: 8, two_way_keypads: 2, sirens: 2, user_codes: 8, prox_tags: 8, wireless_zones: 28, wired_zones: 2, custom_zone_names: 5 },
    // 4: PowerMax Pro Part2
    PanelTypeRow { partitions: 3, events: 250, keyfobs: 8, one_way_keypads: 8, two_way_keypads: 2, sirens: 2, user_codes: 8, prox_tags: 8, wireless_zones: 30, wired_zones: 2, custom_zone_names: 5 },
    // 5: PowerMax Complete Part2
    PanelTypeRow { partitions: 3, events: 250, keyfobs: 8, one_way_keypads: 8, two_way_keypads: 2, sirens: 2, user_codes: 8, prox_tags: 8, wireless_zones: 30, wired_zones: 2, custom_zone_names: 5 },
    // 6: PowerMaster10
    PanelTypeRow { partitions: 1, events: 250, keyfobs: 8, one_way_keypads: 8, two_way_keypads: 8, sirens: 2, user_codes: 16, prox_tags: 8, wireless_zones: 30, wired_zones: 0, custom_zone_names: 5 },
    // 7: PowerMaster30
    PanelTypeRow { partitions: 3, events: 1000, keyfobs: 32, one_way_keypads: 32, two_way_keypads: 32, sirens: 4, user_codes: 48, prox_tags: 32, wireless_zones: 62, wired_zones: 2, custom_zone_names: 10 },
    // 8: PowerMaster33
    PanelTypeRow { partitions: 3, events: 1000, keyfobs: 32, one_way_keypads: 32, two_way_keypads: 32, sirens: 8, user_codes: 48, prox_tags: 32, wireless_zones: 64, wired_zones: 2, custom_zone_names: 10 },
];

pub fn panel_type_row(panel_type_nr: u8) -> &'static PanelTypeRow {
    let idx = (panel_type_nr as usize).min(PANEL_TYPE_TABLE.len() - 1);
    &PANEL_TYPE_TABLE[idx]
}

/// `sys_status` (0..21) → detailed arm label (§4.8, "table of 22").
pub const ARM_STATUS_TABLE: [ArmState; 22] = [
    ArmState::Disarmed,
    ArmState::ExitDelayHome,
    ArmState::ExitDelayAway,
    ArmState::EntryDelay,
    ArmState::ArmedHome,
    ArmState::ArmedAway,
    ArmState::UserTest,
    ArmState::Downloading,
    ArmState::Programming,
    ArmState::Installer,
    ArmState::ArmedHomeInstant,
    ArmState::ArmedAwayInstant,
    ArmState::ArmedHomeBypass,
    ArmState::ArmedAwayBypass,
    ArmState::ArmedHomeMinInstant,
    ArmState::ArmedAwayMinInstant,
    ArmState::NightHome,
    ArmState::NightAway,
    ArmState::Disarmed24h,
    ArmState::Alarm,
    ArmState::ArmedHomeBypassInstant,
    ArmState::ArmedAwayBypassInstant,
];

/// Maps a raw `sys_status` byte to its detailed arm label, per the 22-row
/// table; anything outside the table is [`ArmState::Unknown`].
pub fn arm_state_for_sys_status(sys_status: u8) -> ArmState {
    ARM_STATUS_TABLE
        .get(sys_status as usize)
        .copied()
        .unwrap_or(ArmState::Unknown)
}

/// Panel model name lookup, keyed by the 4-hex-digit value built from
/// `serial[7]` (high byte) and `serial[6]` (low byte) per §4.7 step 6.
const PANEL_MODEL_TABLE: &[(u16, &str)] = &[
    (0x0000, "PowerMax"),
    (0x0001, "PowerMax+"),
    (0x0004, "PowerMax Pro"),
    (0x0006, "PowerMax Complete"),
    (0x0009, "PowerMax Pro Part2"),
    (0x000A, "PowerMax Complete Part2"),
    (0x000C, "PowerMax Express"),
    (0x0011, "PowerMax Express Part2"),
    (0x0065, "PowerMaster10"),
    (0x0066, "PowerMaster30"),
    (0x006A, "PowerMaster33"),
];

pub fn panel_model_name(key: u16) -> &'static str {
    PANEL_MODEL_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// Zone-type display name, by language (§3, §4.7 step 8).
pub fn zone_type_name(zone_type: ZoneType, lang: Language) -> &'static str {
    match (zone_type, lang) {
        (ZoneType::NonAlarm, Language::En) => "Non-Alarm",
        (ZoneType::NonAlarm, Language::Nl) => "Geen alarm",
        (ZoneType::Emergency, Language::En) => "Emergency",
        (ZoneType::Emergency, Language::Nl) => "Noodgeval",
        (ZoneType::Flood, Language::En) => "Flood",
        (ZoneType::Flood, Language::Nl) => "Overstroming",
        (ZoneType::Gas, Language::En) => "Gas",
        (ZoneType::Gas, Language::Nl) => "Gas",
        (ZoneType::Delay1, Language::En) => "Delay 1",
        (ZoneType::Delay1, Language::Nl) => "Vertraging 1",
        (ZoneType::Delay2, Language::En) => "Delay 2",
        (ZoneType::Delay2, Language::Nl) => "Vertraging 2",
        (ZoneType::InteriorFollow, Language::En) => "Interior-Follow",
        (ZoneType::InteriorFollow, Language::Nl) => "Interieur-Volg",
        (ZoneType::Perimeter, Language::En) => "Perimeter",
        (ZoneType::Perimeter, Language::Nl) => "Omtrek",
        (ZoneType::PerimeterFollow, Language::En) => "Perimeter-Follow",
        (ZoneType::PerimeterFollow, Language::Nl) => "Omtrek-Volg",
        (ZoneType::TwentyFourHourSilent, Language::En) => "24 Hours Silent",
        (ZoneType::TwentyFourHourSilent, Language::Nl) => "24 Uurs Stil",
        (ZoneType::TwentyFourHourAudible, Language::En) => "24 Hours Audible",
        (ZoneType::TwentyFourHourAudible, Language::Nl) => "24 Uurs Hoorbaar",
        (ZoneType::Fire, Language::En) => "Fire",
        (ZoneType::Fire, Language::Nl) => "Brand",
        (ZoneType::Interior, Language::En) => "Interior",
        (ZoneType::Interior, Language::Nl) => "Interieur",
        (ZoneType::HomeDelay, Language::En) => "Home Delay",
        (ZoneType::HomeDelay, Language::Nl) => "Thuis Vertraging",
        (ZoneType::Temperature, Language::En) => "Temperature",
        (ZoneType::Temperature, Language::Nl) => "Temperatuur",
        (ZoneType::Outdoor, Language::En) => "Outdoor",
        (ZoneType::Outdoor, Language::Nl) => "Buiten",
    }
}

/// Chime display label (§3 "chime label").
pub fn chime_label(chime: crate::model::ChimeMode) -> &'static str {
    use crate::model::ChimeMode::*;
    match chime {
        Off => "Off",
        Melody => "Melody",
        Zone => "Zone",
        Invisible => "Invisible",
    }
}

/// Sensor-kind display label (§3 "sensor-kind label").
pub fn sensor_kind_label(kind: crate::model::SensorKind) -> &'static str {
    use crate::model::SensorKind::*;
    match kind {
        Motion => "Motion",
        Magnet => "Magnet",
        Smoke => "Smoke",
        Gas => "Gas",
        Camera => "Camera",
        Temperature => "Temperature",
        Wired => "Wired",
        Unknown => "Unknown",
    }
}

/// `event_type` (`log_event & 0x7F`) → alarm kind (§4.8, A7).
pub fn alarm_kind_for_event(event_type: u8) -> AlarmKind {
    match event_type {
        0x01..=0x03 => AlarmKind::Intruder,
        0x04 => AlarmKind::Fire,
        0x05 => AlarmKind::TwentyFourHour,
        0x06 => AlarmKind::Gas,
        0x07 => AlarmKind::Flood,
        0x0B | 0x0C => AlarmKind::Panic,
        0x0D => AlarmKind::Tamper,
        0x0E => AlarmKind::Emergency,
        _ => AlarmKind::None,
    }
}

/// `event_type` → trouble kind (§4.8, A7).
pub fn trouble_kind_for_event(event_type: u8) -> TroubleKind {
    match event_type {
        0x20 => TroubleKind::AcFailure,
        0x21 => TroubleKind::BatteryLow,
        0x22 => TroubleKind::CommunicationFailure,
        0x23 => TroubleKind::Tamper,
        0x24 => TroubleKind::Jamming,
        0x25 => TroubleKind::LineFault,
        _ => TroubleKind::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sys_status_armed_set_matches_model_predicate() {
        for s in [3u8, 4, 5, 0x0A, 0x0B, 0x14, 0x15] {
            assert!(arm_state_for_sys_status(s).is_armed(), "sys_status {s:#x} should be armed");
        }
        for s in [0u8, 1, 2, 6, 7, 8, 9] {
            assert!(!arm_state_for_sys_status(s).is_armed());
        }
    }

    #[test]
    fn sys_status_out_of_range_is_unknown() {
        assert_eq!(arm_state_for_sys_status(200), ArmState::Unknown);
    }

    #[test]
    fn unknown_panel_model_falls_back() {
        assert_eq!(panel_model_name(0xFFFF), "Unknown");
        assert_eq!(panel_model_name(0x0065), "PowerMaster10");
    }

    #[test]
    fn panel_type_row_clamps_out_of_range_index() {
        let row = panel_type_row(255);
        assert_eq!(row.zone_count(), PANEL_TYPE_TABLE[8].zone_count());
    }
}
