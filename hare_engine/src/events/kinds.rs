use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub use hare_formats::events::EVENT_PARAM_COUNT;

pub type EventParams = [u16; EVENT_PARAM_COUNT];

/// Event identifier as stored in the layout stream. Unknown ids pass through
/// decode untouched, so this is a thin wrapper rather than a closed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EventKind(pub u16);

impl EventKind {
    pub const EMPTY: EventKind = EventKind(0);
    pub const LEVEL_START: EventKind = EventKind(1);
    pub const WARP_ORIGIN: EventKind = EventKind(2);
    pub const WARP_TARGET: EventKind = EventKind(3);
    pub const LIGHT_SET: EventKind = EventKind(4);
    pub const LIGHT_RESET: EventKind = EventKind(5);
    pub const WEATHER: EventKind = EventKind(6);
    pub const GENERATOR: EventKind = EventKind(7);
    /// Sentinel reported for queries below the bottom of the grid.
    pub const LETHAL_BOUNDARY: EventKind = EventKind(8);

    pub const ONE_WAY: EventKind = EventKind(16);
    pub const VINE: EventKind = EventKind(17);
    pub const HOOK: EventKind = EventKind(18);
    pub const HURT: EventKind = EventKind(19);
    pub const H_POLE: EventKind = EventKind(20);
    pub const V_POLE: EventKind = EventKind(21);
    pub const SCENERY_DESTRUCT: EventKind = EventKind(22);
    pub const SCENERY_DESTRUCT_STOMP: EventKind = EventKind(23);
    pub const SCENERY_DESTRUCT_SPEED: EventKind = EventKind(24);
    pub const SCENERY_COLLAPSE: EventKind = EventKind(25);
    pub const TRIGGER_AREA: EventKind = EventKind(26);

    /// Kinds that change tile collision semantics and are mirrored into the
    /// tile map on decode.
    pub fn is_tile_modifier(self) -> bool {
        matches!(
            self,
            EventKind::ONE_WAY
                | EventKind::VINE
                | EventKind::HOOK
                | EventKind::HURT
                | EventKind::H_POLE
                | EventKind::V_POLE
                | EventKind::SCENERY_DESTRUCT
                | EventKind::SCENERY_DESTRUCT_STOMP
                | EventKind::SCENERY_DESTRUCT_SPEED
                | EventKind::SCENERY_COLLAPSE
                | EventKind::TRIGGER_AREA
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InstantiationFlags(pub u8);

impl InstantiationFlags {
    pub const NONE: InstantiationFlags = InstantiationFlags(0);
    /// Passthrough bit carried verbatim from the layout flag byte.
    pub const FROM_MAP: InstantiationFlags = InstantiationFlags(0x04);
    pub const FROM_EVENT_MAP: InstantiationFlags = InstantiationFlags(0x08);
    pub const FROM_GENERATOR: InstantiationFlags = InstantiationFlags(0x10);

    pub fn contains(self, other: InstantiationFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for InstantiationFlags {
    type Output = InstantiationFlags;

    fn bitor(self, rhs: InstantiationFlags) -> InstantiationFlags {
        InstantiationFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// Bit position in the cell flag byte that marks an event as present at
    /// this difficulty.
    pub fn flag_bit(self) -> u8 {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Normal => 5,
            Difficulty::Hard => 6,
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!(
                "unknown difficulty {other:?} (expected easy, normal, or hard)"
            )),
        }
    }
}

/// One of the four player-type bits a level-start cell can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PlayerKind(pub u8);

impl PlayerKind {
    pub const COUNT: u16 = 4;
}

/// Wire value of a weather event's first parameter; interpreted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeatherKind(pub u16);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_bits_match_the_layout_format() {
        assert_eq!(Difficulty::Easy.flag_bit(), 4);
        assert_eq!(Difficulty::Normal.flag_bit(), 5);
        assert_eq!(Difficulty::Hard.flag_bit(), 6);
    }

    #[test]
    fn parses_difficulty_labels() {
        assert_eq!("hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("brutal".parse::<Difficulty>().is_err());
    }

    #[test]
    fn instantiation_flags_combine() {
        let flags = InstantiationFlags::FROM_EVENT_MAP | InstantiationFlags::FROM_MAP;
        assert!(flags.contains(InstantiationFlags::FROM_EVENT_MAP));
        assert!(flags.contains(InstantiationFlags::FROM_MAP));
        assert!(!flags.contains(InstantiationFlags::FROM_GENERATOR));
    }

    #[test]
    fn modifier_kinds_are_recognized() {
        assert!(EventKind::VINE.is_tile_modifier());
        assert!(EventKind::TRIGGER_AREA.is_tile_modifier());
        assert!(!EventKind::WEATHER.is_tile_modifier());
        assert!(!EventKind(500).is_tile_modifier());
    }
}
