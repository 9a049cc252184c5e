//! Transport modes supported on itinerary edges.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a visitor travels between two consecutive stops.
///
/// Car and taxi are served by the driving-directions vendor, bus and subway
/// by the transit vendor, and walking or cycling are estimated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Private car.
    Car,
    /// Taxi; routed like a car but priced with the taxi fare.
    Taxi,
    /// Bus-only public transport.
    Bus,
    /// Subway-only public transport.
    Subway,
    /// Walking.
    Walk,
    /// Cycling.
    Bicycle,
}

impl TransportMode {
    /// Every supported mode.
    pub const ALL: [Self; 6] = [
        Self::Car,
        Self::Taxi,
        Self::Bus,
        Self::Subway,
        Self::Walk,
        Self::Bicycle,
    ];

    /// Stable lowercase identifier used in cache keys and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Taxi => "taxi",
            Self::Bus => "bus",
            Self::Subway => "subway",
            Self::Walk => "walk",
            Self::Bicycle => "bicycle",
        }
    }

    /// Whether the transit vendor serves this mode.
    #[must_use]
    pub const fn is_transit(self) -> bool {
        matches!(self, Self::Bus | Self::Subway)
    }

    /// Whether the driving-directions vendor serves this mode.
    #[must_use]
    pub const fn is_driving(self) -> bool {
        matches!(self, Self::Car | Self::Taxi)
    }

    /// Transit vendor path-type filter: `1` subway only, `2` bus only.
    #[must_use]
    pub const fn transit_path_type(self) -> Option<u8> {
        match self {
            Self::Subway => Some(1),
            Self::Bus => Some(2),
            _ => None,
        }
    }

    /// Assumed travel speed for locally estimated modes, in km/h.
    #[must_use]
    pub const fn estimate_speed_kmh(self) -> Option<f64> {
        match self {
            Self::Walk => Some(4.0),
            Self::Bicycle => Some(15.0),
            _ => None,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown transport mode name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transport mode `{0}`")]
pub struct ParseTransportModeError(pub String);

impl FromStr for TransportMode {
    type Err = ParseTransportModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == lowered)
            .ok_or_else(|| ParseTransportModeError(value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("car", TransportMode::Car)]
    #[case(" Subway ", TransportMode::Subway)]
    #[case("BICYCLE", TransportMode::Bicycle)]
    fn parses_names(#[case] input: &str, #[case] expected: TransportMode) {
        assert_eq!(input.parse::<TransportMode>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_names() {
        let err = "hovercraft"
            .parse::<TransportMode>()
            .expect_err("unknown mode should fail");
        assert_eq!(err, ParseTransportModeError("hovercraft".into()));
    }

    #[rstest]
    fn vendor_families_are_disjoint() {
        for mode in TransportMode::ALL {
            let families = [
                mode.is_driving(),
                mode.is_transit(),
                mode.estimate_speed_kmh().is_some(),
            ];
            assert_eq!(families.iter().filter(|flag| **flag).count(), 1, "{mode}");
        }
    }

    #[rstest]
    fn path_type_filters() {
        assert_eq!(TransportMode::Subway.transit_path_type(), Some(1));
        assert_eq!(TransportMode::Bus.transit_path_type(), Some(2));
        assert_eq!(TransportMode::Car.transit_path_type(), None);
    }
}
