use chrono::NaiveDate;
use thiserror::Error;

use super::{DayId, EdgeKey, PlaceId};

/// Errors raised by itinerary mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItineraryError {
    /// The end date precedes the start date.
    #[error("end date {end} precedes start date {start}")]
    InvalidDateRange {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },
    /// Adding a day would run past the last representable date.
    #[error("date arithmetic overflowed")]
    DateOverflow,
    /// No day with this id.
    #[error("unknown day {0}")]
    UnknownDay(DayId),
    /// No place with this id.
    #[error("unknown place {0}")]
    UnknownPlace(PlaceId),
    /// No edge with this key; the place may be last in its day.
    #[error("unknown edge {0}")]
    UnknownEdge(EdgeKey),
    /// An insertion index lies beyond the end of the day.
    #[error("position {position} is out of range for a day with {len} places")]
    InvalidPosition {
        /// Requested position.
        position: usize,
        /// Places in the target day.
        len: usize,
    },
    /// A transit option index does not exist on the edge.
    #[error("option {index} is out of range; the edge has {available} options")]
    InvalidOption {
        /// Requested option.
        index: usize,
        /// Options available.
        available: usize,
    },
    /// A plan must keep at least one day.
    #[error("cannot remove the only remaining day")]
    LastDay,
    /// Restored data broke a structural invariant.
    #[error("itinerary invariant violated: {detail}")]
    InvariantViolation {
        /// Description of the breach.
        detail: String,
    },
}
