//! The itinerary model: plan → day → place, plus the synthetic lodging node
//! that starts every day after the first.
//!
//! All structural mutations go through [`Plan`] methods. Each one renumbers
//! order indices before edges are evaluated and returns the [`Invalidation`]
//! naming the edges whose endpoints changed. Edges whose endpoints did not
//! change keep their state, so a reorder never re-resolves an entire day.

mod edge;
mod error;
mod mutation;
mod policy;

use std::{fmt, time::Duration};

use chrono::{Days, NaiveDate};
use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::TransportMode;

pub use edge::{
    ApplyOutcome, EdgeDisplay, EdgeKey, EdgeResolution, EdgeState, EdgeTicket, TransportEdge,
    Waypoint,
};
pub use error::ItineraryError;
pub use policy::Invalidation;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a [`Plan`].
    PlanId
);
id_type!(
    /// Identifier of a [`Day`], unique within its plan.
    DayId
);
id_type!(
    /// Identifier of a [`Place`], unique within its plan.
    PlaceId
);
id_type!(
    /// Identifier of a site user.
    UserId
);

/// Accommodation used as the starting point of every day after the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lodging {
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Resolved location, filled in by the planner.
    #[serde(default)]
    pub coord: Option<Coord<f64>>,
}

impl Lodging {
    /// Lodging with an unresolved location.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            coord: None,
        }
    }

    pub(crate) fn waypoint(&self) -> Waypoint {
        Waypoint {
            label: self.name.clone(),
            address: self.address.clone(),
            coord: self.coord,
        }
    }
}

/// Whether a plan is visible publicly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PublicationState {
    /// Visible to the owner and collaborators only.
    #[default]
    Private,
    /// Readable by anyone through the snapshot slug. The plan data is shared,
    /// not copied.
    Published {
        /// Public reference to the plan.
        slug: String,
    },
}

/// Input for [`Plan::add_place`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPlace {
    /// Display name.
    pub name: String,
    /// Street address; may be empty when only a name is known.
    pub address: String,
    /// Location, when already known.
    #[serde(default)]
    pub coord: Option<Coord<f64>>,
    /// Planned stay.
    #[serde(default)]
    pub stay: Option<Duration>,
    /// Free-form note.
    #[serde(default)]
    pub memo: Option<String>,
}

impl NewPlace {
    /// A place with the given name and address.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ..Self::default()
        }
    }

    /// Attach a known location.
    #[must_use]
    pub const fn with_coord(mut self, coord: Coord<f64>) -> Self {
        self.coord = Some(coord);
        self
    }

    /// Attach a planned stay.
    #[must_use]
    pub const fn with_stay(mut self, stay: Duration) -> Self {
        self.stay = Some(stay);
        self
    }
}

/// A visitable location within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    id: PlaceId,
    name: String,
    address: String,
    #[serde(default)]
    coord: Option<Coord<f64>>,
    order_index: u32,
    #[serde(default)]
    edge: Option<TransportEdge>,
    #[serde(default)]
    stay: Option<Duration>,
    #[serde(default)]
    memo: Option<String>,
}

impl Place {
    fn from_new(id: PlaceId, new: NewPlace) -> Self {
        Self {
            id,
            name: new.name,
            address: new.address,
            coord: new.coord,
            order_index: 0,
            edge: None,
            stay: new.stay,
            memo: new.memo,
        }
    }

    /// Rebuild a place from persisted parts. The owning plan renumbers the
    /// order index and repairs the edge shape when it is restored.
    #[must_use]
    pub fn restore(
        id: PlaceId,
        details: NewPlace,
        order_index: u32,
        edge: Option<TransportEdge>,
    ) -> Self {
        Self {
            order_index,
            edge,
            ..Self::from_new(id, details)
        }
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> PlaceId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Street address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Resolved location.
    #[must_use]
    pub const fn coord(&self) -> Option<Coord<f64>> {
        self.coord
    }

    /// Zero-based position within the day.
    #[must_use]
    pub const fn order_index(&self) -> u32 {
        self.order_index
    }

    /// Outgoing edge to the next place; `None` for the last place of a day.
    #[must_use]
    pub const fn edge(&self) -> Option<&TransportEdge> {
        self.edge.as_ref()
    }

    /// Planned stay.
    #[must_use]
    pub const fn stay(&self) -> Option<Duration> {
        self.stay
    }

    /// Free-form note.
    #[must_use]
    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub(crate) fn waypoint(&self) -> Waypoint {
        Waypoint {
            label: self.name.clone(),
            address: self.address.clone(),
            coord: self.coord,
        }
    }
}

/// One calendar day of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    id: DayId,
    number: u32,
    date: NaiveDate,
    #[serde(default)]
    places: Vec<Place>,
    #[serde(default)]
    lodging_edge: Option<TransportEdge>,
}

impl Day {
    fn empty(id: DayId, number: u32, date: NaiveDate) -> Self {
        Self {
            id,
            number,
            date,
            places: Vec::new(),
            lodging_edge: None,
        }
    }

    /// Rebuild a day from persisted parts. Places are ordered by their stored
    /// order index; the owning plan renumbers everything on restore.
    #[must_use]
    pub fn restore(
        id: DayId,
        number: u32,
        date: NaiveDate,
        mut places: Vec<Place>,
        lodging_edge: Option<TransportEdge>,
    ) -> Self {
        places.sort_by_key(Place::order_index);
        Self {
            id,
            number,
            date,
            places,
            lodging_edge,
        }
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> DayId {
        self.id
    }

    /// One-based day number.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Calendar date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Places in visiting order.
    #[must_use]
    pub fn places(&self) -> &[Place] {
        &self.places
    }

    /// Edge from the lodging to the first place; only present on days after
    /// the first when the plan has lodging and the day has places.
    #[must_use]
    pub const fn lodging_edge(&self) -> Option<&TransportEdge> {
        self.lodging_edge.as_ref()
    }
}

/// A user's multi-day trip itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    id: PlanId,
    owner: UserId,
    /// Title shown in listings.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default)]
    lodging: Option<Lodging>,
    /// Publication state.
    #[serde(default)]
    pub publication: PublicationState,
    /// Like counter.
    #[serde(default)]
    pub likes: u64,
    /// View counter.
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    default_mode: Option<TransportMode>,
    days: Vec<Day>,
}

impl Plan {
    /// Create a plan with one empty day per date in `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::InvalidDateRange`] when `end` precedes
    /// `start`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use tourlane_core::{Plan, PlanId, UserId};
    ///
    /// # fn main() -> Result<(), tourlane_core::ItineraryError> {
    /// let start = NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid date");
    /// let end = NaiveDate::from_ymd_opt(2026, 5, 3).expect("valid date");
    /// let plan = Plan::new(PlanId(1), UserId(7), "Spring weekend", start, end)?;
    /// assert_eq!(plan.days().len(), 3);
    /// assert_eq!(plan.days()[2].number(), 3);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        id: PlanId,
        owner: UserId,
        title: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ItineraryError> {
        if end_date < start_date {
            return Err(ItineraryError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        let days = start_date
            .iter_days()
            .take_while(|date| *date <= end_date)
            .zip(1_u32..)
            .map(|(date, number)| Day::empty(DayId(u64::from(number)), number, date))
            .collect();
        Ok(Self {
            id,
            owner,
            title: title.into(),
            description: None,
            start_date,
            end_date,
            lodging: None,
            publication: PublicationState::Private,
            likes: 0,
            views: 0,
            default_mode: None,
            days,
        })
    }

    /// Replace the days of a plan header built with [`Plan::new`] by
    /// persisted ones.
    ///
    /// Days are ordered by number and renumbered, dates are re-derived from
    /// the start date, place indices are renumbered and the edge shape is
    /// repaired. Existing edges whose endpoints are intact keep their state.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::InvariantViolation`] when day or place ids
    /// repeat, or when no days are supplied.
    pub fn restore(mut self, mut days: Vec<Day>) -> Result<Self, ItineraryError> {
        days.sort_by_key(Day::number);
        self.days = days;
        self.normalised()
    }

    /// Repair a plan obtained by deserialisation: renumber, re-derive dates
    /// and fix the edge shape, keeping intact edges.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::InvariantViolation`] when day or place ids
    /// repeat, or when the plan has no days.
    pub fn normalised(mut self) -> Result<Self, ItineraryError> {
        self.check_unique_ids()?;
        self.normalise()?;
        Ok(self)
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> PlanId {
        self.id
    }

    /// Owning user.
    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    /// First day of the trip.
    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Last day of the trip.
    #[must_use]
    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Accommodation, if set.
    #[must_use]
    pub const fn lodging(&self) -> Option<&Lodging> {
        self.lodging.as_ref()
    }

    /// Mode assigned to newly created edges; `None` leaves them unset.
    #[must_use]
    pub const fn default_mode(&self) -> Option<TransportMode> {
        self.default_mode
    }

    /// Change the mode assigned to edges created from now on.
    pub const fn set_default_mode(&mut self, mode: Option<TransportMode>) {
        self.default_mode = mode;
    }

    /// Days in order.
    #[must_use]
    pub fn days(&self) -> &[Day] {
        &self.days
    }

    /// Look up a day.
    #[must_use]
    pub fn day(&self, id: DayId) -> Option<&Day> {
        self.days.iter().find(|day| day.id == id)
    }

    /// Look up a place anywhere in the plan.
    #[must_use]
    pub fn place(&self, id: PlaceId) -> Option<&Place> {
        self.days
            .iter()
            .flat_map(|day| day.places.iter())
            .find(|place| place.id == id)
    }

    /// Day containing `place`.
    #[must_use]
    pub fn day_of(&self, place: PlaceId) -> Option<&Day> {
        self.days
            .iter()
            .find(|day| day.places.iter().any(|candidate| candidate.id == place))
    }

    /// Total number of places; the cheap structural fingerprint compared by
    /// collaboration polling.
    #[must_use]
    pub fn place_count(&self) -> usize {
        self.days.iter().map(|day| day.places.len()).sum()
    }

    /// Look up an edge.
    #[must_use]
    pub fn edge(&self, key: EdgeKey) -> Option<&TransportEdge> {
        match key {
            EdgeKey::Place(id) => self.place(id).and_then(Place::edge),
            EdgeKey::Lodging(day) => self.day(day).and_then(Day::lodging_edge),
        }
    }

    /// Every edge in the plan, day by day with the lodging edge first.
    #[must_use]
    pub fn edges(&self) -> Vec<(EdgeKey, &TransportEdge)> {
        let mut edges = Vec::new();
        for day in &self.days {
            if let Some(edge) = day.lodging_edge.as_ref() {
                edges.push((EdgeKey::Lodging(day.id), edge));
            }
            for place in &day.places {
                if let Some(edge) = place.edge.as_ref() {
                    edges.push((EdgeKey::Place(place.id), edge));
                }
            }
        }
        edges
    }

    /// Verify the structural invariants: contiguous one-based day numbers in
    /// date order, contiguous zero-based place indices, exactly one edge per
    /// non-last place, and lodging edges exactly where required.
    ///
    /// Mutations keep these invariants by construction; the check exists for
    /// tests and for auditing restored data.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::InvariantViolation`] describing the first
    /// breach found.
    pub fn check_invariants(&self) -> Result<(), ItineraryError> {
        self.check_unique_ids()?;
        let mut previous_date = None;
        for (day, expected_number) in self.days.iter().zip(1_u32..) {
            if day.number != expected_number {
                return Err(violation(format!(
                    "day {} has number {} at position {expected_number}",
                    day.id, day.number
                )));
            }
            if previous_date.is_some_and(|previous| previous >= day.date) {
                return Err(violation(format!("day {} is out of date order", day.id)));
            }
            previous_date = Some(day.date);
            self.check_day_edges(day)?;
        }
        Ok(())
    }

    fn check_day_edges(&self, day: &Day) -> Result<(), ItineraryError> {
        let last = day.places.len().checked_sub(1);
        for (position, place) in day.places.iter().enumerate() {
            if usize::try_from(place.order_index).ok() != Some(position) {
                return Err(violation(format!(
                    "place {} has index {} at position {position}",
                    place.id, place.order_index
                )));
            }
            let is_last = Some(position) == last;
            if is_last == place.edge.is_some() {
                return Err(violation(format!("place {} has a malformed edge", place.id)));
            }
        }
        let wants_lodging = day.number > 1 && self.lodging.is_some() && !day.places.is_empty();
        if wants_lodging != day.lodging_edge.is_some() {
            return Err(violation(format!(
                "day {} has a malformed lodging edge",
                day.id
            )));
        }
        Ok(())
    }

    fn check_unique_ids(&self) -> Result<(), ItineraryError> {
        if self.days.is_empty() {
            return Err(violation("plan has no days".to_owned()));
        }
        let mut days = std::collections::HashSet::new();
        let mut places = std::collections::HashSet::new();
        for day in &self.days {
            if !days.insert(day.id) {
                return Err(violation(format!("day id {} repeats", day.id)));
            }
            for place in &day.places {
                if !places.insert(place.id) {
                    return Err(violation(format!("place id {} repeats", place.id)));
                }
            }
        }
        Ok(())
    }

    /// Renumber days and places and re-derive dates from the start date.
    fn renumber(&mut self) -> Result<(), ItineraryError> {
        let start = self.start_date;
        for (offset, day) in (0_u64..).zip(self.days.iter_mut()) {
            day.number = u32::try_from(offset + 1).map_err(|_| ItineraryError::DateOverflow)?;
            day.date = start
                .checked_add_days(Days::new(offset))
                .ok_or(ItineraryError::DateOverflow)?;
            for (index, place) in (0_u32..).zip(day.places.iter_mut()) {
                place.order_index = index;
            }
        }
        self.end_date = self.days.last().map_or(start, |day| day.date);
        Ok(())
    }

    fn normalise(&mut self) -> Result<Invalidation, ItineraryError> {
        self.renumber()?;
        let topology = policy::Topology::capture(self);
        policy::reconcile(self, &topology)
    }

    fn next_place_id(&self) -> PlaceId {
        let max = self
            .days
            .iter()
            .flat_map(|day| day.places.iter())
            .map(|place| place.id.0)
            .max()
            .unwrap_or(0);
        PlaceId(max + 1)
    }

    fn next_day_id(&self) -> DayId {
        let max = self.days.iter().map(|day| day.id.0).max().unwrap_or(0);
        DayId(max + 1)
    }
}

fn violation(detail: String) -> ItineraryError {
    ItineraryError::InvariantViolation { detail }
}
