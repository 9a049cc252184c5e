//! Structural mutations and the resolve/apply round trip.

use std::time::Duration;

use chrono::Days;
use geo::Coord;

use crate::RouteOutcome;

use super::{
    ApplyOutcome, Day, DayId, EdgeKey, EdgeResolution, EdgeState, EdgeTicket, Invalidation,
    ItineraryError, Lodging, NewPlace, Place, PlaceId, Plan, TransportEdge, TransportMode,
    Waypoint,
    policy::{self, Topology},
};

impl Plan {
    /// Insert a place into `day` at `position`, or append it when `position`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::UnknownDay`] or
    /// [`ItineraryError::InvalidPosition`].
    pub fn add_place(
        &mut self,
        day: DayId,
        place: NewPlace,
        position: Option<usize>,
    ) -> Result<(PlaceId, Invalidation), ItineraryError> {
        let len = self
            .day(day)
            .ok_or(ItineraryError::UnknownDay(day))?
            .places
            .len();
        let position = position.unwrap_or(len);
        if position > len {
            return Err(ItineraryError::InvalidPosition { position, len });
        }
        let id = self.next_place_id();
        let before = Topology::capture(self);
        self.day_mut(day)?
            .places
            .insert(position, Place::from_new(id, place));
        let invalidation = policy::reconcile(self, &before)?;
        Ok((id, invalidation))
    }

    /// Remove a place and its outgoing edge.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::UnknownPlace`].
    pub fn remove_place(&mut self, id: PlaceId) -> Result<Invalidation, ItineraryError> {
        let before = Topology::capture(self);
        let (day, index) = self.place_slot(id)?;
        day.places.remove(index);
        policy::reconcile(self, &before)
    }

    /// Move a place to `to_index` within `to_day`, which may be its current
    /// day. `to_index` is interpreted after the place has been taken out.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::UnknownPlace`], [`ItineraryError::UnknownDay`]
    /// or [`ItineraryError::InvalidPosition`]. The plan is untouched on error.
    pub fn move_place(
        &mut self,
        id: PlaceId,
        to_day: DayId,
        to_index: usize,
    ) -> Result<Invalidation, ItineraryError> {
        let from_day = self
            .day_of(id)
            .map(|day| day.id)
            .ok_or(ItineraryError::UnknownPlace(id))?;
        let mut len = self
            .day(to_day)
            .ok_or(ItineraryError::UnknownDay(to_day))?
            .places
            .len();
        if from_day == to_day {
            len -= 1;
        }
        if to_index > len {
            return Err(ItineraryError::InvalidPosition {
                position: to_index,
                len,
            });
        }
        let before = Topology::capture(self);
        let (source, index) = self.place_slot(id)?;
        let place = source.places.remove(index);
        self.day_mut(to_day)?.places.insert(to_index, place);
        policy::reconcile(self, &before)
    }

    /// Choose the transport mode of an edge. The edge becomes pending unless
    /// it already resolved for the same mode.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::UnknownEdge`] when no such edge exists.
    pub fn set_transport_mode(
        &mut self,
        key: EdgeKey,
        mode: TransportMode,
    ) -> Result<Invalidation, ItineraryError> {
        let edge = self.edge_mut(key)?;
        let settled = matches!(
            edge.state(),
            EdgeState::Resolved { .. } | EdgeState::NoRoute | EdgeState::Pending
        );
        if edge.mode() == Some(mode) && settled {
            return Ok(Invalidation::default());
        }
        edge.set_mode(mode);
        Ok(std::iter::once(key).collect())
    }

    /// Pick which transit option an edge displays.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::UnknownEdge`] or
    /// [`ItineraryError::InvalidOption`] when the edge is not resolved or the
    /// index is out of range.
    pub fn select_option(&mut self, key: EdgeKey, index: usize) -> Result<(), ItineraryError> {
        let edge = self.edge_mut(key)?;
        let EdgeState::Resolved { outcome, selected } = edge.state_mut() else {
            return Err(ItineraryError::InvalidOption {
                index,
                available: 0,
            });
        };
        let available = outcome.option_count();
        if index >= available {
            return Err(ItineraryError::InvalidOption { index, available });
        }
        *selected = index;
        Ok(())
    }

    /// Set, replace or clear the lodging. Every lodging edge is refreshed.
    ///
    /// # Errors
    ///
    /// Propagates renumbering failures.
    pub fn set_lodging(&mut self, lodging: Option<Lodging>) -> Result<Invalidation, ItineraryError> {
        let before = Topology::capture(self);
        let mut refreshed = Invalidation::default();
        if lodging.is_some() {
            for day in &mut self.days {
                if let Some(edge) = day.lodging_edge.as_mut() {
                    *edge = TransportEdge::fresh(edge.mode());
                    refreshed.insert(EdgeKey::Lodging(day.id));
                }
            }
        }
        self.lodging = lodging;
        let mut invalidation = policy::reconcile(self, &before)?;
        invalidation.merge(refreshed);
        Ok(invalidation)
    }

    /// Change a place's address. The stored coordinate is dropped and every
    /// edge touching the place goes back to pending.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::UnknownPlace`].
    pub fn set_place_address(
        &mut self,
        id: PlaceId,
        address: impl Into<String>,
    ) -> Result<Invalidation, ItineraryError> {
        let (day, index) = self.place_slot(id)?;
        let day_id = day.id;
        let (earlier, rest) = day.places.split_at_mut(index);
        let place = rest.first_mut().ok_or(ItineraryError::UnknownPlace(id))?;
        place.address = address.into();
        place.coord = None;

        let mut invalidation = Invalidation::default();
        if place.edge.as_mut().is_some_and(TransportEdge::invalidate) {
            invalidation.insert(EdgeKey::Place(id));
        }
        if let Some(previous) = earlier.last_mut() {
            if previous.edge.as_mut().is_some_and(TransportEdge::invalidate) {
                invalidation.insert(EdgeKey::Place(previous.id));
            }
        } else if day.lodging_edge.as_mut().is_some_and(TransportEdge::invalidate) {
            invalidation.insert(EdgeKey::Lodging(day_id));
        }
        Ok(invalidation)
    }

    /// Update a place's planned stay and memo. No edge is affected.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::UnknownPlace`].
    pub fn set_place_notes(
        &mut self,
        id: PlaceId,
        stay: Option<Duration>,
        memo: Option<String>,
    ) -> Result<(), ItineraryError> {
        let place = self.place_mut(id)?;
        place.stay = stay;
        place.memo = memo;
        Ok(())
    }

    /// Append an empty day after the last one, extending the end date.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::DateOverflow`] past the calendar's end.
    pub fn add_day(&mut self) -> Result<DayId, ItineraryError> {
        let id = self.next_day_id();
        let number = u32::try_from(self.days.len() + 1).map_err(|_| ItineraryError::DateOverflow)?;
        let date = self
            .end_date
            .checked_add_days(Days::new(1))
            .ok_or(ItineraryError::DateOverflow)?;
        self.days.push(Day::empty(id, number, date));
        self.end_date = date;
        Ok(id)
    }

    /// Remove a day with its places. Later days move up one date.
    ///
    /// # Errors
    ///
    /// Returns [`ItineraryError::UnknownDay`], or [`ItineraryError::LastDay`]
    /// when `id` is the only day.
    pub fn remove_day(&mut self, id: DayId) -> Result<Invalidation, ItineraryError> {
        let index = self.day_index(id)?;
        if self.days.len() == 1 {
            return Err(ItineraryError::LastDay);
        }
        let before = Topology::capture(self);
        self.days.remove(index);
        policy::reconcile(self, &before)
    }

    /// Edges the planner should resolve: moded edges that are pending or
    /// failed, with their endpoints.
    #[must_use]
    pub fn edge_tickets(&self) -> Vec<EdgeTicket> {
        let mut tickets = Vec::new();
        for day in &self.days {
            if let (Some(edge), Some(lodging), Some(first)) = (
                day.lodging_edge.as_ref(),
                self.lodging.as_ref(),
                day.places.first(),
            ) {
                push_ticket(&mut tickets, EdgeKey::Lodging(day.id), edge, || {
                    (lodging.waypoint(), first)
                });
            }
            for pair in day.places.windows(2) {
                let [origin, destination] = pair else {
                    continue;
                };
                if let Some(edge) = origin.edge.as_ref() {
                    push_ticket(&mut tickets, EdgeKey::Place(origin.id), edge, || {
                        (origin.waypoint(), destination)
                    });
                }
            }
        }
        tickets
    }

    /// Write a resolution back to the edge named by `ticket`.
    ///
    /// Learnt coordinates are stored on any endpoint whose address is still
    /// the one that was geocoded. The edge itself is only updated when it
    /// still connects the same stops with the same mode; otherwise the
    /// result is discarded as [`ApplyOutcome::Stale`].
    pub fn apply_resolution(
        &mut self,
        ticket: &EdgeTicket,
        resolution: EdgeResolution,
    ) -> ApplyOutcome {
        self.adopt_coordinates(ticket, &resolution);
        if !self.still_matches(ticket) {
            return ApplyOutcome::Stale;
        }
        let Ok(edge) = self.edge_mut(ticket.key) else {
            return ApplyOutcome::Stale;
        };
        *edge.state_mut() = match resolution.result {
            Ok(RouteOutcome::NoRoute) => EdgeState::NoRoute,
            Ok(outcome) => EdgeState::Resolved {
                outcome,
                selected: 0,
            },
            Err(error) => EdgeState::Failed {
                reason: error.to_string(),
            },
        };
        ApplyOutcome::Applied
    }

    /// Whether the edge named by `ticket` still joins the same stops, with
    /// the same addresses, for the same mode.
    fn still_matches(&self, ticket: &EdgeTicket) -> bool {
        let Some(mode) = self.edge(ticket.key).and_then(TransportEdge::mode) else {
            return false;
        };
        let endpoints = match ticket.key {
            EdgeKey::Place(id) => self.day_of(id).and_then(|day| {
                day.places.windows(2).find_map(|pair| match pair {
                    [origin, next] if origin.id == id => Some((origin.waypoint(), next)),
                    _ => None,
                })
            }),
            EdgeKey::Lodging(day) => self
                .lodging
                .as_ref()
                .zip(self.day(day).and_then(|day| day.places.first()))
                .map(|(lodging, first)| (lodging.waypoint(), first)),
        };
        endpoints.is_some_and(|(origin, destination)| {
            mode == ticket.mode
                && destination.id == ticket.destination_id
                && same_stop(&origin, &ticket.origin)
                && same_stop(&destination.waypoint(), &ticket.destination)
        })
    }

    fn adopt_coordinates(&mut self, ticket: &EdgeTicket, resolution: &EdgeResolution) {
        if let Some(coord) = resolution.destination_coord {
            self.adopt_place_coord(ticket.destination_id, &ticket.destination.address, coord);
        }
        let Some(coord) = resolution.origin_coord else {
            return;
        };
        match ticket.key {
            EdgeKey::Place(id) => self.adopt_place_coord(id, &ticket.origin.address, coord),
            EdgeKey::Lodging(_) => {
                if let Some(lodging) = self.lodging.as_mut()
                    && lodging.address == ticket.origin.address
                    && lodging.coord.is_none()
                {
                    lodging.coord = Some(coord);
                }
            }
        }
    }

    fn adopt_place_coord(&mut self, id: PlaceId, address: &str, coord: Coord<f64>) {
        let Ok(place) = self.place_mut(id) else {
            return;
        };
        if place.address == address && place.coord.is_none() {
            place.coord = Some(coord);
        }
    }

    fn day_index(&self, id: DayId) -> Result<usize, ItineraryError> {
        self.days
            .iter()
            .position(|day| day.id == id)
            .ok_or(ItineraryError::UnknownDay(id))
    }

    fn day_mut(&mut self, id: DayId) -> Result<&mut Day, ItineraryError> {
        self.days
            .iter_mut()
            .find(|day| day.id == id)
            .ok_or(ItineraryError::UnknownDay(id))
    }

    /// The day holding `id` and the place's index within it.
    fn place_slot(&mut self, id: PlaceId) -> Result<(&mut Day, usize), ItineraryError> {
        self.days
            .iter_mut()
            .find_map(|day| {
                let index = day.places.iter().position(|place| place.id == id)?;
                Some((day, index))
            })
            .ok_or(ItineraryError::UnknownPlace(id))
    }

    fn place_mut(&mut self, id: PlaceId) -> Result<&mut Place, ItineraryError> {
        self.days
            .iter_mut()
            .flat_map(|day| day.places.iter_mut())
            .find(|place| place.id == id)
            .ok_or(ItineraryError::UnknownPlace(id))
    }

    fn edge_mut(&mut self, key: EdgeKey) -> Result<&mut TransportEdge, ItineraryError> {
        let edge = match key {
            EdgeKey::Place(id) => self.place_mut(id)?.edge.as_mut(),
            EdgeKey::Lodging(day) => self.day_mut(day)?.lodging_edge.as_mut(),
        };
        edge.ok_or(ItineraryError::UnknownEdge(key))
    }
}

fn push_ticket<'a>(
    tickets: &mut Vec<EdgeTicket>,
    key: EdgeKey,
    edge: &TransportEdge,
    endpoints: impl FnOnce() -> (Waypoint, &'a Place),
) {
    let Some(mode) = edge.mode().filter(|_| edge.needs_resolution()) else {
        return;
    };
    let (origin, destination) = endpoints();
    tickets.push(EdgeTicket {
        key,
        origin,
        destination: destination.waypoint(),
        destination_id: destination.id,
        mode,
    });
}

fn same_stop(current: &Waypoint, issued: &Waypoint) -> bool {
    current.label == issued.label && current.address == issued.address
}
