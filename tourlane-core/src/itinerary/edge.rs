//! Transport edges and the tickets used to resolve them off-thread.

use std::fmt;

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::{RouteError, RouteOutcome, RouteSummary, TransportMode};

use super::{DayId, PlaceId};

/// Identifies an edge by its origin node.
///
/// Place edges are keyed by their origin place; the lodging edge of a day is
/// keyed by the day. A day's first place is always the destination of the
/// lodging edge, so neither key needs the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "from", content = "id", rename_all = "snake_case")]
pub enum EdgeKey {
    /// Edge leaving a place towards the next place of the same day.
    Place(PlaceId),
    /// Edge from the lodging to the first place of a day.
    Lodging(DayId),
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Place(id) => write!(f, "place:{id}"),
            Self::Lodging(day) => write!(f, "lodging:{day}"),
        }
    }
}

/// Resolution state of an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EdgeState {
    /// No mode chosen yet.
    Unset,
    /// A mode is chosen and the edge awaits resolution.
    Pending,
    /// The edge holds a route.
    Resolved {
        /// Route returned by the resolver.
        outcome: RouteOutcome,
        /// Index of the transit option the user picked; `0` otherwise.
        #[serde(default)]
        selected: usize,
    },
    /// The vendor has no route for the chosen mode.
    NoRoute,
    /// Resolution failed; the edge can be retried.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

/// What the UI should show for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDisplay {
    /// Prompt the user to pick a mode.
    ChooseMode,
    /// Resolution in progress.
    Loading,
    /// Show a retry affordance.
    Retry,
    /// Explain that no route exists for the chosen mode.
    NoRouteForMode,
    /// Show the route.
    Ready,
}

/// The connection between two consecutive stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEdge {
    mode: Option<TransportMode>,
    state: EdgeState,
}

impl Default for TransportEdge {
    fn default() -> Self {
        Self::unset()
    }
}

impl TransportEdge {
    /// An edge with no mode chosen.
    #[must_use]
    pub const fn unset() -> Self {
        Self {
            mode: None,
            state: EdgeState::Unset,
        }
    }

    /// An edge awaiting resolution for `mode`.
    #[must_use]
    pub const fn pending(mode: TransportMode) -> Self {
        Self {
            mode: Some(mode),
            state: EdgeState::Pending,
        }
    }

    /// Rebuild an edge from persisted parts. A state other than `Unset`
    /// without a mode collapses to `Unset`.
    #[must_use]
    pub fn restore(mode: Option<TransportMode>, state: EdgeState) -> Self {
        match mode {
            Some(_) => Self { mode, state },
            None => Self::unset(),
        }
    }

    pub(crate) const fn fresh(mode: Option<TransportMode>) -> Self {
        match mode {
            Some(mode) => Self::pending(mode),
            None => Self::unset(),
        }
    }

    /// Chosen mode.
    #[must_use]
    pub const fn mode(&self) -> Option<TransportMode> {
        self.mode
    }

    /// Resolution state.
    #[must_use]
    pub const fn state(&self) -> &EdgeState {
        &self.state
    }

    /// Display state for the UI.
    #[must_use]
    pub const fn display(&self) -> EdgeDisplay {
        match self.state {
            EdgeState::Unset => EdgeDisplay::ChooseMode,
            EdgeState::Pending => EdgeDisplay::Loading,
            EdgeState::Resolved { .. } => EdgeDisplay::Ready,
            EdgeState::NoRoute => EdgeDisplay::NoRouteForMode,
            EdgeState::Failed { .. } => EdgeDisplay::Retry,
        }
    }

    /// Whether the planner should resolve this edge.
    #[must_use]
    pub const fn needs_resolution(&self) -> bool {
        self.mode.is_some() && matches!(self.state, EdgeState::Pending | EdgeState::Failed { .. })
    }

    /// Summary of the selected option, when resolved.
    #[must_use]
    pub fn summary(&self) -> Option<&RouteSummary> {
        match &self.state {
            EdgeState::Resolved { outcome, selected } => outcome.option_summary(*selected),
            _ => None,
        }
    }

    /// Move a moded edge back to `Pending`. Returns whether anything changed.
    pub(crate) fn invalidate(&mut self) -> bool {
        if self.mode.is_none() || self.state == EdgeState::Pending {
            return false;
        }
        self.state = EdgeState::Pending;
        true
    }

    pub(crate) fn set_mode(&mut self, mode: TransportMode) {
        self.mode = Some(mode);
        self.state = EdgeState::Pending;
    }

    pub(crate) const fn state_mut(&mut self) -> &mut EdgeState {
        &mut self.state
    }
}

/// A stop as seen by the planner: what to geocode and what is already known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Display name.
    pub label: String,
    /// Street address; may be empty.
    pub address: String,
    /// Location, when already resolved.
    pub coord: Option<Coord<f64>>,
}

impl Waypoint {
    /// Query to geocode first: the address when present, otherwise the name.
    #[must_use]
    pub fn primary_query(&self) -> &str {
        if self.address.trim().is_empty() {
            &self.label
        } else {
            &self.address
        }
    }

    /// Secondary query worth trying when the primary one finds nothing.
    #[must_use]
    pub fn fallback_query(&self) -> Option<&str> {
        let label = self.label.trim();
        (!label.is_empty() && label != self.primary_query().trim()).then_some(&*self.label)
    }
}

/// Everything needed to resolve one edge without holding the plan.
///
/// Tickets are produced by [`crate::Plan::edge_tickets`] and handed back with
/// their [`EdgeResolution`] to [`crate::Plan::apply_resolution`], which checks
/// that the edge still connects the same stops with the same mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeTicket {
    /// Edge being resolved.
    pub key: EdgeKey,
    /// Starting stop.
    pub origin: Waypoint,
    /// Destination stop.
    pub destination: Waypoint,
    /// Place at the destination end.
    pub destination_id: PlaceId,
    /// Mode to resolve for.
    pub mode: TransportMode,
}

/// Result of resolving an [`EdgeTicket`].
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeResolution {
    /// Route or failure.
    pub result: Result<RouteOutcome, RouteError>,
    /// Origin coordinate learnt while resolving, to write back.
    pub origin_coord: Option<Coord<f64>>,
    /// Destination coordinate learnt while resolving, to write back.
    pub destination_coord: Option<Coord<f64>>,
}

impl EdgeResolution {
    /// A resolution that learnt no coordinates.
    #[must_use]
    pub const fn from_result(result: Result<RouteOutcome, RouteError>) -> Self {
        Self {
            result,
            origin_coord: None,
            destination_coord: None,
        }
    }
}

/// Whether a resolution was written to the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The edge took the new state.
    Applied,
    /// The edge changed while resolution was in flight; nothing was written
    /// to it.
    Stale,
}
