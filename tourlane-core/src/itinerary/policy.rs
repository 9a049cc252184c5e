//! Edge invalidation.
//!
//! Before a structural mutation the plan's topology is captured: every
//! place's successor and every day's lodging target. After the mutation and
//! renumbering, edges whose endpoints differ from the capture are replaced
//! with fresh ones; everything else keeps its state. The same pass enforces
//! the edge shape: last places carry no edge, lodging edges exist only on
//! non-empty days after the first when the plan has lodging.

use std::collections::{BTreeSet, HashMap};

use super::{DayId, EdgeKey, ItineraryError, PlaceId, Plan, TransportEdge};

/// Edges made stale by a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    edges: BTreeSet<EdgeKey>,
}

impl Invalidation {
    /// Stale edges in key order.
    pub fn keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges.iter().copied()
    }

    /// Whether `key` was invalidated.
    #[must_use]
    pub fn contains(&self, key: EdgeKey) -> bool {
        self.edges.contains(&key)
    }

    /// Number of stale edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether nothing was invalidated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Fold another invalidation into this one.
    pub fn merge(&mut self, other: Self) {
        self.edges.extend(other.edges);
    }

    pub(crate) fn insert(&mut self, key: EdgeKey) {
        self.edges.insert(key);
    }
}

impl FromIterator<EdgeKey> for Invalidation {
    fn from_iter<I: IntoIterator<Item = EdgeKey>>(iter: I) -> Self {
        Self {
            edges: iter.into_iter().collect(),
        }
    }
}

/// Snapshot of which stop follows which.
#[derive(Debug, Default)]
pub(crate) struct Topology {
    successors: HashMap<PlaceId, Option<PlaceId>>,
    lodging_targets: HashMap<DayId, PlaceId>,
}

impl Topology {
    pub(crate) fn capture(plan: &Plan) -> Self {
        let mut topology = Self::default();
        let has_lodging = plan.lodging.is_some();
        for day in &plan.days {
            let mut places = day.places.iter().peekable();
            while let Some(place) = places.next() {
                let successor = places.peek().map(|next| next.id);
                topology.successors.insert(place.id, successor);
            }
            if let Some(target) = lodging_target(day.number, has_lodging, &day.places) {
                topology.lodging_targets.insert(day.id, target);
            }
        }
        topology
    }
}

fn lodging_target(number: u32, has_lodging: bool, places: &[super::Place]) -> Option<PlaceId> {
    if number > 1 && has_lodging {
        places.first().map(|place| place.id)
    } else {
        None
    }
}

/// Renumber the plan and refresh every edge whose endpoints moved.
///
/// A replaced edge keeps its mode, or takes the plan's default mode when it
/// had none, and is pending if a mode is known.
pub(crate) fn reconcile(plan: &mut Plan, before: &Topology) -> Result<Invalidation, ItineraryError> {
    plan.renumber()?;
    let default_mode = plan.default_mode;
    let has_lodging = plan.lodging.is_some();
    let mut invalidation = Invalidation::default();

    for day in &mut plan.days {
        let ids: Vec<PlaceId> = day.places.iter().map(|place| place.id).collect();
        for (position, place) in day.places.iter_mut().enumerate() {
            let successor = ids.get(position + 1).copied();
            if successor.is_none() {
                place.edge = None;
                continue;
            }
            let unchanged = before.successors.get(&place.id) == Some(&successor);
            if unchanged && place.edge.is_some() {
                continue;
            }
            place.edge = Some(refreshed(place.edge.as_ref(), default_mode));
            invalidation.insert(EdgeKey::Place(place.id));
        }

        let Some(target) = lodging_target(day.number, has_lodging, &day.places) else {
            day.lodging_edge = None;
            continue;
        };
        let unchanged = before.lodging_targets.get(&day.id) == Some(&target);
        if unchanged && day.lodging_edge.is_some() {
            continue;
        }
        day.lodging_edge = Some(refreshed(day.lodging_edge.as_ref(), default_mode));
        invalidation.insert(EdgeKey::Lodging(day.id));
    }
    Ok(invalidation)
}

fn refreshed(
    previous: Option<&TransportEdge>,
    default_mode: Option<crate::TransportMode>,
) -> TransportEdge {
    TransportEdge::fresh(previous.and_then(TransportEdge::mode).or(default_mode))
}
