//! Collaborators, invites and permission checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Plan, PlanId, UserId};

/// Most participants a plan may have, owner included.
pub const MAX_PARTICIPANTS: usize = 10;

/// Access level on a plan. Ordered from least to most capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read the plan.
    View,
    /// Mutate the itinerary.
    Edit,
    /// Manage collaborators and invites.
    Admin,
}

impl Permission {
    /// Storage and wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Admin => "admin",
        }
    }

    /// Parse a storage name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "view" => Some(Self::View),
            "edit" => Some(Self::Edit),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// A user with access to a plan they do not own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    /// Plan shared.
    pub plan_id: PlanId,
    /// Invited user.
    pub user_id: UserId,
    /// Granted access.
    pub permission: Permission,
}

/// A short-lived token that grants access when redeemed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    /// Opaque token handed to invitees.
    pub token: String,
    /// Plan the invite grants access to.
    pub plan_id: PlanId,
    /// Access granted on redemption.
    pub permission: Permission,
    /// Instant after which the invite is void.
    pub expires_at: DateTime<Utc>,
    /// Redemptions allowed.
    pub max_uses: u32,
    /// Redemptions so far.
    pub uses: u32,
}

/// Reasons an invite cannot be redeemed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InviteError {
    /// No invite carries the token.
    #[error("invite not found")]
    Unknown,
    /// The invite expired.
    #[error("invite expired at {expires_at}")]
    Expired {
        /// Expiry instant.
        expires_at: DateTime<Utc>,
    },
    /// Every use has been consumed.
    #[error("invite has been used {max_uses} times already")]
    Exhausted {
        /// Redemptions allowed.
        max_uses: u32,
    },
    /// The plan already has the maximum number of participants.
    #[error("plan already has {limit} participants")]
    PlanFull {
        /// Participant cap.
        limit: usize,
    },
    /// The user already participates in the plan.
    #[error("user {0} already participates in the plan")]
    AlreadyMember(UserId),
}

impl Invite {
    /// Check whether `user` may redeem the invite at `now`.
    ///
    /// `participants` counts the owner plus existing collaborators and
    /// `is_member` says whether `user` is already one of them.
    ///
    /// # Errors
    ///
    /// Returns the first [`InviteError`] that applies, checking expiry, then
    /// use count, then membership, then the participant cap.
    pub fn check_redeemable(
        &self,
        now: DateTime<Utc>,
        participants: usize,
        user: UserId,
        is_member: bool,
    ) -> Result<(), InviteError> {
        if now >= self.expires_at {
            return Err(InviteError::Expired {
                expires_at: self.expires_at,
            });
        }
        if self.uses >= self.max_uses {
            return Err(InviteError::Exhausted {
                max_uses: self.max_uses,
            });
        }
        if is_member {
            return Err(InviteError::AlreadyMember(user));
        }
        if participants >= MAX_PARTICIPANTS {
            return Err(InviteError::PlanFull {
                limit: MAX_PARTICIPANTS,
            });
        }
        Ok(())
    }
}

/// A user lacks the access an operation needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("user {user} needs {required:?} access to plan {plan}")]
pub struct AccessError {
    /// Plan involved.
    pub plan: PlanId,
    /// Acting user.
    pub user: UserId,
    /// Access the operation needs.
    pub required: Permission,
}

/// Effective permission of `user` on `plan`. The owner holds
/// [`Permission::Admin`]; everyone else gets their collaborator grant.
#[must_use]
pub fn permission_for(
    plan: &Plan,
    collaborators: &[Collaborator],
    user: UserId,
) -> Option<Permission> {
    if plan.owner() == user {
        return Some(Permission::Admin);
    }
    collaborators
        .iter()
        .find(|collaborator| collaborator.plan_id == plan.id() && collaborator.user_id == user)
        .map(|collaborator| collaborator.permission)
}

/// Require at least `required` access.
///
/// # Errors
///
/// Returns [`AccessError`] when the user's permission is absent or lower.
pub fn require(
    plan: &Plan,
    collaborators: &[Collaborator],
    user: UserId,
    required: Permission,
) -> Result<Permission, AccessError> {
    permission_for(plan, collaborators, user)
        .filter(|granted| *granted >= required)
        .ok_or(AccessError {
            plan: plan.id(),
            user,
            required,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use rstest::{fixture, rstest};

    #[fixture]
    fn plan() -> Plan {
        let day = NaiveDate::from_ymd_opt(2026, 5, 1).expect("valid date");
        Plan::new(PlanId(3), UserId(1), "t", day, day).expect("plan")
    }

    fn expiry() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0)
            .single()
            .expect("instant")
    }

    #[fixture]
    fn invite() -> Invite {
        Invite {
            token: "abc".into(),
            plan_id: PlanId(3),
            permission: Permission::Edit,
            expires_at: expiry(),
            max_uses: 2,
            uses: 0,
        }
    }

    #[rstest]
    fn owner_is_admin(plan: Plan) {
        assert_eq!(permission_for(&plan, &[], UserId(1)), Some(Permission::Admin));
        assert_eq!(permission_for(&plan, &[], UserId(2)), None);
    }

    #[rstest]
    fn require_compares_permission_levels(plan: Plan) {
        let collaborators = [Collaborator {
            plan_id: PlanId(3),
            user_id: UserId(2),
            permission: Permission::View,
        }];
        assert!(require(&plan, &collaborators, UserId(2), Permission::View).is_ok());
        let err = require(&plan, &collaborators, UserId(2), Permission::Edit).expect_err("denied");
        assert_eq!(err.required, Permission::Edit);
    }

    #[rstest]
    #[case(Duration::hours(1), 0, 1, false, Some(InviteError::Expired { expires_at: expiry() }))]
    #[case(Duration::hours(-1), 2, 1, false, Some(InviteError::Exhausted { max_uses: 2 }))]
    #[case(Duration::hours(-1), 0, 3, true, Some(InviteError::AlreadyMember(UserId(9))))]
    #[case(Duration::hours(-1), 0, MAX_PARTICIPANTS, false, Some(InviteError::PlanFull { limit: MAX_PARTICIPANTS }))]
    #[case(Duration::hours(-1), 1, MAX_PARTICIPANTS - 1, false, None)]
    fn redeem_checks_apply_in_order(
        invite: Invite,
        #[case] offset: Duration,
        #[case] uses: u32,
        #[case] participants: usize,
        #[case] is_member: bool,
        #[case] expected: Option<InviteError>,
    ) {
        let invite = Invite { uses, ..invite };
        let now = invite.expires_at + offset;
        let result = invite.check_redeemable(now, participants, UserId(9), is_member);
        assert_eq!(result.err(), expected);
    }

    #[rstest]
    fn permission_names_round_trip() {
        for permission in [Permission::View, Permission::Edit, Permission::Admin] {
            assert_eq!(Permission::parse(permission.as_str()), Some(permission));
        }
    }
}
