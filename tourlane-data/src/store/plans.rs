//! Plan, collaborator and invite persistence.
//!
//! Plans are written whole: the header row is upserted and the plan's days
//! and places are replaced inside one transaction, so concurrent editors get
//! last-write-wins at plan granularity. Like and view counters and the
//! publication slug are owned by their dedicated operations and are never
//! overwritten by [`SqlitePlanStore::save_plan`].

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use geo::Coord;
use log::{debug, info};
use rand::{Rng, distributions::Alphanumeric};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tourlane_core::{
    AccessError, Collaborator, Day, DayId, Invite, InviteError, Lodging, NewPlace, Permission,
    Place, PlaceId, Plan, PlanId, PublicationState, TransportEdge, TransportMode, UserId,
    collab::require,
};

use super::{Database, StoreError, error::sqlite, now_secs, sql_id, stored_id};

/// Length of generated invite tokens.
const INVITE_TOKEN_LEN: usize = 24;

/// Length of the random part of publication slugs.
const SLUG_SUFFIX_LEN: usize = 10;

/// Plan store backed by SQLite.
///
/// Mutating operations take the acting user and check their permission:
/// editing needs [`Permission::Edit`], publishing and inviting need
/// [`Permission::Admin`], and deleting is reserved to the owner.
#[derive(Debug, Clone)]
pub struct SqlitePlanStore {
    database: Database,
}

impl SqlitePlanStore {
    /// Store backed by `database`.
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    /// Create and persist an empty plan owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Itinerary`] for an invalid date range, or a
    /// SQLite error.
    pub fn create_plan(
        &self,
        owner: UserId,
        title: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Plan, StoreError> {
        self.database.with_connection(|connection| {
            let transaction = connection
                .transaction()
                .map_err(sqlite("begin create plan"))?;
            let next: i64 = transaction
                .query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM plans", [], |row| {
                    row.get(0)
                })
                .map_err(sqlite("allocate plan id"))?;
            let plan = Plan::new(PlanId(stored_id(next, "plan id")?), owner, title, start, end)?;
            write_plan(&transaction, &plan)?;
            transaction.commit().map_err(sqlite("commit create plan"))?;
            info!("created plan {} for user {owner}", plan.id());
            Ok(plan)
        })
    }

    /// Persist `plan` without a permission check.
    ///
    /// # Errors
    ///
    /// Returns a SQLite or encoding error.
    pub fn save_plan(&self, plan: &Plan) -> Result<(), StoreError> {
        self.database.with_connection(|connection| {
            let transaction = connection.transaction().map_err(sqlite("begin save plan"))?;
            write_plan(&transaction, plan)?;
            transaction.commit().map_err(sqlite("commit save plan"))
        })
    }

    /// Persist `plan` on behalf of `user`, who needs edit access to the
    /// stored plan. Ownership cannot be changed this way.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PlanNotFound`] for unknown plans and
    /// [`StoreError::Forbidden`] when `user` lacks edit access.
    pub fn update_plan(&self, user: UserId, plan: &Plan) -> Result<(), StoreError> {
        self.database.with_connection(|connection| {
            let transaction = connection
                .transaction()
                .map_err(sqlite("begin update plan"))?;
            let stored = read_plan(&transaction, plan.id())?;
            let collaborators = read_collaborators(&transaction, plan.id())?;
            require(&stored, &collaborators, user, Permission::Edit)?;
            if stored.owner() != plan.owner() {
                return Err(StoreError::Forbidden(AccessError {
                    plan: plan.id(),
                    user,
                    required: Permission::Admin,
                }));
            }
            write_plan(&transaction, plan)?;
            transaction.commit().map_err(sqlite("commit update plan"))?;
            debug!("user {user} updated plan {}", plan.id());
            Ok(())
        })
    }

    /// Load a plan without a permission check.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PlanNotFound`] for unknown plans, or a decoding
    /// error for corrupt rows.
    pub fn load_plan(&self, id: PlanId) -> Result<Plan, StoreError> {
        self.database
            .with_connection(|connection| read_plan(connection, id))
    }

    /// Load a plan for `user`, who needs view access unless the plan is
    /// published.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Forbidden`] when `user` may not see the plan.
    pub fn load_plan_for(&self, user: UserId, id: PlanId) -> Result<Plan, StoreError> {
        self.database.with_connection(|connection| {
            let plan = read_plan(connection, id)?;
            if !matches!(plan.publication, PublicationState::Published { .. }) {
                let collaborators = read_collaborators(connection, id)?;
                require(&plan, &collaborators, user, Permission::View)?;
            }
            Ok(plan)
        })
    }

    /// Number of places in a stored plan.
    ///
    /// # Errors
    ///
    /// Returns a SQLite error.
    pub fn place_count(&self, id: PlanId) -> Result<usize, StoreError> {
        let count: i64 = self.database.with_connection(|connection| {
            connection
                .query_row(
                    "SELECT COUNT(*) FROM places WHERE plan_id = ?1",
                    [sql_id(id.0)?],
                    |row| row.get(0),
                )
                .map_err(sqlite("count places"))
        })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Delete a plan. Only the owner may do this.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Forbidden`] for anyone but the owner.
    pub fn delete_plan(&self, user: UserId, id: PlanId) -> Result<(), StoreError> {
        self.database.with_connection(|connection| {
            let owner = read_owner(connection, id)?;
            if owner != user {
                return Err(StoreError::Forbidden(AccessError {
                    plan: id,
                    user,
                    required: Permission::Admin,
                }));
            }
            connection
                .execute("DELETE FROM plans WHERE id = ?1", [sql_id(id.0)?])
                .map_err(sqlite("delete plan"))?;
            info!("user {user} deleted plan {id}");
            Ok(())
        })
    }

    /// Publish a plan and return its slug. Publishing an already published
    /// plan returns the existing slug. The public view reads the live plan.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Forbidden`] when `user` is not an admin.
    pub fn publish(&self, user: UserId, id: PlanId) -> Result<String, StoreError> {
        self.database.with_connection(|connection| {
            let plan = read_plan(connection, id)?;
            let collaborators = read_collaborators(connection, id)?;
            require(&plan, &collaborators, user, Permission::Admin)?;
            if let PublicationState::Published { slug } = plan.publication {
                return Ok(slug);
            }
            let slug = format!("{id}-{}", random_token(SLUG_SUFFIX_LEN).to_ascii_lowercase());
            connection
                .execute(
                    "UPDATE plans SET slug = ?1 WHERE id = ?2",
                    params![slug, sql_id(id.0)?],
                )
                .map_err(sqlite("publish plan"))?;
            info!("plan {id} published as {slug}");
            Ok(slug)
        })
    }

    /// Withdraw a published plan.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Forbidden`] when `user` is not an admin.
    pub fn unpublish(&self, user: UserId, id: PlanId) -> Result<(), StoreError> {
        self.database.with_connection(|connection| {
            let plan = read_plan(connection, id)?;
            let collaborators = read_collaborators(connection, id)?;
            require(&plan, &collaborators, user, Permission::Admin)?;
            connection
                .execute("UPDATE plans SET slug = NULL WHERE id = ?1", [sql_id(id.0)?])
                .map(|_| ())
                .map_err(sqlite("unpublish plan"))
        })
    }

    /// Find a published plan by slug.
    ///
    /// # Errors
    ///
    /// Returns a SQLite or decoding error.
    pub fn find_published(&self, slug: &str) -> Result<Option<Plan>, StoreError> {
        self.database.with_connection(|connection| {
            let id: Option<i64> = connection
                .query_row("SELECT id FROM plans WHERE slug = ?1", [slug], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(sqlite("find published plan"))?;
            id.map(|id| read_plan(connection, PlanId(stored_id(id, "plan id")?)))
                .transpose()
        })
    }

    /// Count a view and return the new total.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PlanNotFound`] for unknown plans.
    pub fn record_view(&self, id: PlanId) -> Result<u64, StoreError> {
        self.database.with_connection(|connection| {
            let views: Option<i64> = connection
                .query_row(
                    "UPDATE plans SET views = views + 1 WHERE id = ?1 RETURNING views",
                    [sql_id(id.0)?],
                    |row| row.get(0),
                )
                .optional()
                .map_err(sqlite("record view"))?;
            let views = views.ok_or(StoreError::PlanNotFound(id))?;
            Ok(u64::try_from(views).unwrap_or_default())
        })
    }

    /// Like a plan once per user. Returns whether the like was new.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PlanNotFound`] for unknown plans.
    pub fn like(&self, user: UserId, id: PlanId) -> Result<bool, StoreError> {
        self.database.with_connection(|connection| {
            read_owner(connection, id)?;
            let transaction = connection.transaction().map_err(sqlite("begin like"))?;
            let inserted = transaction
                .execute(
                    "INSERT OR IGNORE INTO plan_likes (plan_id, user_id) VALUES (?1, ?2)",
                    params![sql_id(id.0)?, sql_id(user.0)?],
                )
                .map_err(sqlite("insert like"))?;
            if inserted > 0 {
                transaction
                    .execute(
                        "UPDATE plans SET likes = likes + 1 WHERE id = ?1",
                        [sql_id(id.0)?],
                    )
                    .map_err(sqlite("count like"))?;
            }
            transaction.commit().map_err(sqlite("commit like"))?;
            Ok(inserted > 0)
        })
    }

    /// Collaborators of a plan, excluding the owner.
    ///
    /// # Errors
    ///
    /// Returns a SQLite or decoding error.
    pub fn collaborators(&self, id: PlanId) -> Result<Vec<Collaborator>, StoreError> {
        self.database
            .with_connection(|connection| read_collaborators(connection, id))
    }

    /// Effective permission of `user` on a plan; the owner is an admin.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PlanNotFound`] for unknown plans.
    pub fn permission(&self, id: PlanId, user: UserId) -> Result<Option<Permission>, StoreError> {
        self.database.with_connection(|connection| {
            if read_owner(connection, id)? == user {
                return Ok(Some(Permission::Admin));
            }
            Ok(read_collaborators(connection, id)?
                .into_iter()
                .find(|collaborator| collaborator.user_id == user)
                .map(|collaborator| collaborator.permission))
        })
    }

    /// Remove a collaborator. Admins may remove anyone; users may remove
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Forbidden`] when `acting` may not remove `user`.
    pub fn remove_collaborator(
        &self,
        acting: UserId,
        id: PlanId,
        user: UserId,
    ) -> Result<bool, StoreError> {
        self.database.with_connection(|connection| {
            if acting != user {
                let plan = read_plan(connection, id)?;
                let collaborators = read_collaborators(connection, id)?;
                require(&plan, &collaborators, acting, Permission::Admin)?;
            }
            let removed = connection
                .execute(
                    "DELETE FROM collaborators WHERE plan_id = ?1 AND user_id = ?2",
                    params![sql_id(id.0)?, sql_id(user.0)?],
                )
                .map_err(sqlite("remove collaborator"))?;
            Ok(removed > 0)
        })
    }

    /// Create an invite granting `permission`, valid until `expires_at` for
    /// at most `max_uses` redemptions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Forbidden`] when `acting` is not an admin.
    pub fn create_invite(
        &self,
        acting: UserId,
        id: PlanId,
        permission: Permission,
        expires_at: DateTime<Utc>,
        max_uses: u32,
    ) -> Result<Invite, StoreError> {
        self.database.with_connection(|connection| {
            let plan = read_plan(connection, id)?;
            let collaborators = read_collaborators(connection, id)?;
            require(&plan, &collaborators, acting, Permission::Admin)?;
            let invite = Invite {
                token: random_token(INVITE_TOKEN_LEN),
                plan_id: id,
                permission,
                expires_at,
                max_uses,
                uses: 0,
            };
            connection
                .execute(
                    "INSERT INTO invites (token, plan_id, permission, expires_at, max_uses, uses)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                    params![
                        invite.token,
                        sql_id(id.0)?,
                        permission.as_str(),
                        expires_at.timestamp(),
                        max_uses,
                    ],
                )
                .map_err(sqlite("insert invite"))?;
            debug!("user {acting} created an invite for plan {id}");
            Ok(invite)
        })
    }

    /// Redeem an invite for `user` at time `now`, creating a collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invite`] when the token is unknown, expired or
    /// used up, the user already participates, or the plan is full.
    pub fn redeem_invite(
        &self,
        token: &str,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Collaborator, StoreError> {
        self.database.with_connection(|connection| {
            let transaction = connection
                .transaction()
                .map_err(sqlite("begin redeem invite"))?;
            let invite = read_invite(&transaction, token)?.ok_or(InviteError::Unknown)?;
            let owner = read_owner(&transaction, invite.plan_id)?;
            let collaborators = read_collaborators(&transaction, invite.plan_id)?;
            let is_member =
                owner == user || collaborators.iter().any(|member| member.user_id == user);
            invite.check_redeemable(now, collaborators.len() + 1, user, is_member)?;

            let collaborator = Collaborator {
                plan_id: invite.plan_id,
                user_id: user,
                permission: invite.permission,
            };
            transaction
                .execute(
                    "INSERT INTO collaborators (plan_id, user_id, permission) VALUES (?1, ?2, ?3)",
                    params![
                        sql_id(invite.plan_id.0)?,
                        sql_id(user.0)?,
                        invite.permission.as_str()
                    ],
                )
                .map_err(sqlite("insert collaborator"))?;
            transaction
                .execute("UPDATE invites SET uses = uses + 1 WHERE token = ?1", [token])
                .map_err(sqlite("count invite use"))?;
            transaction.commit().map_err(sqlite("commit redeem invite"))?;
            info!("user {user} joined plan {} as {:?}", invite.plan_id, invite.permission);
            Ok(collaborator)
        })
    }
}

fn write_plan(transaction: &Transaction<'_>, plan: &Plan) -> Result<(), StoreError> {
    let plan_id = sql_id(plan.id().0)?;
    let lodging = plan.lodging().map(|lodging| encode(lodging, "lodging")).transpose()?;
    transaction
        .execute(
            "INSERT INTO plans
                (id, owner_id, title, description, start_date, end_date, lodging, default_mode,
                 updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                lodging = excluded.lodging,
                default_mode = excluded.default_mode,
                updated_at = excluded.updated_at",
            params![
                plan_id,
                sql_id(plan.owner().0)?,
                plan.title,
                plan.description,
                plan.start_date().to_string(),
                plan.end_date().to_string(),
                lodging,
                plan.default_mode().map(TransportMode::as_str),
                now_secs(),
            ],
        )
        .map_err(sqlite("upsert plan"))?;
    transaction
        .execute("DELETE FROM days WHERE plan_id = ?1", [plan_id])
        .map_err(sqlite("clear days"))?;

    let mut insert_day = transaction
        .prepare_cached(
            "INSERT INTO days (id, plan_id, number, date, lodging_edge) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(sqlite("prepare insert day"))?;
    let mut insert_place = transaction
        .prepare_cached(
            "INSERT INTO places
                (id, plan_id, day_id, order_index, name, address, lng, lat, stay_secs, memo, edge)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .map_err(sqlite("prepare insert place"))?;

    for day in plan.days() {
        let day_id = sql_id(day.id().0)?;
        let lodging_edge = day
            .lodging_edge()
            .map(|edge| encode(edge, "lodging edge"))
            .transpose()?;
        insert_day
            .execute(params![
                day_id,
                plan_id,
                i64::from(day.number()),
                day.date().to_string(),
                lodging_edge,
            ])
            .map_err(sqlite("insert day"))?;

        for place in day.places() {
            let edge = place.edge().map(|edge| encode(edge, "edge")).transpose()?;
            let stay = place
                .stay()
                .map(|stay| i64::try_from(stay.as_secs()).unwrap_or(i64::MAX));
            insert_place
                .execute(params![
                    sql_id(place.id().0)?,
                    plan_id,
                    day_id,
                    i64::from(place.order_index()),
                    place.name(),
                    place.address(),
                    place.coord().map(|coord| coord.x),
                    place.coord().map(|coord| coord.y),
                    stay,
                    place.memo(),
                    edge,
                ])
                .map_err(sqlite("insert place"))?;
        }
    }
    Ok(())
}

struct PlanRow {
    owner: i64,
    title: String,
    description: Option<String>,
    start_date: String,
    end_date: String,
    lodging: Option<String>,
    default_mode: Option<String>,
    slug: Option<String>,
    likes: i64,
    views: i64,
}

fn read_plan(connection: &Connection, id: PlanId) -> Result<Plan, StoreError> {
    let plan_id = sql_id(id.0)?;
    let row = connection
        .query_row(
            "SELECT owner_id, title, description, start_date, end_date, lodging, default_mode,
                    slug, likes, views
             FROM plans WHERE id = ?1",
            [plan_id],
            |row| {
                Ok(PlanRow {
                    owner: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    start_date: row.get(3)?,
                    end_date: row.get(4)?,
                    lodging: row.get(5)?,
                    default_mode: row.get(6)?,
                    slug: row.get(7)?,
                    likes: row.get(8)?,
                    views: row.get(9)?,
                })
            },
        )
        .optional()
        .map_err(sqlite("read plan"))?
        .ok_or(StoreError::PlanNotFound(id))?;

    let mut plan = Plan::new(
        id,
        UserId(stored_id(row.owner, "owner id")?),
        row.title,
        parse_date(&row.start_date)?,
        parse_date(&row.end_date)?,
    )?;
    plan.description = row.description;
    plan.publication = row
        .slug
        .map_or(PublicationState::Private, |slug| PublicationState::Published { slug });
    plan.likes = u64::try_from(row.likes).unwrap_or_default();
    plan.views = u64::try_from(row.views).unwrap_or_default();
    let default_mode = row
        .default_mode
        .map(|mode| {
            mode.parse::<TransportMode>()
                .map_err(|err| StoreError::Decode {
                    what: "default mode",
                    message: err.to_string(),
                })
        })
        .transpose()?;
    plan.set_default_mode(default_mode);
    let lodging: Option<Lodging> = row
        .lodging
        .map(|lodging| decode(&lodging, "lodging"))
        .transpose()?;
    plan.set_lodging(lodging)?;

    let mut places = read_places(connection, plan_id)?;
    let days = read_days(connection, plan_id, &mut places)?;
    Ok(plan.restore(days)?)
}

fn read_days(
    connection: &Connection,
    plan_id: i64,
    places: &mut HashMap<u64, Vec<Place>>,
) -> Result<Vec<Day>, StoreError> {
    let mut statement = connection
        .prepare_cached(
            "SELECT id, number, date, lodging_edge FROM days WHERE plan_id = ?1 ORDER BY number",
        )
        .map_err(sqlite("prepare read days"))?;
    let rows = statement
        .query_map([plan_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })
        .map_err(sqlite("read days"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sqlite("read day row"))?;

    rows.into_iter()
        .map(|(id, number, date, lodging_edge)| {
            let id = stored_id(id, "day id")?;
            let number = u32::try_from(number).map_err(|_| StoreError::Decode {
                what: "day number",
                message: format!("{number} is out of range"),
            })?;
            let lodging_edge: Option<TransportEdge> = lodging_edge
                .map(|edge| decode(&edge, "lodging edge"))
                .transpose()?;
            Ok(Day::restore(
                DayId(id),
                number,
                parse_date(&date)?,
                places.remove(&id).unwrap_or_default(),
                lodging_edge,
            ))
        })
        .collect()
}

struct PlaceRow {
    id: i64,
    day_id: i64,
    order_index: i64,
    name: String,
    address: String,
    lng: Option<f64>,
    lat: Option<f64>,
    stay_secs: Option<i64>,
    memo: Option<String>,
    edge: Option<String>,
}

fn read_places(
    connection: &Connection,
    plan_id: i64,
) -> Result<HashMap<u64, Vec<Place>>, StoreError> {
    let mut statement = connection
        .prepare_cached(
            "SELECT id, day_id, order_index, name, address, lng, lat, stay_secs, memo, edge
             FROM places WHERE plan_id = ?1 ORDER BY day_id, order_index",
        )
        .map_err(sqlite("prepare read places"))?;
    let rows = statement
        .query_map([plan_id], |row| {
            Ok(PlaceRow {
                id: row.get(0)?,
                day_id: row.get(1)?,
                order_index: row.get(2)?,
                name: row.get(3)?,
                address: row.get(4)?,
                lng: row.get(5)?,
                lat: row.get(6)?,
                stay_secs: row.get(7)?,
                memo: row.get(8)?,
                edge: row.get(9)?,
            })
        })
        .map_err(sqlite("read places"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sqlite("read place row"))?;

    let mut by_day: HashMap<u64, Vec<Place>> = HashMap::new();
    for row in rows {
        let edge: Option<TransportEdge> =
            row.edge.map(|edge| decode(&edge, "edge")).transpose()?;
        let details = NewPlace {
            name: row.name,
            address: row.address,
            coord: row.lng.zip(row.lat).map(|(x, y)| Coord { x, y }),
            stay: row
                .stay_secs
                .and_then(|secs| u64::try_from(secs).ok())
                .map(Duration::from_secs),
            memo: row.memo,
        };
        let order_index = u32::try_from(row.order_index).map_err(|_| StoreError::Decode {
            what: "order index",
            message: format!("{} is out of range", row.order_index),
        })?;
        let place = Place::restore(
            PlaceId(stored_id(row.id, "place id")?),
            details,
            order_index,
            edge,
        );
        by_day
            .entry(stored_id(row.day_id, "day id")?)
            .or_default()
            .push(place);
    }
    Ok(by_day)
}

fn read_owner(connection: &Connection, id: PlanId) -> Result<UserId, StoreError> {
    let owner: Option<i64> = connection
        .query_row(
            "SELECT owner_id FROM plans WHERE id = ?1",
            [sql_id(id.0)?],
            |row| row.get(0),
        )
        .optional()
        .map_err(sqlite("read plan owner"))?;
    let owner = owner.ok_or(StoreError::PlanNotFound(id))?;
    Ok(UserId(stored_id(owner, "owner id")?))
}

fn read_collaborators(
    connection: &Connection,
    id: PlanId,
) -> Result<Vec<Collaborator>, StoreError> {
    let mut statement = connection
        .prepare_cached(
            "SELECT user_id, permission FROM collaborators WHERE plan_id = ?1 ORDER BY user_id",
        )
        .map_err(sqlite("prepare read collaborators"))?;
    let rows = statement
        .query_map([sql_id(id.0)?], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(sqlite("read collaborators"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sqlite("read collaborator row"))?;
    rows.into_iter()
        .map(|(user, permission)| {
            Ok(Collaborator {
                plan_id: id,
                user_id: UserId(stored_id(user, "user id")?),
                permission: parse_permission(&permission)?,
            })
        })
        .collect()
}

fn read_invite(connection: &Connection, token: &str) -> Result<Option<Invite>, StoreError> {
    let row: Option<(i64, String, i64, i64, i64)> = connection
        .query_row(
            "SELECT plan_id, permission, expires_at, max_uses, uses FROM invites WHERE token = ?1",
            [token],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .optional()
        .map_err(sqlite("read invite"))?;
    row.map(|(plan_id, permission, expires_at, max_uses, uses)| {
        Ok(Invite {
            token: token.to_owned(),
            plan_id: PlanId(stored_id(plan_id, "plan id")?),
            permission: parse_permission(&permission)?,
            expires_at: DateTime::from_timestamp(expires_at, 0).ok_or_else(|| {
                StoreError::Decode {
                    what: "invite expiry",
                    message: format!("{expires_at} is out of range"),
                }
            })?,
            max_uses: u32::try_from(max_uses).unwrap_or_default(),
            uses: u32::try_from(uses).unwrap_or(u32::MAX),
        })
    })
    .transpose()
}

fn parse_permission(value: &str) -> Result<Permission, StoreError> {
    Permission::parse(value).ok_or_else(|| StoreError::Decode {
        what: "permission",
        message: format!("unknown permission `{value}`"),
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, StoreError> {
    value.parse().map_err(|err: chrono::ParseError| StoreError::Decode {
        what: "date",
        message: err.to_string(),
    })
}

fn encode<T: serde::Serialize>(value: &T, what: &'static str) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode { what, source })
}

fn decode<T: serde::de::DeserializeOwned>(
    value: &str,
    what: &'static str,
) -> Result<T, StoreError> {
    serde_json::from_str(value).map_err(|err| StoreError::Decode {
        what,
        message: err.to_string(),
    })
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
