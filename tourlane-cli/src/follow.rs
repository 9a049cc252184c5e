//! `follow` command: watch a stored plan and print each update.

use std::{io::Write, sync::Arc, time::Duration};

use camino::Utf8PathBuf;
use clap::Parser;
use log::debug;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tourlane_core::{Plan, PlanId, UserId};
use tourlane_data::{Database, SqlitePlanStore};
use tourlane_sync::{BroadcastHub, DEFAULT_POLL_INTERVAL, SessionId, SyncConfig, SyncSession};

use crate::{
    ARG_DATABASE, ARG_FOLLOW_PLAN_ID, ARG_POLL_INTERVAL_SECS, CliError, ENV_FOLLOW_PLAN_ID,
    config::DEFAULT_DATABASE, engine::block_on,
};

/// CLI arguments for the `follow` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "follow",
    long_about = "Open a stored plan and keep it in sync with the database by \
                 polling. A summary line is printed for the initial plan and \
                 again whenever a poll finds a changed place count.",
    about = "Follow a stored plan and print each update"
)]
#[ortho_config(prefix = "TOURLANE")]
pub(crate) struct FollowArgs {
    /// Identifier of the plan to follow.
    #[arg(value_name = "plan-id")]
    #[serde(default)]
    pub(crate) plan_id: Option<u64>,
    /// Follow as this user; the plan must be viewable by them.
    #[arg(long, value_name = "id")]
    #[serde(default)]
    pub(crate) user: Option<u64>,
    /// SQLite database holding the plans.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Seconds between polls.
    #[arg(long = ARG_POLL_INTERVAL_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) poll_interval_secs: Option<u64>,
    /// Stop after this many updates.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) updates: Option<usize>,
}

/// Resolved `follow` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FollowConfig {
    pub(crate) plan_id: PlanId,
    pub(crate) user: Option<UserId>,
    pub(crate) database: Utf8PathBuf,
    pub(crate) poll_interval: Duration,
    pub(crate) updates: Option<usize>,
}

impl FollowArgs {
    fn into_config(self) -> Result<FollowConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        FollowConfig::try_from(merged)
    }
}

impl TryFrom<FollowArgs> for FollowConfig {
    type Error = CliError;

    fn try_from(args: FollowArgs) -> Result<Self, Self::Error> {
        let plan_id = args.plan_id.ok_or(CliError::MissingArgument {
            field: ARG_FOLLOW_PLAN_ID,
            env: ENV_FOLLOW_PLAN_ID,
        })?;
        Ok(Self {
            plan_id: PlanId(plan_id),
            user: args.user.map(UserId),
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            poll_interval: args
                .poll_interval_secs
                .map_or(DEFAULT_POLL_INTERVAL, Duration::from_secs)
                .max(Duration::from_secs(1)),
            updates: args.updates,
        })
    }
}

pub(crate) fn run_follow(args: FollowArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_follow_with(args, &mut stdout)
}

pub(crate) fn run_follow_with(args: FollowArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let store = SqlitePlanStore::new(Database::open(config.database.as_std_path())?);
    if let Some(user) = config.user {
        store.load_plan_for(user, config.plan_id)?;
    }
    block_on(follow(store, &config, writer))?
}

async fn follow(
    store: SqlitePlanStore,
    config: &FollowConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let session = SyncSession::open(
        SessionId(0),
        config.plan_id,
        Arc::new(BroadcastHub::default()),
        Arc::new(store),
    )
    .await?
    .with_config(SyncConfig {
        poll_interval: config.poll_interval,
    });
    let mut updates = session.watch();
    writeln!(writer, "{}", describe(&session.current())).map_err(CliError::WriteOutput)?;
    if config.updates == Some(0) {
        return Ok(());
    }

    let (stop, shutdown) = watch::channel(false);
    let printer = async {
        let mut seen = 0;
        let result = loop {
            if updates.changed().await.is_err() {
                break Ok(());
            }
            let line = describe(&updates.borrow_and_update());
            if let Err(error) = writeln!(writer, "{line}") {
                break Err(CliError::WriteOutput(error));
            }
            seen += 1;
            if config.updates.is_some_and(|limit| seen >= limit) {
                break Ok(());
            }
        };
        debug!("stopping after {seen} updates");
        stop.send_replace(true);
        result
    };
    let (result, ()) = tokio::join!(printer, session.run(shutdown));
    result
}

/// One-line summary of a plan.
pub(crate) fn describe(plan: &Plan) -> String {
    format!(
        "plan {} \"{}\": {} days, {} places",
        plan.id(),
        plan.title,
        plan.days().len(),
        plan.place_count()
    )
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<FollowConfig, CliError> {
    let merged = FollowArgs::merge_from_layers(layers).map_err(CliError::from)?;
    FollowConfig::try_from(merged)
}
