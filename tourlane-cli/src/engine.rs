//! Wiring of vendors, caches and resolvers for one command invocation.

use std::{future::Future, sync::Arc};

use tourlane_core::{DirectionsService, GeocodingService, LogMetrics, TransitService};
use tourlane_data::{
    CoordinateResolver, Database, GatewayClient, RouteResolver, SqliteCoordinateCache,
    SqliteRouteCache,
};

use crate::{CliError, config::EngineConfig};

/// Resolvers sharing one database.
pub(crate) struct Engine {
    pub(crate) database: Database,
    pub(crate) coordinates: Arc<CoordinateResolver>,
    pub(crate) routes: Arc<RouteResolver>,
}

/// Builds the engine for the current invocation.
pub(crate) trait EngineBuilder {
    fn build(&self, config: &EngineConfig) -> Result<Engine, CliError>;
}

pub(crate) struct DefaultEngineBuilder;

impl EngineBuilder for DefaultEngineBuilder {
    fn build(&self, config: &EngineConfig) -> Result<Engine, CliError> {
        let database = Database::open(config.database.as_std_path())?;
        let gateway = GatewayClient::with_config(config.gateway.clone())
            .map_err(|source| CliError::BuildGateway {
                base_url: config.gateway.base_url.clone(),
                source,
            })?
            .with_metrics(Arc::new(LogMetrics));
        let gateway = Arc::new(gateway);
        Ok(Engine::assemble(
            database,
            config,
            gateway.clone(),
            gateway.clone(),
            gateway,
        ))
    }
}

impl Engine {
    /// Assemble resolvers over `database` from the given vendors.
    pub(crate) fn assemble(
        database: Database,
        config: &EngineConfig,
        geocoder: Arc<dyn GeocodingService>,
        directions: Arc<dyn DirectionsService>,
        transit: Arc<dyn TransitService>,
    ) -> Self {
        let coordinates = Arc::new(
            CoordinateResolver::new(
                geocoder,
                Arc::new(SqliteCoordinateCache::new(database.clone())),
            )
            .with_region(config.region.clone()),
        );
        let routes = Arc::new(RouteResolver::new(
            directions,
            transit,
            Arc::new(SqliteRouteCache::new(database.clone())),
            coordinates.clone(),
        ));
        Self {
            database,
            coordinates,
            routes,
        }
    }
}

/// Drive `future` to completion on a fresh current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    Ok(runtime.block_on(future))
}
