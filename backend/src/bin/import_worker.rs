//! Import-worker entry point: wires persistence, cache, and the job loop.

use std::env;
use std::io;
use std::sync::Arc;

use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use backend::config::AppConfig;
use backend::domain::MappingService;
use backend::outbound::cache::RedisLookupCache;
use backend::outbound::persistence::{
    DbPool, DieselCatalogRepository, DieselImportQueue, PoolConfig, SequenceCodeIssuer,
};
use backend::worker::ImportWorker;

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = AppConfig::load_from_iter(env::args_os())
        .map_err(|error| io::Error::other(format!("load configuration: {error}")))?;
    let database_url = config
        .require_database_url()
        .map_err(|error| io::Error::other(error.to_string()))?
        .to_owned();
    let redis_url = config
        .require_redis_url()
        .map_err(|error| io::Error::other(error.to_string()))?
        .to_owned();

    let pool = DbPool::new(PoolConfig::new(&database_url).with_max_size(config.db_pool_size))
        .await
        .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;
    let cache = RedisLookupCache::connect(&redis_url)
        .await
        .map_err(|error| io::Error::other(format!("connect lookup cache: {error}")))?;

    let catalog = Arc::new(DieselCatalogRepository::new(pool.clone()));
    let mappings = Arc::new(MappingService::new(
        catalog,
        Arc::new(cache),
        Arc::new(SequenceCodeIssuer::new(pool.clone())),
    ));
    let queue = Arc::new(DieselImportQueue::new(pool));

    let worker = ImportWorker::new(queue, mappings, config.worker_poll_interval());
    worker.run().await;

    Ok(())
}
