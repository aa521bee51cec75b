pub mod backends;
pub mod gate;
pub mod indexing;
pub mod lease;
pub mod migration;
pub mod migrations;
pub mod worker;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zcs_index::{cluster::ClusterClient, zoekt::ZoektClient};
use zcs_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Parser)]
#[command(
	version = zcs_cli::VERSION,
	rename_all = "kebab",
	styles = zcs_cli::styles(),
)]
pub struct Args {
	#[command(flatten)]
	pub config: zcs_cli::ConfigArgs,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = args.config.load()?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let zoekt = ZoektClient::new(&config.zoekt)?;
	let cluster = Arc::new(ClusterClient::new(&config.cluster)?);
	let backends = backends::Backends::new(&db, cluster);
	let runner = migration::MigrationRunner::new(
		migrations::MigrationRegistry::builtin(),
		backends,
		config.cluster.alias.clone(),
		lease::LockOptions::from_config(&config.migrations),
	);
	let state = worker::WorkerState { db, zoekt, config, runner };

	worker::run_worker(state).await
}
