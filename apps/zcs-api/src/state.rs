use std::sync::Arc;

use zcs_service::ZcsService;
use zcs_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ZcsService>,
}
impl AppState {
	pub async fn new(config: zcs_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = ZcsService::new(config, db)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: ZcsService) -> Self {
		Self { service: Arc::new(service) }
	}
}
