//! Shared server state

use std::sync::Arc;

use crate::catalog::CatalogService;
use crate::core::Config;
use crate::fulfillment::{DispatchManager, DispatchStorage};
use crate::notify::Notifier;

/// State handed to every HTTP handler
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub manager: Arc<DispatchManager>,
    pub notifier: Notifier,
}

impl ServerState {
    /// Open storage under the configured working directory and wire up
    /// the engine
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let storage = DispatchStorage::open(config.db_path())?;
        let catalog = Arc::new(CatalogService::new());
        let notifier = Notifier::new();
        let manager = Arc::new(DispatchManager::new(
            storage,
            catalog,
            notifier.clone(),
        ));

        tracing::info!(
            work_dir = %config.work_dir,
            epoch = %manager.epoch(),
            "Server state initialized"
        );

        Ok(Self {
            config: Arc::new(config.clone()),
            manager,
            notifier,
        })
    }
}
