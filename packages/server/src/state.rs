use std::sync::Arc;

use common::storage::ObjectStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::dispatch::JudgeDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub store: Arc<dyn ObjectStore>,
    /// `None` when no judge queue is configured; submissions are then refused.
    pub dispatcher: Option<Arc<dyn JudgeDispatcher>>,
}
