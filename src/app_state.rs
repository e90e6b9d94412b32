use std::sync::Arc;

use crate::{aliases::DbPool, config::Config};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: DbPool, config: Config) -> Self {
        Self {
            db_pool,
            config: Arc::new(config),
        }
    }
}
