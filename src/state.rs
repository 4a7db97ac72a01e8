use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, orm_from_pool},
    mailer::Mailer,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let orm = orm_from_pool(pool.clone());
        Self {
            pool,
            orm,
            config: Arc::new(config),
            mailer,
        }
    }
}
