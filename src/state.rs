use std::sync::Arc;

use crate::{
    cache::OtpCache,
    config::AppConfig,
    db::{DbPool, OrmConn, orm_from_pool},
    mailer::Mailer,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub cache: Arc<dyn OtpCache>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        cache: Arc<dyn OtpCache>,
        mailer: Arc<dyn Mailer>,
        config: AppConfig,
    ) -> Self {
        let orm = orm_from_pool(pool.clone());
        Self {
            pool,
            orm,
            cache,
            mailer,
            config: Arc::new(config),
        }
    }

    /// Close the database pool; the cache connection drops with the last state clone.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
