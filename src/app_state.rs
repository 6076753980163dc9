use std::sync::Arc;

use crate::config::Config;
use crate::services::tokens::TokenService;
use crate::utils::email::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub tokens: Arc<TokenService>,
    /// `None` when SMTP is not configured; verification mails are then skipped.
    pub mailer: Option<Arc<Mailer>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: sqlx::PgPool, config: Config) -> anyhow::Result<Self> {
        let mailer = match &config.smtp {
            Some(smtp) => Some(Arc::new(Mailer::new(smtp)?)),
            None => None,
        };

        Ok(Self {
            db_pool,
            tokens: Arc::new(TokenService::new(&config.jwt)),
            mailer,
            config: Arc::new(config),
        })
    }
}
