use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use vngate_market_data::{Dispatcher, MsnAdapter, TcbsAdapter, VciAdapter};

use crate::auth::AuthManager;
use crate::config::Config;
use crate::users::{MemoryUserStore, UserStore};

pub struct AppState {
    pub user_store: Arc<dyn UserStore>,
    pub auth: Arc<AuthManager>,
    pub dispatcher: Arc<Dispatcher>,
    /// Deadline for one request's dispatch, including retries.
    pub request_timeout: Duration,
}

pub fn init_tracing() {
    let log_format = std::env::var("VNGATE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let user_store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let auth = Arc::new(AuthManager::new(&config.jwt_secret, config.token_ttl));

    let mut dispatcher = Dispatcher::new(config.backoff.clone(), config.attempt_timeout);
    dispatcher.register(Arc::new(VciAdapter::new()));
    dispatcher.register(Arc::new(TcbsAdapter::new()));
    dispatcher.register(Arc::new(MsnAdapter::new()));
    tracing::info!(
        "Registered {} market data sources",
        dispatcher.sources().len()
    );

    Ok(Arc::new(AppState {
        user_store,
        auth,
        dispatcher: Arc::new(dispatcher),
        request_timeout: config.request_timeout,
    }))
}
