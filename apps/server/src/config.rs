use std::{net::SocketAddr, time::Duration};

use vngate_market_data::BackoffPolicy;

use crate::auth::decode_secret_key;

/// Development-only signing secret. Must be overridden via
/// `VNGATE_JWT_SECRET` in any deployment.
const DEV_JWT_SECRET: &str = "vngate-dev-secret-change-me-0123";

pub struct Config {
    pub listen_addr: SocketAddr,
    pub jwt_secret: Vec<u8>,
    pub token_ttl: Duration,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub attempt_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("VNGATE_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid VNGATE_LISTEN_ADDR"))?;

        let secret_raw = match std::env::var("VNGATE_JWT_SECRET") {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(
                    "VNGATE_JWT_SECRET is not set, using the development secret; \
                     override it in any deployment"
                );
                DEV_JWT_SECRET.to_string()
            }
        };
        let jwt_secret = decode_secret_key(&secret_raw)?;

        let cors_allow = std::env::var("VNGATE_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let backoff = BackoffPolicy {
            max_attempts: env_parse("VNGATE_MAX_ATTEMPTS", 3),
            base_delay: Duration::from_millis(env_parse("VNGATE_BACKOFF_BASE_MS", 500)),
            max_delay: Duration::from_millis(env_parse("VNGATE_BACKOFF_CAP_MS", 8_000)),
            max_total_wait: Duration::from_millis(env_parse(
                "VNGATE_BACKOFF_TOTAL_WAIT_MS",
                30_000,
            )),
            ..BackoffPolicy::default()
        };

        Ok(Self {
            listen_addr,
            jwt_secret,
            token_ttl: Duration::from_secs(env_parse("VNGATE_TOKEN_TTL_MINUTES", 30) * 60),
            cors_allow,
            request_timeout: Duration::from_millis(env_parse(
                "VNGATE_REQUEST_TIMEOUT_MS",
                60_000,
            )),
            attempt_timeout: Duration::from_millis(env_parse(
                "VNGATE_ATTEMPT_TIMEOUT_MS",
                30_000,
            )),
            backoff,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
