use std::{env, net::SocketAddr, str::FromStr};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    /// Upper bound on in-flight requests.
    pub concurrency_limit: usize,
    pub body_limit_bytes: usize,
}

/// Reads `key`, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        Ok(Self {
            database_url,
            host: env_or("APP_HOST", "127.0.0.1".to_string()),
            port: env_or("APP_PORT", 3000),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            concurrency_limit: env_or("APP_CONCURRENCY_LIMIT", 100),
            body_limit_bytes: env_or("APP_BODY_LIMIT_BYTES", 1024 * 1024),
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip = self.host.parse::<std::net::IpAddr>()?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}
