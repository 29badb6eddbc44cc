use serde::Deserialize;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RATE_LIMIT_PER_SECOND: u64 = 10;
const DEFAULT_RATE_LIMIT_BURST: u32 = 20;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,
    /// Shared token required on `/api/*` routes when set.
    pub api_token: Option<String>,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            port: DEFAULT_PORT,
            api_token: None,
            rate_limit_per_second: DEFAULT_RATE_LIMIT_PER_SECOND,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            port: parse_var("PORT", DEFAULT_PORT)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            api_token: std::env::var("API_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            rate_limit_per_second: parse_var("RATE_LIMIT_PER_SECOND", DEFAULT_RATE_LIMIT_PER_SECOND)
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a positive number"))?,
            rate_limit_burst: parse_var("RATE_LIMIT_BURST", DEFAULT_RATE_LIMIT_BURST)
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BURST must be a positive number"))?,
            max_body_bytes: parse_var("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)
                .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a positive number"))?,
        };

        if config.rate_limit_per_second == 0 || config.rate_limit_burst == 0 {
            anyhow::bail!("Rate limit settings must be greater than zero");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        match config.database_url {
            Some(ref url) => tracing::debug!("Database URL: {}...", &url[..20.min(url.len())]),
            None => tracing::warn!("DATABASE_URL not set, records are kept in memory only"),
        }
        if config.api_token.is_none() {
            tracing::warn!("API_TOKEN not set, /api routes are unauthenticated");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, T::Err> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse(),
        _ => Ok(default),
    }
}
