use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// `None` keeps tokens valid until they are revoked.
    pub ttl_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub tokens: TokenConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let tokens = TokenConfig {
            ttl_minutes: parse_ttl(std::env::var("TOKEN_TTL_MINUTES").ok().as_deref()),
        };
        Ok(Self {
            database_url,
            max_connections,
            tokens,
        })
    }
}

fn parse_ttl(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|minutes| *minutes > 0)
}
