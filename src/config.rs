use anyhow::Context;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("SECRET_KEY").context("SECRET_KEY is not set")?,
            access_ttl_seconds: std::env::var("ACCESS_TOKEN_EXPIRATION")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(15 * 60),
            refresh_ttl_seconds: std::env::var("REFRESH_TOKEN_EXPIRATION")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 60 * 24 * 30),
        };
        Ok(Self { database_url, jwt })
    }
}
