use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Prepended to redirect targets, e.g. `https://rally.example.com`. Empty keeps them relative.
    pub public_origin: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let public_origin = std::env::var("PUBLIC_ORIGIN").unwrap_or_default();
        Ok(Self {
            database_url,
            max_connections,
            public_origin: normalize_origin(&public_origin),
        })
    }
}

fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_trailing_slashes_are_trimmed() {
        assert_eq!(normalize_origin("https://rally.example.com/"), "https://rally.example.com");
        assert_eq!(normalize_origin("  https://rally.example.com//  "), "https://rally.example.com");
        assert_eq!(normalize_origin(""), "");
    }
}
