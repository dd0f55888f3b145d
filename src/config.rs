use std::env;

use anyhow::Context;

/// Runtime settings, read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// When missing, groups are kept in memory.
    pub mongodb_uri: Option<String>,
    pub database_name: String,
    pub bind_address: String,
    pub port: u16,
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let or_default = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port = or_default("PORT", "8080");
        let port = port
            .trim()
            .parse::<u16>()
            .with_context(|| format!("PORT must be a port number, got `{port}`"))?;

        Ok(Config {
            mongodb_uri: lookup("MONGODB_URI").filter(|v| !v.trim().is_empty()),
            database_name: or_default("DATABASE_NAME", "GroupLedger"),
            bind_address: or_default("BIND_ADDRESS", "0.0.0.0"),
            port,
            cors_origin: or_default("CORS_ORIGIN", "http://localhost:3000"),
        })
    }
}
