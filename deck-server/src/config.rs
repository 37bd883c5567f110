use std::env;
use std::net::IpAddr;
use std::str::FromStr;

use deck_core::DEFAULT_MAX_SHUFFLE_ATTEMPTS;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub max_packs_per_deck: u32,
    pub shuffle_max_attempts: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: env_or("HOST", defaults.host)?,
            port: env_or("PORT", defaults.port)?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_packs_per_deck: env_or("MAX_PACKS_PER_DECK", defaults.max_packs_per_deck)?,
            shuffle_max_attempts: env_or("SHUFFLE_MAX_ATTEMPTS", defaults.shuffle_max_attempts)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
            database_url: "sqlite://decks.db?mode=rwc".to_string(),
            max_packs_per_deck: 10,
            shuffle_max_attempts: DEFAULT_MAX_SHUFFLE_ATTEMPTS,
        }
    }
}

fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
