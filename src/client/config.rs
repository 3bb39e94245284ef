use serenity::model::id::UserId;
use std::env;
use std::path::PathBuf;

const DEFAULT_DATA_FILE: &str = "bot_data.json";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Expected {0} in the environment")]
    Missing(&'static str),
    #[error("{name} should be a numeric Discord ID, got {value:?}")]
    InvalidId { name: &'static str, value: String },
}

/** Runtime settings, read from the environment (and `./.env`, if present). */
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    /// Receives activation keys and may use owner-only commands.
    pub owner_id: UserId,
    pub data_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        let owner = lookup("BOT_OWNER_ID").ok_or(ConfigError::Missing("BOT_OWNER_ID"))?;
        let owner_id = owner
            .trim()
            .parse::<u64>()
            .map(UserId)
            .map_err(|_| ConfigError::InvalidId {
                name: "BOT_OWNER_ID",
                value: owner.clone(),
            })?;
        let data_file = lookup("DATA_FILE")
            .filter(|path| !path.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_FILE.to_owned())
            .into();
        Ok(Config {
            discord_token,
            owner_id,
            data_file,
        })
    }
}
