use crate::client::database::errors::StoreError;
use crate::client::database::models::GuildRecord;
use serde::Serialize;
use serenity::model::id::GuildId;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/** The state file is indented like the files the bot has always written. */
const INDENT: &[u8] = b"    ";

/** A wrapper around the JSON state file. The whole document is read once and rewritten wholesale on every save. */
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    guilds: BTreeMap<String, GuildRecord>,
}

impl StateFile {
    /** Reads the state file at `path`. A missing or empty file yields an empty state. */
    pub async fn load(path: impl Into<PathBuf>) -> Result<StateFile, StoreError> {
        let path = path.into();
        let guilds = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| StoreError::Malformed {
                    path: path.clone(),
                    source,
                })?
            }
            Err(why) if why.kind() == ErrorKind::NotFound => {
                info!("No state file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(StateFile { path, guilds })
    }

    /** Rewrites the whole state file. */
    pub async fn save(&self) -> Result<(), StoreError> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.guilds.serialize(&mut serializer)?;
        tokio::fs::write(&self.path, buffer)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!("Saved state for {} guilds", self.guilds.len());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn guild(&self, guild_id: GuildId) -> Option<&GuildRecord> {
        self.guilds.get(&guild_id.0.to_string())
    }

    /** Returns the record for a guild, creating an empty one on first observation. */
    pub fn guild_mut(&mut self, guild_id: GuildId) -> &mut GuildRecord {
        self.guilds.entry(guild_id.0.to_string()).or_default()
    }

    /** Returns true if a record was created. */
    pub fn observe(&mut self, guild_id: GuildId) -> bool {
        let key = guild_id.0.to_string();
        if self.guilds.contains_key(&key) {
            false
        } else {
            self.guilds.insert(key, GuildRecord::default());
            true
        }
    }

    /** Iterates over every stored guild whose key parses as an ID. */
    pub fn records(&self) -> impl Iterator<Item = (GuildId, &GuildRecord)> {
        self.guilds
            .iter()
            .filter_map(|(key, record)| key.parse::<u64>().ok().map(|id| (GuildId(id), record)))
    }
}
