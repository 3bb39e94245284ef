use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, RoleId};
use std::collections::BTreeMap;

/** Persisted state of a single guild. The state file maps guild ID strings to these. */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRecord {
    #[serde(default)]
    pub tracked_channels: Vec<u64>,
    /// Keyed by channel ID string, values in display order.
    #[serde(default)]
    pub tracked_roles: BTreeMap<String, Vec<u64>>,
    #[serde(default)]
    pub bot_is_running: bool,
    #[serde(default)]
    pub last_action: Option<String>,
}

impl GuildRecord {
    pub fn is_tracked_channel(&self, channel_id: ChannelId) -> bool {
        self.tracked_channels.contains(&channel_id.0)
    }

    pub fn roles(&self, channel_id: ChannelId) -> &[u64] {
        self.tracked_roles
            .get(&channel_id.0.to_string())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /** Adds the channel to the tracked list. Existing roles are left untouched. */
    pub fn mark_channel(&mut self, channel_id: ChannelId) {
        if !self.is_tracked_channel(channel_id) {
            self.tracked_channels.push(channel_id.0);
        }
        self.tracked_roles
            .entry(channel_id.0.to_string())
            .or_default();
    }

    pub fn set_roles(&mut self, channel_id: ChannelId, roles: &[RoleId]) {
        self.tracked_roles.insert(
            channel_id.0.to_string(),
            roles.iter().map(|role| role.0).collect(),
        );
    }

    /** Forgets the channel and its roles entirely. */
    pub fn unmark_channel(&mut self, channel_id: ChannelId) {
        self.tracked_channels.retain(|id| *id != channel_id.0);
        self.tracked_roles.remove(&channel_id.0.to_string());
    }
}
