use serenity::model::id::{ChannelId, GuildId, RoleId};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use crate::client::database::errors::{InsertResult, RemoveResult};
use crate::client::database::models::GuildRecord;
use crate::client::tracking::directory::GuildDirectory;
use crate::client::tracking::errors::TrackingError;

/** What a restore changed. */
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored_channels: Vec<ChannelId>,
    pub pruned_channels: Vec<ChannelId>,
    pub dropped_roles: Vec<RoleId>,
    /// Set when the persisted record was rewritten and needs saving.
    pub record_changed: bool,
}

/** In-memory tracking state: guild -> marked channel -> roles in display order. */
#[derive(Debug, Default)]
pub struct TrackingRegistry {
    guilds: HashMap<GuildId, BTreeMap<ChannelId, Vec<RoleId>>>,
}

impl TrackingRegistry {
    pub fn new() -> TrackingRegistry {
        TrackingRegistry::default()
    }

    pub fn is_marked(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        self.guilds
            .get(&guild_id)
            .map_or(false, |channels| channels.contains_key(&channel_id))
    }

    /** Marks a channel. Marking twice leaves the existing roles alone. */
    pub fn mark(&mut self, guild_id: GuildId, channel_id: ChannelId) -> InsertResult {
        let channels = self.guilds.entry(guild_id).or_default();
        if channels.contains_key(&channel_id) {
            InsertResult::AlreadyPresent
        } else {
            channels.insert(channel_id, Vec::new());
            InsertResult::Added
        }
    }

    /** Appends roles not yet tracked in the channel, keeping first-seen order. Returns the roles actually added. */
    pub fn add_roles(
        &mut self,
        guild_id: GuildId,
        channel_id: ChannelId,
        roles: &[RoleId],
    ) -> Result<Vec<RoleId>, TrackingError> {
        let tracked = self.roles_mut(guild_id, channel_id)?;
        let mut added = Vec::new();
        for role in roles {
            if !tracked.contains(role) {
                tracked.push(*role);
                added.push(*role);
            }
        }
        Ok(added)
    }

    pub fn remove_role(
        &mut self,
        guild_id: GuildId,
        channel_id: ChannelId,
        role: RoleId,
    ) -> Result<RemoveResult, TrackingError> {
        let tracked = self.roles_mut(guild_id, channel_id)?;
        match tracked.iter().position(|tracked_role| *tracked_role == role) {
            Some(index) => {
                tracked.remove(index);
                Ok(RemoveResult::Removed)
            }
            None => Ok(RemoveResult::NotPresent),
        }
    }

    pub fn clear_roles(
        &mut self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<(), TrackingError> {
        self.roles_mut(guild_id, channel_id)?.clear();
        Ok(())
    }

    /** Stops tracking a channel and forgets its roles. */
    pub fn unmark(&mut self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TrackingError> {
        self.guilds
            .get_mut(&guild_id)
            .and_then(|channels| channels.remove(&channel_id))
            .map(|_| ())
            .ok_or(TrackingError::NotMarked(channel_id))
    }

    pub fn roles(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<&[RoleId], TrackingError> {
        self.guilds
            .get(&guild_id)
            .and_then(|channels| channels.get(&channel_id))
            .map(Vec::as_slice)
            .ok_or(TrackingError::NotMarked(channel_id))
    }

    pub fn channel_count(&self, guild_id: GuildId) -> usize {
        self.guilds.get(&guild_id).map_or(0, BTreeMap::len)
    }

    /// Rebuilds a guild's tracking from its persisted record.
    ///
    /// Channels that no longer resolve are pruned from the record as well. Roles that
    /// no longer resolve are only dropped from memory. Without a directory nothing is
    /// pruned.
    pub fn restore(
        &mut self,
        guild_id: GuildId,
        record: &mut GuildRecord,
        directory: Option<&GuildDirectory>,
    ) -> RestoreReport {
        let mut report = RestoreReport::default();
        let mut candidates: Vec<u64> = record.tracked_channels.clone();
        for key in record.tracked_roles.keys() {
            match key.parse::<u64>() {
                Ok(id) if !candidates.contains(&id) => candidates.push(id),
                Ok(_) => {}
                Err(_) => warn!("Ignoring malformed channel key {:?} in guild {}", key, guild_id),
            }
        }

        let mut channels = BTreeMap::new();
        for id in candidates {
            let channel_id = ChannelId(id);
            if let Some(directory) = directory {
                if !directory.has_channel(channel_id) {
                    warn!(
                        "Channel {} no longer exists in guild {}, removing it from tracking",
                        channel_id, guild_id
                    );
                    record.unmark_channel(channel_id);
                    report.pruned_channels.push(channel_id);
                    report.record_changed = true;
                    continue;
                }
            }
            if !record.is_tracked_channel(channel_id) {
                record.mark_channel(channel_id);
                report.record_changed = true;
            }

            let mut roles = Vec::new();
            for role_id in record.roles(channel_id).iter().map(|id| RoleId(*id)) {
                let resolves = directory.map_or(true, |directory| directory.role(role_id).is_some());
                if !resolves {
                    warn!("Role {} not found in guild {}", role_id, guild_id);
                    report.dropped_roles.push(role_id);
                } else if !roles.contains(&role_id) {
                    roles.push(role_id);
                }
            }
            info!("Restored tracking of channel {} in guild {}", channel_id, guild_id);
            channels.insert(channel_id, roles);
            report.restored_channels.push(channel_id);
        }

        self.guilds.insert(guild_id, channels);
        report
    }

    fn roles_mut(
        &mut self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<&mut Vec<RoleId>, TrackingError> {
        self.guilds
            .get_mut(&guild_id)
            .and_then(|channels| channels.get_mut(&channel_id))
            .ok_or(TrackingError::NotMarked(channel_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tracking::directory::RoleInfo;
    use serenity::utils::Colour;

    const GUILD: GuildId = GuildId(1);
    const CHANNEL: ChannelId = ChannelId(10);

    fn role_info(id: u64) -> RoleInfo {
        RoleInfo {
            id: RoleId(id),
            name: format!("role-{}", id),
            colour: Colour::default(),
        }
    }

    #[test]
    fn mark_twice_keeps_roles() {
        let mut registry = TrackingRegistry::new();
        assert_eq!(registry.mark(GUILD, CHANNEL), InsertResult::Added);
        registry
            .add_roles(GUILD, CHANNEL, &[RoleId(1), RoleId(2)])
            .expect("Channel is marked");

        assert_eq!(registry.mark(GUILD, CHANNEL), InsertResult::AlreadyPresent);
        assert_eq!(
            registry.roles(GUILD, CHANNEL).expect("Channel is marked"),
            &[RoleId(1), RoleId(2)]
        );
    }

    #[test]
    fn add_roles_skips_duplicates_and_keeps_order() {
        let mut registry = TrackingRegistry::new();
        registry.mark(GUILD, CHANNEL);

        let added = registry
            .add_roles(GUILD, CHANNEL, &[RoleId(3), RoleId(1), RoleId(3)])
            .expect("Channel is marked");
        assert_eq!(added, vec![RoleId(3), RoleId(1)]);

        let added = registry
            .add_roles(GUILD, CHANNEL, &[RoleId(1), RoleId(2)])
            .expect("Channel is marked");
        assert_eq!(added, vec![RoleId(2)]);
        assert_eq!(
            registry.roles(GUILD, CHANNEL).expect("Channel is marked"),
            &[RoleId(3), RoleId(1), RoleId(2)]
        );
    }

    #[test]
    fn operations_require_mark() {
        let mut registry = TrackingRegistry::new();

        assert!(matches!(
            registry.add_roles(GUILD, CHANNEL, &[RoleId(1)]),
            Err(TrackingError::NotMarked(CHANNEL))
        ));
        assert!(matches!(
            registry.remove_role(GUILD, CHANNEL, RoleId(1)),
            Err(TrackingError::NotMarked(_))
        ));
        assert!(registry.clear_roles(GUILD, CHANNEL).is_err());
        assert!(registry.unmark(GUILD, CHANNEL).is_err());
        assert!(registry.roles(GUILD, CHANNEL).is_err());
    }

    #[test]
    fn remove_clear_and_unmark() {
        let mut registry = TrackingRegistry::new();
        registry.mark(GUILD, CHANNEL);
        registry
            .add_roles(GUILD, CHANNEL, &[RoleId(1), RoleId(2), RoleId(3)])
            .expect("Channel is marked");

        assert_eq!(
            registry.remove_role(GUILD, CHANNEL, RoleId(2)).expect("Marked"),
            RemoveResult::Removed
        );
        assert_eq!(
            registry.remove_role(GUILD, CHANNEL, RoleId(2)).expect("Marked"),
            RemoveResult::NotPresent
        );
        assert_eq!(
            registry.roles(GUILD, CHANNEL).expect("Marked"),
            &[RoleId(1), RoleId(3)]
        );

        registry.clear_roles(GUILD, CHANNEL).expect("Marked");
        assert!(registry.roles(GUILD, CHANNEL).expect("Marked").is_empty());

        registry.unmark(GUILD, CHANNEL).expect("Marked");
        assert!(!registry.is_marked(GUILD, CHANNEL));
        assert_eq!(registry.channel_count(GUILD), 0);
    }

    #[test]
    fn restore_rebuilds_and_prunes() {
        let mut record = GuildRecord::default();
        record.mark_channel(ChannelId(111));
        record.set_roles(ChannelId(111), &[RoleId(5), RoleId(6)]);
        record.mark_channel(ChannelId(222));
        record.set_roles(ChannelId(222), &[RoleId(7)]);
        record.mark_channel(ChannelId(333));
        let directory = GuildDirectory::new(
            GUILD,
            [ChannelId(111), ChannelId(222)],
            [role_info(5), role_info(6), role_info(7)],
            [],
        );

        let mut registry = TrackingRegistry::new();
        let report = registry.restore(GUILD, &mut record, Some(&directory));

        assert_eq!(report.restored_channels, vec![ChannelId(111), ChannelId(222)]);
        assert_eq!(report.pruned_channels, vec![ChannelId(333)]);
        assert!(report.record_changed);
        assert_eq!(
            registry.roles(GUILD, ChannelId(111)).expect("Restored"),
            &[RoleId(5), RoleId(6)]
        );
        assert_eq!(
            registry.roles(GUILD, ChannelId(222)).expect("Restored"),
            &[RoleId(7)]
        );
        assert!(!registry.is_marked(GUILD, ChannelId(333)));
        assert_eq!(record.tracked_channels, vec![111, 222]);
        assert!(!record.tracked_roles.contains_key("333"));
    }

    #[test]
    fn restore_drops_stale_roles_in_memory_only() {
        let mut record = GuildRecord::default();
        record.mark_channel(CHANNEL);
        record.set_roles(CHANNEL, &[RoleId(5), RoleId(99)]);
        let directory = GuildDirectory::new(GUILD, [CHANNEL], [role_info(5)], []);

        let mut registry = TrackingRegistry::new();
        let report = registry.restore(GUILD, &mut record, Some(&directory));

        assert_eq!(report.dropped_roles, vec![RoleId(99)]);
        assert!(!report.record_changed);
        assert_eq!(registry.roles(GUILD, CHANNEL).expect("Restored"), &[RoleId(5)]);
        assert_eq!(record.roles(CHANNEL), &[5, 99]);
    }

    #[test]
    fn restore_picks_up_channels_only_listed_with_roles() {
        let mut record = GuildRecord::default();
        record.tracked_roles.insert("444".to_owned(), vec![5]);

        let mut registry = TrackingRegistry::new();
        let report = registry.restore(GUILD, &mut record, None);

        assert_eq!(report.restored_channels, vec![ChannelId(444)]);
        assert!(report.record_changed);
        assert_eq!(record.tracked_channels, vec![444]);
        assert_eq!(
            registry.roles(GUILD, ChannelId(444)).expect("Restored"),
            &[RoleId(5)]
        );
    }
}
