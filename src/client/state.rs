use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::prelude::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::client::config::Config;
use crate::client::database::errors::{InsertResult, RemoveResult, StoreError};
use crate::client::database::interface::StateFile;
use crate::client::tracking::activation::{ActivationGate, ActivationOutcome};
use crate::client::tracking::directory::GuildDirectory;
use crate::client::tracking::errors::TrackingError;
use crate::client::tracking::registry::{RestoreReport, TrackingRegistry};
use crate::client::tracking::scheduler::Publisher;

/** Framework data handed to every command and event. Cloned into scheduled tasks. */
pub type Data = Arc<AppState>;

/** Everything that must change together: the persisted file and its in-memory mirrors. */
struct Tracker {
    store: StateFile,
    registry: TrackingRegistry,
    gate: ActivationGate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildStatus {
    pub active: bool,
    pub tracked_channels: usize,
    pub last_action: Option<String>,
}

/** The process-wide application context. */
pub struct AppState {
    pub owner_id: UserId,
    tracker: Mutex<Tracker>,
    pub publisher: Publisher,
    /// Held while application commands are being registered with Discord.
    pub registration: Mutex<()>,
}

impl AppState {
    /** Loads the state file. Activation flags are restored right away; channel tracking waits for `restore_guild`. */
    pub async fn load(config: &Config) -> Result<AppState, StoreError> {
        let store = StateFile::load(&config.data_file).await?;
        let mut gate = ActivationGate::new();
        for (guild_id, record) in store.records() {
            gate.set_active(guild_id, record.bot_is_running);
        }
        info!("Loaded state for {} guilds from {}", store.records().count(), store.path().display());
        Ok(AppState {
            owner_id: config.owner_id,
            tracker: Mutex::new(Tracker {
                store,
                registry: TrackingRegistry::new(),
                gate,
            }),
            publisher: Publisher::new(),
            registration: Mutex::new(()),
        })
    }

    /** Rebuilds tracking for a guild from its record, pruning what the directory no longer knows about. */
    pub async fn restore_guild(
        &self,
        guild_id: GuildId,
        directory: Option<&GuildDirectory>,
    ) -> Result<RestoreReport, StoreError> {
        let mut tracker = self.tracker.lock().await;
        let Tracker {
            store,
            registry,
            gate,
        } = &mut *tracker;
        let created = store.observe(guild_id);
        let record = store.guild_mut(guild_id);
        gate.set_active(guild_id, record.bot_is_running);
        let report = registry.restore(guild_id, record, directory);
        if created || report.record_changed {
            store.save().await?;
        }
        Ok(report)
    }

    /** Makes sure a guild has a record, saving if one had to be created. */
    pub async fn observe_guild(&self, guild_id: GuildId) -> Result<(), StoreError> {
        let mut tracker = self.tracker.lock().await;
        if tracker.store.observe(guild_id) {
            info!("Created state for guild {}", guild_id);
            tracker.store.save().await?;
        }
        Ok(())
    }

    /** Writes everything out. Used on shutdown. */
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.tracker.lock().await.store.save().await
    }

    pub async fn is_active(&self, guild_id: GuildId) -> bool {
        self.tracker.lock().await.gate.is_active(guild_id)
    }

    /** Issues a pending activation key. Delivering it is up to the caller. */
    pub async fn issue_key(&self, guild_id: GuildId) -> String {
        self.tracker.lock().await.gate.issue_key(guild_id)
    }

    pub async fn activate(
        &self,
        guild_id: GuildId,
        supplied: &str,
    ) -> Result<ActivationOutcome, StoreError> {
        let mut tracker = self.tracker.lock().await;
        let outcome = tracker.gate.activate(guild_id, supplied);
        match outcome {
            ActivationOutcome::Activated | ActivationOutcome::WrongKey => {
                let active = outcome == ActivationOutcome::Activated;
                if !active {
                    warn!("Wrong activation key supplied for guild {}", guild_id);
                }
                tracker.store.guild_mut(guild_id).bot_is_running = active;
                tracker.store.save().await?;
            }
            ActivationOutcome::AlreadyActive | ActivationOutcome::NoPendingKey => {}
        }
        Ok(outcome)
    }

    pub async fn mark(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<InsertResult, TrackingError> {
        let mut tracker = self.tracker.lock().await;
        tracker.gate.ensure_active(guild_id)?;
        let result = tracker.registry.mark(guild_id, channel_id);
        tracker.store.guild_mut(guild_id).mark_channel(channel_id);
        tracker.store.save().await?;
        Ok(result)
    }

    pub async fn add_roles(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        roles: &[RoleId],
    ) -> Result<Vec<RoleId>, TrackingError> {
        let mut tracker = self.tracker.lock().await;
        tracker.gate.ensure_active(guild_id)?;
        let added = tracker.registry.add_roles(guild_id, channel_id, roles)?;
        tracker.mirror_roles(guild_id, channel_id).await?;
        Ok(added)
    }

    pub async fn remove_role(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        role: RoleId,
    ) -> Result<RemoveResult, TrackingError> {
        let mut tracker = self.tracker.lock().await;
        tracker.gate.ensure_active(guild_id)?;
        let result = tracker.registry.remove_role(guild_id, channel_id, role)?;
        if result == RemoveResult::Removed {
            tracker.mirror_roles(guild_id, channel_id).await?;
        }
        Ok(result)
    }

    /** Drops roles that no longer exist on the server. Nothing is checked or saved if there are none. */
    pub async fn prune_roles(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        stale: &[RoleId],
    ) -> Result<(), TrackingError> {
        if stale.is_empty() {
            return Ok(());
        }
        let mut tracker = self.tracker.lock().await;
        for role in stale {
            warn!(
                "Role {} no longer exists in guild {}, removing it from channel {}",
                role, guild_id, channel_id
            );
            tracker.registry.remove_role(guild_id, channel_id, *role)?;
        }
        tracker.mirror_roles(guild_id, channel_id).await?;
        Ok(())
    }

    pub async fn clear_roles(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<(), TrackingError> {
        let mut tracker = self.tracker.lock().await;
        tracker.gate.ensure_active(guild_id)?;
        tracker.registry.clear_roles(guild_id, channel_id)?;
        tracker.mirror_roles(guild_id, channel_id).await?;
        Ok(())
    }

    pub async fn unmark(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TrackingError> {
        let mut tracker = self.tracker.lock().await;
        tracker.gate.ensure_active(guild_id)?;
        tracker.registry.unmark(guild_id, channel_id)?;
        tracker.store.guild_mut(guild_id).unmark_channel(channel_id);
        tracker.store.save().await?;
        Ok(())
    }

    /** Tracked roles of a marked channel, in display order. */
    pub async fn tracked_roles(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Vec<RoleId>, TrackingError> {
        let tracker = self.tracker.lock().await;
        tracker.gate.ensure_active(guild_id)?;
        Ok(tracker.registry.roles(guild_id, channel_id)?.to_vec())
    }

    /** Records the last action seen in a tracked channel. Returns false if the channel is not tracked. */
    pub async fn note_action(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        note: String,
    ) -> Result<bool, StoreError> {
        let mut tracker = self.tracker.lock().await;
        let tracked = tracker.registry.is_marked(guild_id, channel_id)
            || tracker
                .store
                .guild(guild_id)
                .map_or(false, |record| record.is_tracked_channel(channel_id));
        if !tracked {
            return Ok(false);
        }
        tracker.store.guild_mut(guild_id).last_action = Some(note);
        tracker.store.save().await?;
        Ok(true)
    }

    pub async fn status(&self, guild_id: GuildId) -> GuildStatus {
        let tracker = self.tracker.lock().await;
        GuildStatus {
            active: tracker.gate.is_active(guild_id),
            tracked_channels: tracker.registry.channel_count(guild_id),
            last_action: tracker
                .store
                .guild(guild_id)
                .and_then(|record| record.last_action.clone()),
        }
    }

    /** Stops every publisher loop and writes the state file one last time. */
    pub async fn shutdown(&self) {
        self.publisher.stop_all().await;
        if let Err(why) = self.flush().await {
            error!("Could not save state on shutdown: {}", why);
        }
    }
}

impl Tracker {
    /** Copies a channel's in-memory role list into its record and saves. */
    async fn mirror_roles(&mut self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TrackingError> {
        let roles = self.registry.roles(guild_id, channel_id)?;
        self.store.guild_mut(guild_id).set_roles(channel_id, roles);
        self.store.save().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tracking::directory::RoleInfo;
    use serenity::utils::Colour;
    use std::path::Path;

    const GUILD: GuildId = GuildId(1056949566718607391);
    const CHANNEL: ChannelId = ChannelId(111);

    fn config(path: &Path) -> Config {
        Config {
            discord_token: "token".to_owned(),
            owner_id: UserId(278224933971165184),
            data_file: path.to_path_buf(),
        }
    }

    async fn active_state(path: &Path) -> AppState {
        let state = AppState::load(&config(path)).await.expect("Load state");
        let key = state.issue_key(GUILD).await;
        assert_eq!(
            state.activate(GUILD, &key).await.expect("Save state"),
            ActivationOutcome::Activated
        );
        state
    }

    #[tokio::test]
    async fn test_tracking_requires_activation() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let state = AppState::load(&config(&dir.path().join("bot_data.json")))
            .await
            .expect("Load state");

        assert!(matches!(
            state.mark(GUILD, CHANNEL).await,
            Err(TrackingError::NotActivated)
        ));
        assert!(matches!(
            state.tracked_roles(GUILD, CHANNEL).await,
            Err(TrackingError::NotActivated)
        ));
        assert_eq!(state.status(GUILD).await.tracked_channels, 0);
    }

    #[tokio::test]
    async fn test_wrong_key_persists_inactive_flag() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let path = dir.path().join("bot_data.json");
        let state = AppState::load(&config(&path)).await.expect("Load state");

        state.issue_key(GUILD).await;
        assert_eq!(
            state.activate(GUILD, "wrong").await.expect("Save state"),
            ActivationOutcome::WrongKey
        );

        let reloaded = StateFile::load(&path).await.expect("Reload");
        let record = reloaded.guild(GUILD).expect("Record written on failure");
        assert!(!record.bot_is_running);
        assert!(!state.is_active(GUILD).await);
    }

    #[tokio::test]
    async fn test_activation_survives_restart() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let path = dir.path().join("bot_data.json");
        active_state(&path).await;

        let restarted = AppState::load(&config(&path)).await.expect("Reload");
        assert!(restarted.is_active(GUILD).await);
    }

    #[tokio::test]
    async fn test_mutations_are_mirrored_to_disk() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let path = dir.path().join("bot_data.json");
        let state = active_state(&path).await;

        state.mark(GUILD, CHANNEL).await.expect("Mark");
        let added = state
            .add_roles(GUILD, CHANNEL, &[RoleId(5), RoleId(6), RoleId(5)])
            .await
            .expect("Add roles");
        assert_eq!(added, vec![RoleId(5), RoleId(6)]);
        assert_eq!(
            state.mark(GUILD, CHANNEL).await.expect("Mark again"),
            InsertResult::AlreadyPresent
        );

        let on_disk = StateFile::load(&path).await.expect("Reload");
        let record = on_disk.guild(GUILD).expect("Stored");
        assert_eq!(record.tracked_channels, vec![111]);
        assert_eq!(record.roles(CHANNEL), &[5, 6]);

        assert_eq!(
            state.remove_role(GUILD, CHANNEL, RoleId(5)).await.expect("Remove"),
            RemoveResult::Removed
        );
        let on_disk = StateFile::load(&path).await.expect("Reload");
        assert_eq!(on_disk.guild(GUILD).expect("Stored").roles(CHANNEL), &[6]);

        state.clear_roles(GUILD, CHANNEL).await.expect("Clear");
        assert!(state
            .tracked_roles(GUILD, CHANNEL)
            .await
            .expect("Still marked")
            .is_empty());

        state.unmark(GUILD, CHANNEL).await.expect("Unmark");
        let on_disk = StateFile::load(&path).await.expect("Reload");
        let record = on_disk.guild(GUILD).expect("Stored");
        assert!(record.tracked_channels.is_empty());
        assert!(record.tracked_roles.is_empty());
        assert!(matches!(
            state.unmark(GUILD, CHANNEL).await,
            Err(TrackingError::NotMarked(_))
        ));
    }

    #[tokio::test]
    async fn test_restart_restores_and_prunes() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let path = dir.path().join("bot_data.json");
        let state = active_state(&path).await;
        state.mark(GUILD, ChannelId(111)).await.expect("Mark");
        state.mark(GUILD, ChannelId(222)).await.expect("Mark");
        state.mark(GUILD, ChannelId(333)).await.expect("Mark");
        state
            .add_roles(GUILD, ChannelId(111), &[RoleId(5), RoleId(6)])
            .await
            .expect("Add roles");
        state
            .add_roles(GUILD, ChannelId(222), &[RoleId(7)])
            .await
            .expect("Add roles");
        drop(state);

        let directory = GuildDirectory::new(
            GUILD,
            [ChannelId(111), ChannelId(222)],
            [5, 6, 7].into_iter().map(|id| RoleInfo {
                id: RoleId(id),
                name: format!("role-{}", id),
                colour: Colour::default(),
            }),
            [],
        );
        let restarted = AppState::load(&config(&path)).await.expect("Reload");
        let report = restarted
            .restore_guild(GUILD, Some(&directory))
            .await
            .expect("Restore");

        assert_eq!(report.pruned_channels, vec![ChannelId(333)]);
        assert_eq!(
            restarted.tracked_roles(GUILD, ChannelId(111)).await.expect("Restored"),
            vec![RoleId(5), RoleId(6)]
        );
        assert_eq!(
            restarted.tracked_roles(GUILD, ChannelId(222)).await.expect("Restored"),
            vec![RoleId(7)]
        );
        assert!(restarted.tracked_roles(GUILD, ChannelId(333)).await.is_err());

        let on_disk = StateFile::load(&path).await.expect("Reload");
        assert_eq!(on_disk.guild(GUILD).expect("Stored").tracked_channels, vec![111, 222]);
    }

    #[tokio::test]
    async fn test_prune_roles_updates_memory_and_disk() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let path = dir.path().join("bot_data.json");
        let state = active_state(&path).await;
        state.mark(GUILD, CHANNEL).await.expect("Mark");
        state
            .add_roles(GUILD, CHANNEL, &[RoleId(5), RoleId(6)])
            .await
            .expect("Add roles");

        state
            .prune_roles(GUILD, CHANNEL, &[RoleId(5)])
            .await
            .expect("Prune");

        assert_eq!(
            state.tracked_roles(GUILD, CHANNEL).await.expect("Marked"),
            vec![RoleId(6)]
        );
        let on_disk = StateFile::load(&path).await.expect("Reload");
        assert_eq!(on_disk.guild(GUILD).expect("Stored").roles(CHANNEL), &[6]);
    }

    #[tokio::test]
    async fn test_note_action_only_for_tracked_channels() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let path = dir.path().join("bot_data.json");
        let state = active_state(&path).await;
        state.mark(GUILD, CHANNEL).await.expect("Mark");

        assert!(!state
            .note_action(GUILD, ChannelId(999), "ignored".to_owned())
            .await
            .expect("Save"));
        assert!(state
            .note_action(GUILD, CHANNEL, "Message in general: hi...".to_owned())
            .await
            .expect("Save"));

        let status = state.status(GUILD).await;
        assert!(status.active);
        assert_eq!(status.tracked_channels, 1);
        assert_eq!(status.last_action.as_deref(), Some("Message in general: hi..."));
    }
}
