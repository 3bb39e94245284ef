use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::client::database::errors::{InsertResult, RemoveResult};
use crate::client::tracking::errors::PublishError;

const SECONDS_PER_HOUR: u64 = 3600;

pub fn hours(count: u64) -> Duration {
    Duration::from_secs(count * SECONDS_PER_HOUR)
}

struct ScheduledTask {
    channel_id: ChannelId,
    handle: JoinHandle<()>,
}

/** Per-guild repeating roster publication. At most one loop runs per guild. */
#[derive(Default)]
pub struct Publisher {
    tasks: Mutex<HashMap<GuildId, ScheduledTask>>,
}

impl Publisher {
    pub fn new() -> Publisher {
        Publisher::default()
    }

    /// Starts publishing for a guild every `interval`, the first run happening right away.
    ///
    /// A loop already running for the guild is cancelled, and has finished, before the
    /// new one is spawned. Returns `AlreadyPresent` when a loop was replaced.
    pub async fn start<F, Fut>(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        interval: Duration,
        mut publish: F,
    ) -> InsertResult
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), PublishError>> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        let replaced = match tasks.remove(&guild_id) {
            Some(previous) => cancel(guild_id, previous).await,
            None => false,
        };

        let handle = tokio::spawn(async move {
            loop {
                match publish().await {
                    Ok(()) => {}
                    Err(PublishError::ContextExpired(channel)) => {
                        info!(
                            "Publish target in channel {} expired, stopping updates for guild {}",
                            channel, guild_id
                        );
                        break;
                    }
                    Err(why) => {
                        error!("Scheduled roster update for guild {} failed: {}", guild_id, why);
                        break;
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });
        tasks.insert(guild_id, ScheduledTask { channel_id, handle });

        if replaced {
            InsertResult::AlreadyPresent
        } else {
            InsertResult::Added
        }
    }

    /** Cancels the guild's loop. `NotPresent` if none was running. */
    pub async fn stop(&self, guild_id: GuildId) -> RemoveResult {
        let previous = self.tasks.lock().await.remove(&guild_id);
        match previous {
            Some(previous) => {
                if cancel(guild_id, previous).await {
                    RemoveResult::Removed
                } else {
                    RemoveResult::NotPresent
                }
            }
            None => RemoveResult::NotPresent,
        }
    }

    /** The channel being published to, if a loop is still alive. */
    pub async fn running_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.tasks
            .lock()
            .await
            .get(&guild_id)
            .filter(|task| !task.handle.is_finished())
            .map(|task| task.channel_id)
    }

    pub async fn stop_all(&self) {
        let tasks: Vec<(GuildId, ScheduledTask)> = self.tasks.lock().await.drain().collect();
        for (guild_id, task) in tasks {
            cancel(guild_id, task).await;
        }
    }
}

/** Aborts a loop and waits for it to wind down. Returns whether it was still running. */
async fn cancel(guild_id: GuildId, task: ScheduledTask) -> bool {
    let was_running = !task.handle.is_finished();
    task.handle.abort();
    if let Err(why) = task.handle.await {
        if why.is_cancelled() {
            info!("Roster updates cancelled for guild {}", guild_id);
        } else {
            error!("Roster update task for guild {} panicked: {}", guild_id, why);
        }
    }
    was_running
}
