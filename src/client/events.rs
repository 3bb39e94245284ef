use serenity::client::Context as SerenityContext;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::guild::Guild;
use tracing::{debug, error, info, warn};

use crate::client::commands::Error;
use crate::client::state::{AppState, Data};
use crate::client::tracking::directory::GuildDirectory;

/** How much of a message is kept in the last-action note. */
const NOTE_EXCERPT_LENGTH: usize = 50;

pub fn note_for_message(channel_name: &str, content: &str) -> String {
    let excerpt: String = content.chars().take(NOTE_EXCERPT_LENGTH).collect();
    format!("Message in {}: {}...", channel_name, excerpt)
}

/// Runs once the bot is connected: registers commands globally and restores the
/// tracking state of every guild the bot is in.
pub async fn on_ready(
    ctx: &SerenityContext,
    ready: &Ready,
    framework: &poise::Framework<Data, Error>,
    state: &AppState,
) -> Result<(), Error> {
    info!("Connected as {}", ready.user.name);
    {
        let _registration = state.registration.lock().await;
        let commands = &framework.options().commands;
        match poise::builtins::register_globally(ctx, commands).await {
            Ok(()) => info!("Registered {} application commands globally", commands.len()),
            Err(why) => error!("Could not register application commands: {}", why),
        }
    }

    for guild in &ready.guilds {
        let directory = match GuildDirectory::fetch(ctx, guild.id, false).await {
            Ok(directory) => Some(directory),
            Err(why) => {
                warn!(
                    "Could not look up guild {} ({}), restoring without pruning",
                    guild.id, why
                );
                None
            }
        };
        match state.restore_guild(guild.id, directory.as_ref()).await {
            Ok(report) => info!(
                "Restored {} tracked channels in guild {} ({} pruned, {} stale roles dropped)",
                report.restored_channels.len(),
                guild.id,
                report.pruned_channels.len(),
                report.dropped_roles.len()
            ),
            Err(why) => error!("Could not restore guild {}: {}", guild.id, why),
        }
    }
    state.flush().await?;
    Ok(())
}

async fn on_guild_join(
    ctx: &SerenityContext,
    guild: &Guild,
    framework: poise::FrameworkContext<'_, Data, Error>,
    state: &AppState,
) -> Result<(), Error> {
    {
        let _registration = state.registration.lock().await;
        let commands = &framework.options.commands;
        match poise::builtins::register_in_guild(ctx, commands, guild.id).await {
            Ok(()) => info!(
                "Registered {} application commands in guild {} after joining",
                commands.len(),
                guild.name
            ),
            Err(why) => warn!(
                "Could not register application commands in guild {}: {}",
                guild.name, why
            ),
        }
    }
    state.observe_guild(guild.id).await?;
    Ok(())
}

async fn on_message(ctx: &SerenityContext, message: &Message, state: &AppState) -> Result<(), Error> {
    if message.author.id == ctx.cache.current_user_id() || message.webhook_id.is_some() {
        return Ok(());
    }
    let guild_id = match message.guild_id {
        Some(guild_id) => guild_id,
        None => return Ok(()),
    };
    let channel_name = ctx
        .cache
        .guild_channel(message.channel_id)
        .map(|channel| channel.name)
        .unwrap_or_else(|| message.channel_id.to_string());
    let note = note_for_message(&channel_name, &message.content);
    if state.note_action(guild_id, message.channel_id, note).await? {
        debug!("Noted message in tracked channel {}", message.channel_id);
    }
    Ok(())
}

/** Gateway event dispatch. */
pub async fn handle(
    ctx: &SerenityContext,
    event: &poise::Event<'_>,
    framework: poise::FrameworkContext<'_, Data, Error>,
    state: &Data,
) -> Result<(), Error> {
    match event {
        poise::Event::Resume { .. } => info!("Resumed"),
        poise::Event::GuildCreate { guild, is_new } => {
            if *is_new {
                on_guild_join(ctx, guild, framework, state).await?;
            }
        }
        poise::Event::Message { new_message } => on_message(ctx, new_message, state).await?,
        _ => {}
    }
    Ok(())
}
