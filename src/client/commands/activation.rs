use itertools::Itertools;
use serenity::prelude::Mentionable;
use tracing::{info, warn};

use crate::client::commands::utils::{self, FAILURE, INFO, NOTICE, SUCCESS};
use crate::client::commands::{Context, Error};
use crate::client::tracking::activation::ActivationOutcome;

/// Requests an activation key from the bot owner.
#[poise::command(slash_command, guild_only)]
pub async fn request_key(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    ctx.defer_ephemeral().await?;
    let key = ctx.data().issue_key(guild_id).await;
    let guild_name = ctx
        .guild()
        .map(|guild| guild.name)
        .unwrap_or_else(|| guild_id.to_string());

    let owner_id = ctx.data().owner_id;
    let serenity_ctx = ctx.serenity_context();
    let dm = match owner_id.create_dm_channel(serenity_ctx).await {
        Ok(dm) => dm,
        Err(why) => {
            warn!("Could not reach bot owner {}: {}", owner_id, why);
            return utils::reply(ctx, "Could not find the bot owner.", FAILURE).await;
        }
    };
    let message = format!(
        "Activation key for server '{}' (ID: {}): `{}`",
        guild_name, guild_id, key
    );
    match dm.say(serenity_ctx, message).await {
        Ok(_) => {
            info!("Sent activation key for guild {} to the bot owner", guild_id);
            utils::reply(
                ctx,
                "The activation key request was sent to the bot owner.",
                SUCCESS,
            )
            .await
        }
        Err(why) => {
            warn!("Could not send activation key to bot owner: {}", why);
            utils::reply(
                ctx,
                "Could not message the bot owner. Make sure their direct messages are open to the bot.",
                FAILURE,
            )
            .await
        }
    }
}

/// Activates the bot on this server with a key from the bot owner.
#[poise::command(slash_command, guild_only)]
pub async fn activate(
    ctx: Context<'_>,
    #[description = "Key sent to the bot owner by /request_key"] activation_key: String,
) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    match ctx.data().activate(guild_id, &activation_key).await? {
        ActivationOutcome::Activated => {
            info!("Guild {} activated", guild_id);
            utils::reply(ctx, "✅ The bot is now active on this server!", SUCCESS).await
        }
        ActivationOutcome::AlreadyActive => {
            utils::reply(ctx, "The bot is already active on this server.", INFO).await
        }
        ActivationOutcome::NoPendingKey => {
            utils::reply(
                ctx,
                "Request an activation key with /request_key first.",
                NOTICE,
            )
            .await
        }
        ActivationOutcome::WrongKey => {
            utils::reply(ctx, "❌ Wrong activation key.", FAILURE).await
        }
    }
}

/// Shows whether the bot is active on this server.
#[poise::command(slash_command, guild_only)]
pub async fn bot_status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    let status = ctx.data().status(guild_id).await;
    let publishing = ctx.data().publisher.running_channel(guild_id).await;

    let lines = [
        if status.active {
            "✅ Active".to_owned()
        } else {
            "❌ Inactive".to_owned()
        },
        format!("Tracked channels: {}", status.tracked_channels),
        match publishing {
            Some(channel_id) => format!("Scheduled updates: {}", channel_id.mention()),
            None => "Scheduled updates: off".to_owned(),
        },
        format!(
            "Last action: {}",
            status.last_action.as_deref().unwrap_or("none")
        ),
    ];
    let colour = if status.active { SUCCESS } else { FAILURE };
    utils::reply_titled(ctx, "Bot status:", lines.iter().join("\n"), colour).await
}
