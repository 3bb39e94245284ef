use serenity::client::Context as SerenityContext;
use serenity::model::channel::Embed;
use serenity::model::id::{ChannelId, GuildId};
use serenity::model::webhook::Webhook;
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::commands::utils::{self, FAILURE, SUCCESS, TIMER};
use crate::client::commands::{Context, Error};
use crate::client::database::errors::{InsertResult, RemoveResult};
use crate::client::state::AppState;
use crate::client::tracking::directory::GuildDirectory;
use crate::client::tracking::errors::PublishError;
use crate::client::tracking::roster;
use crate::client::tracking::scheduler;

/** Name of the webhook the roster is posted through. */
pub const WEBHOOK_NAME: &str = "HelperWebhook";

/** Discord answers 404 once a channel or webhook is gone. */
const UNKNOWN_TARGET_STATUS: u16 = 404;

fn http_status(why: &serenity::Error) -> Option<u16> {
    match why {
        serenity::Error::Http(http_error) => http_error.status_code().map(|status| status.as_u16()),
        _ => None,
    }
}

fn classify_status(status: Option<u16>, why: serenity::Error, channel_id: ChannelId) -> PublishError {
    if status == Some(UNKNOWN_TARGET_STATUS) {
        PublishError::ContextExpired(channel_id)
    } else {
        PublishError::Serenity(why)
    }
}

fn classify(why: serenity::Error, channel_id: ChannelId) -> PublishError {
    classify_status(http_status(&why), why, channel_id)
}

/** Finds the channel's roster webhook, creating it on first use. */
async fn helper_webhook(ctx: &SerenityContext, channel_id: ChannelId) -> Result<Webhook, PublishError> {
    let existing = channel_id
        .webhooks(ctx)
        .await
        .map_err(|why| classify(why, channel_id))?;
    if let Some(webhook) = existing
        .into_iter()
        .find(|webhook| webhook.name.as_deref() == Some(WEBHOOK_NAME) && webhook.token.is_some())
    {
        return Ok(webhook);
    }
    info!("Creating roster webhook in channel {}", channel_id);
    channel_id
        .create_webhook(ctx, WEBHOOK_NAME)
        .await
        .map_err(|why| classify(why, channel_id))
}

/// Compiles the channel's roster and posts it, one embed per message, under the bot's name.
///
/// Roles that no longer exist are pruned from tracking first. Returns the number of
/// messages sent.
pub async fn publish_roster(
    ctx: &SerenityContext,
    state: &AppState,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<usize, PublishError> {
    let tracked = state.tracked_roles(guild_id, channel_id).await?;
    let directory = GuildDirectory::fetch(ctx, guild_id, true)
        .await
        .map_err(|why| classify(why, channel_id))?;
    if !directory.has_channel(channel_id) {
        return Err(PublishError::ContextExpired(channel_id));
    }
    let (roles, stale) = roster::gather(&directory, &tracked);
    state.prune_roles(guild_id, channel_id, &stale).await?;
    let units = roster::compile(&roles);

    let webhook = helper_webhook(ctx, channel_id).await?;
    let bot = ctx.cache.current_user();
    let avatar_url = bot.avatar_url();
    let mut failed = 0;
    for unit in &units {
        let embed = Embed::fake(|embed| {
            embed
                .title(&unit.title)
                .description(&unit.description)
                .colour(unit.colour)
        });
        let sent = webhook
            .execute(ctx, false, |message| {
                message.username(bot.name.as_str()).embeds(vec![embed]);
                if let Some(url) = &avatar_url {
                    message.avatar_url(url.as_str());
                }
                message
            })
            .await;
        if let Err(why) = sent {
            if http_status(&why) == Some(UNKNOWN_TARGET_STATUS) {
                return Err(PublishError::ContextExpired(channel_id));
            }
            warn!("Could not send roster message to channel {}: {}", channel_id, why);
            failed += 1;
        }
    }
    if failed > 0 {
        return Err(PublishError::Delivery(failed, units.len()));
    }
    Ok(units.len())
}

/// Posts the list of members holding the tracked roles.
#[poise::command(slash_command, guild_only)]
pub async fn list_users(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    let channel_id = ctx.channel_id();
    if let Err(why) = ctx.data().tracked_roles(guild_id, channel_id).await {
        return utils::reply_tracking_error(ctx, why).await;
    }
    ctx.defer_ephemeral().await?;

    match publish_roster(ctx.serenity_context(), ctx.data(), guild_id, channel_id).await {
        Ok(sent) => {
            utils::reply(ctx, format!("✅ Roster published ({} messages).", sent), SUCCESS).await
        }
        Err(PublishError::Tracking(why)) => utils::reply_tracking_error(ctx, why).await,
        Err(PublishError::Serenity(why)) => {
            warn!("Could not publish roster in channel {}: {}", channel_id, why);
            utils::reply(
                ctx,
                "❌ Could not publish the roster. Make sure the bot has the Manage Webhooks permission.",
                FAILURE,
            )
            .await
        }
        Err(why) => {
            warn!("Could not publish roster in channel {}: {}", channel_id, why);
            utils::reply(ctx, format!("❌ Could not publish the roster: {}", why), FAILURE).await
        }
    }
}

/// Republishes the roster in this channel every few hours.
#[poise::command(slash_command, guild_only)]
pub async fn set_update_time(
    ctx: Context<'_>,
    #[description = "Hours between updates"]
    #[min = 1]
    hours: u32,
) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    let channel_id = ctx.channel_id();
    if let Err(why) = ctx.data().tracked_roles(guild_id, channel_id).await {
        return utils::reply_tracking_error(ctx, why).await;
    }
    if hours == 0 {
        return utils::reply(ctx, "❌ The interval must be at least one hour.", FAILURE).await;
    }

    let state = Arc::clone(ctx.data());
    let serenity_ctx = ctx.serenity_context().clone();
    let started = ctx
        .data()
        .publisher
        .start(
            guild_id,
            channel_id,
            scheduler::hours(hours.into()),
            move || {
                let state = Arc::clone(&state);
                let serenity_ctx = serenity_ctx.clone();
                async move {
                    publish_roster(&serenity_ctx, &state, guild_id, channel_id)
                        .await
                        .map(|_| ())
                }
            },
        )
        .await;
    if started == InsertResult::AlreadyPresent {
        info!("Replaced the update timer of guild {}", guild_id);
    }
    utils::reply(ctx, format!("⏱️ Update timer set to {} hours.", hours), TIMER).await
}

/// Stops the repeating roster updates.
#[poise::command(slash_command, guild_only)]
pub async fn stop_update_time(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    if !ctx.data().is_active(guild_id).await {
        return utils::reply(ctx, "The bot is not activated on this server yet.", FAILURE).await;
    }
    match ctx.data().publisher.stop(guild_id).await {
        RemoveResult::Removed => {
            utils::reply(ctx, "✅ The update timer was stopped.", SUCCESS).await
        }
        RemoveResult::NotPresent => {
            utils::reply(ctx, "❌ The update timer was not running.", FAILURE).await
        }
    }
}
