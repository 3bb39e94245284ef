use itertools::Itertools;
use serenity::model::guild::Role;
use serenity::prelude::Mentionable;

use crate::client::commands::utils::{self, FAILURE, INFO, NOTICE, SUCCESS};
use crate::client::commands::{Context, Error};
use crate::client::database::errors::RemoveResult;
use crate::client::tracking::errors::TrackingError;

/// Marks this channel for tracking.
#[poise::command(slash_command, guild_only)]
pub async fn mark(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    let channel_id = ctx.channel_id();
    match ctx.data().mark(guild_id, channel_id).await {
        Ok(_) => {
            utils::reply(
                ctx,
                format!("✅ Channel {} is marked for tracking.", channel_id.mention()),
                SUCCESS,
            )
            .await
        }
        Err(why) => utils::reply_tracking_error(ctx, why).await,
    }
}

/// Adds up to five roles to this channel's tracked roles.
#[poise::command(slash_command, guild_only)]
pub async fn add_role(
    ctx: Context<'_>,
    #[description = "Role to track"] role1: Role,
    #[description = "Another role to track"] role2: Option<Role>,
    #[description = "Another role to track"] role3: Option<Role>,
    #[description = "Another role to track"] role4: Option<Role>,
    #[description = "Another role to track"] role5: Option<Role>,
) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    let channel_id = ctx.channel_id();
    let requested: Vec<Role> = [Some(role1), role2, role3, role4, role5]
        .into_iter()
        .flatten()
        .collect();
    let role_ids: Vec<_> = requested.iter().map(|role| role.id).collect();

    let added = match ctx.data().add_roles(guild_id, channel_id, &role_ids).await {
        Ok(added) => added,
        Err(why) => return utils::reply_tracking_error(ctx, why).await,
    };
    if added.is_empty() {
        return utils::reply(
            ctx,
            "❌ No roles were added. They are already tracked here.",
            FAILURE,
        )
        .await;
    }
    let names = added
        .iter()
        .filter_map(|id| requested.iter().find(|role| role.id == *id))
        .map(|role| role.name.as_str())
        .join(", ");
    utils::reply(ctx, format!("✅ Added roles: {}", names), SUCCESS).await
}

/// Stops tracking this channel.
#[poise::command(slash_command, guild_only)]
pub async fn unmark(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    let channel_id = ctx.channel_id();
    match ctx.data().unmark(guild_id, channel_id).await {
        Ok(()) => {
            utils::reply(
                ctx,
                format!("✅ Channel {} is no longer tracked.", channel_id.mention()),
                SUCCESS,
            )
            .await
        }
        Err(TrackingError::NotMarked(_)) => {
            utils::reply(ctx, "❌ This channel is not tracked.", FAILURE).await
        }
        Err(why) => utils::reply_tracking_error(ctx, why).await,
    }
}

/// Removes a role from this channel's tracked roles.
#[poise::command(slash_command, guild_only)]
pub async fn remove_role(
    ctx: Context<'_>,
    #[description = "Role to stop tracking"] role: Role,
) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    let channel_id = ctx.channel_id();
    match ctx.data().remove_role(guild_id, channel_id, role.id).await {
        Ok(RemoveResult::Removed) => {
            utils::reply(
                ctx,
                format!("✅ Role {} is no longer tracked.", role.name),
                SUCCESS,
            )
            .await
        }
        Ok(RemoveResult::NotPresent) => {
            utils::reply(ctx, "❌ This role is not tracked in this channel.", FAILURE).await
        }
        Err(why) => utils::reply_tracking_error(ctx, why).await,
    }
}

/// Shows the roles tracked in this channel.
#[poise::command(slash_command, guild_only)]
pub async fn list_tracked_roles(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    let channel_id = ctx.channel_id();
    let roles = match ctx.data().tracked_roles(guild_id, channel_id).await {
        Ok(roles) => roles,
        Err(why) => return utils::reply_tracking_error(ctx, why).await,
    };
    if roles.is_empty() {
        return utils::reply(ctx, "No roles are tracked in this channel.", NOTICE).await;
    }
    let listing = roles.iter().map(|role| role.mention()).join("\n");
    utils::reply_titled(ctx, "Tracked roles:", listing, INFO).await
}

/// Removes every tracked role from this channel.
#[poise::command(slash_command, guild_only)]
pub async fn clear_tracked_roles(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = utils::guild_id(ctx)?;
    let channel_id = ctx.channel_id();
    match ctx.data().clear_roles(guild_id, channel_id).await {
        Ok(()) => utils::reply(ctx, "✅ The tracked roles list was cleared.", SUCCESS).await,
        Err(why) => utils::reply_tracking_error(ctx, why).await,
    }
}
