use serenity::model::id::GuildId;
use serenity::utils::Colour;

use crate::client::commands::errors::CommandError;
use crate::client::commands::{Context, Error};
use crate::client::tracking::errors::TrackingError;

pub const SUCCESS: Colour = Colour::new(0x2ECC71);
pub const FAILURE: Colour = Colour::new(0xE74C3C);
pub const TIMER: Colour = Colour::new(0xF1C40F);
pub const INFO: Colour = Colour::new(0x3498DB);
pub const NOTICE: Colour = Colour::new(0xE67E22);

pub fn guild_id(ctx: Context<'_>) -> Result<GuildId, CommandError> {
    ctx.guild_id().ok_or(CommandError::GuildOnly)
}

/** Replies to the invoker only, with a single embed. */
pub async fn reply(ctx: Context<'_>, description: impl Into<String>, colour: Colour) -> Result<(), Error> {
    let description = description.into();
    ctx.send(|reply| {
        reply
            .ephemeral(true)
            .embed(|embed| embed.description(&description).colour(colour))
    })
    .await?;
    Ok(())
}

pub async fn reply_titled(
    ctx: Context<'_>,
    title: &str,
    description: impl Into<String>,
    colour: Colour,
) -> Result<(), Error> {
    let description = description.into();
    ctx.send(|reply| {
        reply
            .ephemeral(true)
            .embed(|embed| embed.title(title).description(&description).colour(colour))
    })
    .await?;
    Ok(())
}

/** Turns the user-facing tracking errors into replies. Storage failures are passed on to the framework. */
pub async fn reply_tracking_error(ctx: Context<'_>, why: TrackingError) -> Result<(), Error> {
    match why {
        TrackingError::NotActivated => {
            reply(ctx, "The bot is not activated on this server yet.", FAILURE).await
        }
        TrackingError::NotMarked(_) => reply(ctx, "❌ Use /mark in this channel first.", FAILURE).await,
        TrackingError::Store(why) => Err(why.into()),
    }
}
