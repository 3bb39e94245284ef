use tracing::error;

use crate::client::commands::Error;
use crate::client::state::Data;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("This command can only be used in a server.")]
    GuildOnly,
}

/** Logs framework errors and tells the invoker something went wrong where possible. */
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to set up the bot: {:?}", error)
        }
        poise::FrameworkError::Command { error, ctx } => {
            error!("Error in command `{}`: {}", ctx.command().name, error);
            let reply = ctx
                .send(|reply| {
                    reply
                        .ephemeral(true)
                        .content("Something went wrong while running this command.")
                })
                .await;
            if let Err(why) = reply {
                error!("Could not report command error: {}", why);
            }
        }
        error => {
            if let Err(why) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", why)
            }
        }
    }
}
