use crate::client::commands::{Context, Error};

/// Registers or removes the application commands, globally or in this server.
#[poise::command(prefix_command, owners_only, hide_in_help)]
pub async fn sync(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx).await?;
    Ok(())
}
