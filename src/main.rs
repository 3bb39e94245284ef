mod client;
use client::commands;
use client::config::Config;
use client::events;
use client::state::AppState;
use std::collections::HashSet;
use std::sync::Arc;

use serenity::prelude::GatewayIntents;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // This will load the environment variables located at `./.env`, relative to
    // the CWD, if there is one. Plain environment variables work as well.
    if dotenv::dotenv().is_err() {
        eprintln!("No .env file found, reading configuration from the environment");
    }

    // Initialize the logger to use environment variables.
    //
    // In this case, a good default is setting the environment variable
    // `RUST_LOG` to `debug`.
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(why) => {
            error!("Invalid configuration: {}", why);
            std::process::exit(1);
        }
    };
    let state = match AppState::load(&config).await {
        Ok(state) => Arc::new(state),
        Err(why) => {
            error!("Could not load state: {}", why);
            std::process::exit(1);
        }
    };

    let setup_state = Arc::clone(&state);
    let options = poise::FrameworkOptions {
        commands: commands::all(),
        owners: HashSet::from([config.owner_id]),
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some("/".into()),
            ..Default::default()
        },
        on_error: |error| Box::pin(commands::errors::on_error(error)),
        event_handler: |ctx, event, framework, data| {
            Box::pin(events::handle(ctx, event, framework, data))
        },
        ..Default::default()
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let framework = poise::Framework::builder()
        .token(&config.discord_token)
        .intents(intents)
        .options(options)
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                events::on_ready(ctx, ready, framework, &setup_state).await?;
                Ok(setup_state)
            })
        })
        .build()
        .await;
    let framework = match framework {
        Ok(framework) => framework,
        Err(why) => {
            error!("Err creating client: {:?}", why);
            std::process::exit(1);
        }
    };

    let shard_manager = framework.shard_manager().clone();

    // This spawns a kill switch to shut down the bot using CTRL+C
    tokio::spawn(async move {
        if let Err(why) = tokio::signal::ctrl_c().await {
            error!("Could not register ctrl+c handler: {}", why);
            return;
        }
        info!("Shutting down");
        shard_manager.lock().await.shutdown_all().await;
    });

    // This starts the bot, and if an error occurs it logs it to logs.
    if let Err(why) = framework.start().await {
        error!("Client error: {:?}", why);
    }
    state.shutdown().await;
}
