use serenity::model::id::ChannelId;

use crate::client::database::errors::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("The bot is not activated on this server.")]
    NotActivated,
    #[error("Channel {0} is not marked for tracking.")]
    NotMarked(ChannelId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The channel or webhook the roster was being published to no longer exists.
    #[error("Publish target in channel {0} no longer exists")]
    ContextExpired(ChannelId),
    #[error("{0} of {1} roster messages could not be sent")]
    Delivery(usize, usize),
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    #[error("Discord error: {0}")]
    Serenity(#[from] serenity::Error),
}
