pub mod activation;
pub mod errors;
pub mod owner;
pub mod roster;
pub mod tracking;
pub mod utils;

use crate::client::state::Data;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/** Every command the bot registers. */
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        activation::request_key(),
        activation::activate(),
        activation::bot_status(),
        tracking::mark(),
        tracking::add_role(),
        tracking::unmark(),
        tracking::remove_role(),
        tracking::list_tracked_roles(),
        tracking::clear_tracked_roles(),
        roster::list_users(),
        roster::set_update_time(),
        roster::stop_update_time(),
        owner::sync(),
    ]
}
