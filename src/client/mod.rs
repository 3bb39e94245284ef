pub mod commands;
pub mod config;
pub mod database;
pub mod events;
pub mod state;
pub mod tracking;
