pub mod errors;
pub mod interface;
pub mod models;
