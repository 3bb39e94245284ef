pub mod activation;
pub mod directory;
pub mod errors;
pub mod registry;
pub mod roster;
pub mod scheduler;
