pub mod config;
pub mod console;
pub mod process_player;

pub use studydesk_gateway::types;
