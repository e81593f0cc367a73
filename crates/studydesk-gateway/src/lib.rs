mod client;

pub use studydesk_types as types;
pub use client::{connect, connect_with_config, Client, Config, ConfigBuilder, GatewayError, Result};
