pub mod cli;
pub mod config;
pub mod error;
pub mod oauth;

pub use config::{load_settings, Overrides, ProviderConfig, Settings};
pub use error::DiscordTokenError;
pub use oauth::{ProviderClient, TokenManager, TokenOutcome, TokenRecord, TokenState, TokenStore};
