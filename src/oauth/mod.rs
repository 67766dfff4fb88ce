pub mod client;
pub mod manager;
pub mod store;
pub mod token;

pub use client::{build_authorization_url, ProviderClient};
pub use manager::{TokenManager, TokenOutcome, TokenState};
pub use store::{TokenStore, DEFAULT_TOKEN_FILE};
pub use token::TokenRecord;
