pub mod env;
pub mod loader;
pub mod types;

pub use loader::{load_settings, Overrides};
pub use types::{FileConfig, ProviderConfig, Settings};
