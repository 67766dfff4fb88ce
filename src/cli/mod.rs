pub mod auth;
pub mod output;

pub use auth::CommandStatus;
pub use output::OutputMode;
