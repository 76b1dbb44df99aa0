pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::ConsoleConfig;
pub use error::{ConsoleError, Result};
pub use events::ChatEvent;
pub use types::*;
