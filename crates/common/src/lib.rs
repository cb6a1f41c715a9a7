pub mod config;
pub mod error;
pub mod exchange;
pub mod state;
pub mod types;

pub use config::{Config, Credentials};
pub use error::{Error, Result};
pub use exchange::ExchangeClient;
pub use state::{BotState, BotStatus};
pub use types::*;
