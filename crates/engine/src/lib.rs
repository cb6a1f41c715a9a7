pub mod coinbase;
pub mod decision;
pub mod lifecycle;
pub mod trader;

#[cfg(test)]
mod testing;

pub use coinbase::CoinbaseClient;
pub use decision::{Decision, CHANGE_THRESHOLD};
pub use lifecycle::{Engine, EngineHandle};
pub use trader::{EngineConfig, BACKOFF_INTERVAL, POLL_INTERVAL};
