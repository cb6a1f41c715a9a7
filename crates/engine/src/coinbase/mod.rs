mod rest;

pub use rest::{sign, CoinbaseClient};
