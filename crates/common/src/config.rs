use crate::{Error, Result, TradingMode};

pub const DEFAULT_BASE_URL: &str = "https://api.exchange.coinbase.com";
pub const DEFAULT_SYMBOL: &str = "BTC-USD";
pub const DEFAULT_ORDER_SIZE: f64 = 0.001;

/// API key, secret and passphrase for signed exchange requests.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

impl Credentials {
    /// Rejects blank values so requests are never signed with empty credentials.
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Result<Self> {
        let creds = Self {
            api_key: api_key.into(),
            secret: secret.into(),
            passphrase: passphrase.into(),
        };
        for (name, value) in [
            ("api key", &creds.api_key),
            ("secret", &creds.secret),
            ("passphrase", &creds.passphrase),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("exchange {name} is empty")));
            }
        }
        Ok(creds)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    pub trading_mode: TradingMode,

    // Exchange
    /// Always present in live mode.
    pub credentials: Option<Credentials>,
    pub base_url: String,

    // Trading
    pub symbol: String,
    pub order_size: f64,
    pub paper_slippage_bps: f64,

    // Control surface
    pub control_port: u16,
    pub control_token: Option<String>,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let trading_mode = match optional_env("TRADING_MODE")
            .unwrap_or_else(|| "live".to_string())
            .to_lowercase()
            .as_str()
        {
            "paper" => TradingMode::Paper,
            "live" => TradingMode::Live,
            other => panic!("ERROR: TRADING_MODE must be 'paper' or 'live', got: '{other}'"),
        };

        let credentials = match trading_mode {
            TradingMode::Live => Some(
                Credentials::new(
                    required_env("COINBASE_API_KEY"),
                    required_env("COINBASE_API_SECRET"),
                    required_env("COINBASE_API_PASSPHRASE"),
                )
                .unwrap_or_else(|e| panic!("ERROR: {e}")),
            ),
            TradingMode::Paper => None,
        };

        let order_size = parsed_env("BOT_ORDER_SIZE").unwrap_or(DEFAULT_ORDER_SIZE);
        if !(order_size.is_finite() && order_size > 0.0) {
            panic!("ERROR: BOT_ORDER_SIZE must be a positive number, got: {order_size}");
        }

        Config {
            trading_mode,
            credentials,
            base_url: optional_env("COINBASE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            symbol: optional_env("BOT_SYMBOL").unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
            order_size,
            paper_slippage_bps: parsed_env("PAPER_SLIPPAGE_BPS").unwrap_or(10.0),
            control_port: parsed_env("CONTROL_PORT").unwrap_or(8000),
            control_token: optional_env("CONTROL_TOKEN"),
        }
    }
}

fn required_env(key: &str) -> String {
    optional_env(key).unwrap_or_else(|| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

/// Unset and blank variables are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    optional_env(key).map(|v| {
        v.trim()
            .parse()
            .unwrap_or_else(|_| panic!("Environment variable '{key}' has invalid value: '{v}'"))
    })
}
