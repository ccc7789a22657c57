//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present). Only the API base URL has no default, and even that is allowed
//! to be missing: the client then fails every request with a clear message
//! instead of refusing to start.

use envconfig::Envconfig;
use std::path::PathBuf;

pub const APP_NAME: &str = "Hospus";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the local session store inside the data directory.
pub const SESSION_DB: &str = "session.db";
/// File name of the log file inside the data directory.
pub const LOG_FILE: &str = "hospus.log";

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "HOSPUS_API_URL")]
    pub api_url: Option<String>,

    #[envconfig(from = "HOSPUS_REQUEST_TIMEOUT_SECS", default = "30")]
    pub request_timeout_secs: u64,

    #[envconfig(from = "HOSPUS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[envconfig(from = "HOSPUS_LOG", default = "info")]
    pub log_filter: String,

    #[envconfig(from = "HOSPUS_TICK_RATE", default = "30")]
    pub tick_rate: f64,
}

impl Config {
    /// Loads `.env` (if any) and reads the configuration from the environment.
    pub fn load() -> Result<Self, envconfig::Error> {
        dotenvy::dotenv().ok();
        Self::init_from_env()
    }

    /// The backend base URL with surrounding whitespace and trailing slashes
    /// removed, or `None` when unset or blank.
    pub fn base_url(&self) -> Option<String> {
        self.api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| url.trim_end_matches('/').to_string())
    }

    /// Directory holding the session store and the log file.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn session_db_path(&self) -> PathBuf {
        self.data_dir().join(SESSION_DB)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir().join(LOG_FILE)
    }
}

/// `<local data dir>/hospus`, or `./.hospus` on platforms without one.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("hospus"))
        .unwrap_or_else(|| PathBuf::from(".hospus"))
}
